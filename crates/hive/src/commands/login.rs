use derive_more::{Display, Error, From};

use crate::{
    commands::Login,
    config::{ConfigError, StoredCredentials},
};

/// `login` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum LoginError {
    /// Unable to write the user configuration file.
    Configuration(ConfigError),
}

/// Persist Hive API credentials to the user configuration file.
pub(crate) fn login(args: Login) -> Result<(), LoginError> {
    let path = StoredCredentials {
        api_key: args.api_key,
        api_secret: args.api_secret,
        api_url: args.api_url,
    }
    .write()?;

    println!("Credentials saved to {}", path.display());

    Ok(())
}
