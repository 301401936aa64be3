use std::io::{self, BufRead, Write};

use derive_more::{Display, Error, From};

/// Errors that may occur while obtaining credentials.
#[derive(Debug, Display, From, Error)]
pub(crate) enum CredentialError {
    /// IO error while prompting.
    Io(io::Error),
}

/// Source of deployment credentials absent from the effective configuration.
///
/// The production implementation prompts on the console, blocking on
/// standard input with no timeout. Tests substitute a deterministic
/// implementation instead.
pub(crate) trait CredentialSource {
    /// Supply the Hive API key.
    fn api_key(&mut self) -> Result<String, CredentialError>;

    /// Supply the Hive API secret.
    fn api_secret(&mut self) -> Result<String, CredentialError>;

    /// Supply the application id.
    fn application_id(&mut self) -> Result<String, CredentialError>;
}

/// Blocking console prompt reading from standard input.
pub(crate) struct ConsolePrompt;

impl ConsolePrompt {
    /// Print `prompt` and read one trimmed line from standard input.
    fn read_line(&self, prompt: &str) -> Result<String, CredentialError> {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut value = String::new();
        io::stdin().lock().read_line(&mut value)?;

        Ok(value.trim().to_owned())
    }
}

impl CredentialSource for ConsolePrompt {
    fn api_key(&mut self) -> Result<String, CredentialError> {
        self.read_line("Enter your Hive API key: ")
    }

    fn api_secret(&mut self) -> Result<String, CredentialError> {
        self.read_line("Enter your Hive API secret: ")
    }

    fn application_id(&mut self) -> Result<String, CredentialError> {
        self.read_line("Enter application id (ex: account/appname): ")
    }
}
