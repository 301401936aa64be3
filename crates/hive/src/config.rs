use std::{collections::BTreeMap, fs, io, path::PathBuf};

use derive_more::{Display, Error, From};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::commands::Deploy;

/// Environment variable prefix shared by all settings.
const ENV_PREFIX: &str = "HIVE_";

/// Configuration errors for operations that must access the user configuration file.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ConfigError {
    /// IO-related error.
    Io(io::Error),

    /// Unable to serialize the configuration using [`toml`] crate.
    Toml(toml::ser::Error),

    /// User's home directory cannot be determined.
    #[display(fmt = "unable to find home directory")]
    HomeDirNotFound,
}

/// Effective deployment configuration.
///
/// Resolved once per run by overlaying, in increasing precedence:
/// compiled-in defaults, `~/.hive/config.toml`, `HIVE_`-prefixed
/// environment variables and explicit command line arguments. Immutable
/// for the remainder of the run once resolved.
#[derive(Debug, Deserialize)]
pub(crate) struct DeployConfig {
    /// Hive API key.
    pub api_key: Option<String>,

    /// Hive API secret.
    pub api_secret: Option<String>,

    /// Deployment API URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Fully- or partially-qualified application id.
    pub app_id: Option<String>,

    /// Default account domain used to qualify unqualified application ids.
    pub app_domain: Option<String>,

    /// Comma-separated configuration environment tags.
    pub environment: Option<String>,

    /// Message associated with the deployment.
    pub message: Option<String>,

    /// Delta deployment flag.
    ///
    /// Unset or case-insensitive `true` requests an incremental upload.
    pub delta: Option<String>,

    /// Container type requested for the application.
    pub container_type: Option<String>,

    /// HTTP proxy host.
    pub proxy_host: Option<String>,

    /// HTTP proxy port.
    ///
    /// Kept as text here; coerced to a number at client construction,
    /// which fails loudly on a non-numeric value.
    pub proxy_port: Option<String>,

    /// HTTP proxy user.
    pub proxy_user: Option<String>,

    /// HTTP proxy password.
    pub proxy_password: Option<String>,

    /// Verbose API client diagnostics.
    #[serde(default)]
    pub verbose: bool,

    /// Free-form deployment variables.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Default deployment API URL of the hosted environment.
fn default_api_url() -> String {
    String::from("https://api.hive.dev/api")
}

impl DeployConfig {
    /// Resolve the effective configuration from the user configuration file
    /// and environment variables.
    ///
    /// The configuration file is optional: failures to read or parse it are
    /// logged and ignored, leaving environment variables and compiled-in
    /// defaults in effect.
    pub(crate) fn resolve() -> Self {
        let mut figment = Figment::new();

        match config_path() {
            Ok(path) => figment = figment.merge(Toml::file(path)),
            Err(error) => tracing::warn!(%error, "user configuration file is unavailable"),
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .unwrap_or_else(|error| {
                tracing::warn!(
                    %error,
                    "unable to read user configuration, continuing without it"
                );

                Figment::new()
                    .merge(Env::prefixed(ENV_PREFIX))
                    .extract()
                    .unwrap_or_else(|error| {
                        tracing::warn!(%error, "unable to read environment configuration");
                        Self::defaults()
                    })
            })
    }

    /// Compiled-in defaults used when no other configuration source is available.
    pub(crate) fn defaults() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            api_url: default_api_url(),
            app_id: None,
            app_domain: None,
            environment: None,
            message: None,
            delta: None,
            container_type: None,
            proxy_host: None,
            proxy_port: None,
            proxy_user: None,
            proxy_password: None,
            verbose: false,
            parameters: BTreeMap::new(),
        }
    }

    /// Apply explicit command line overrides on top of the resolved configuration.
    pub(crate) fn override_with(mut self, args: &Deploy) -> Self {
        if let Some(api_url) = &args.api_url {
            self.api_url = api_url.clone();
        }

        self.api_key = args.api_key.clone().or(self.api_key);
        self.api_secret = args.api_secret.clone().or(self.api_secret);
        self.app_id = args.app_id.clone().or(self.app_id);
        self.environment = args.environment.clone().or(self.environment);
        self.message = args.message.clone().or(self.message);
        self.delta = args.delta.clone().or(self.delta);
        self.container_type = args.container_type.clone().or(self.container_type);

        for (key, value) in &args.parameters {
            self.parameters.insert(key.clone(), value.clone());
        }

        self
    }

    /// Whether an incremental (delta) upload should be requested.
    pub(crate) fn incremental(&self) -> bool {
        self.delta
            .as_deref()
            .map_or(true, |delta| delta.eq_ignore_ascii_case("true"))
    }

    /// Requested configuration environment tags.
    pub(crate) fn environments(&self) -> Vec<String> {
        self.environment
            .as_deref()
            .map(|environment| {
                environment
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Credentials persisted by the `login` subcommand.
#[derive(Serialize)]
pub(crate) struct StoredCredentials {
    /// Hive API key.
    pub api_key: String,

    /// Hive API secret.
    pub api_secret: String,

    /// Custom deployment API URL, if one was provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl StoredCredentials {
    /// Write the credentials to the default user configuration file location.
    pub(crate) fn write(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, toml::to_string(self)?)?;

        Ok(path)
    }
}

/// User configuration file location (`~/.hive/config.toml`).
fn config_path() -> Result<PathBuf, ConfigError> {
    let mut home_dir = home::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    home_dir.push(".hive/config.toml");
    Ok(home_dir)
}
