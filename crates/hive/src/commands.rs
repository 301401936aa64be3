/// `deploy` subcommand.
mod deploy;

/// `login` subcommand.
mod login;

pub(crate) use deploy::deploy;
pub(crate) use login::login;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI configuration.
#[derive(Parser)]
#[command(about)]
pub(crate) struct Cli {
    /// Enable verbose diagnostics output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Store Hive API credentials in the user configuration file.
    Login(Login),

    /// Package the web application archive and deploy it to the Hive platform.
    Deploy(Deploy),
}

/// `login` subcommand configuration.
#[derive(Args)]
pub(crate) struct Login {
    /// Hive API key.
    #[arg(long)]
    pub api_key: String,

    /// Hive API secret.
    #[arg(long)]
    pub api_secret: String,

    /// Custom deployment API URL.
    #[arg(long)]
    pub api_url: Option<String>,
}

/// `deploy` subcommand configuration.
#[derive(Args)]
pub(crate) struct Deploy {
    /// Path to the pre-built web application archive.
    pub archive: PathBuf,

    /// Project packaging type; anything other than `war` makes this command a no-op.
    #[arg(long, default_value = "war")]
    pub packaging: String,

    /// Path to the Hive application deployment descriptor.
    #[arg(long, default_value = "src/main/config/hive-application.xml")]
    pub app_config: PathBuf,

    /// Path to the standard application deployment descriptor.
    #[arg(long, default_value = "src/main/config/application.xml")]
    pub appxml: PathBuf,

    /// Output path of the packaged deployment archive.
    #[arg(long, default_value = "target/hive-deploy.zip")]
    pub deploy_file: PathBuf,

    /// Fully-qualified application id (`domain/name`).
    #[arg(long)]
    pub app_id: Option<String>,

    /// Comma-separated configuration environments to deploy with.
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Message associated with this deployment.
    #[arg(short, long)]
    pub message: Option<String>,

    /// Delta deployment flag; unset or `true` requests an incremental upload.
    #[arg(long)]
    pub delta: Option<String>,

    /// Container type requested for the application.
    #[arg(long)]
    pub container_type: Option<String>,

    /// Additional `key=value` deployment variables.
    #[arg(long = "param", value_parser = parse_key_value)]
    pub parameters: Vec<(String, String)>,

    /// Custom deployment API URL.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Hive API key.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Hive API secret.
    #[arg(long)]
    pub api_secret: Option<String>,
}

/// Parse a single `key=value` command line argument.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("`{raw}` is not a key=value pair"))
}
