use std::{collections::BTreeMap, io, num::ParseIntError, path::PathBuf};

use derive_more::{Display, Error, From};
use reqwest::blocking::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;

/// Deployment API client configuration.
#[derive(Debug)]
pub(crate) struct ClientConfig {
    /// Deployment API URL.
    pub api_url: String,

    /// Hive API key.
    pub api_key: String,

    /// Hive API secret.
    pub api_secret: String,

    /// HTTP proxy host.
    pub proxy_host: Option<String>,

    /// HTTP proxy port, as configured.
    pub proxy_port: Option<String>,

    /// HTTP proxy user.
    pub proxy_user: Option<String>,

    /// HTTP proxy password.
    pub proxy_password: Option<String>,
}

/// A single deployment submission.
#[derive(Debug)]
pub(crate) struct DeployRequest {
    /// Fully-qualified application id (`domain/name`).
    pub app_id: String,

    /// Comma-joined applied environment tags.
    pub environment: String,

    /// Description message associated with the deployment.
    pub message: Option<String>,

    /// Deployment artifact path.
    pub archive: PathBuf,

    /// Archive kind (`war` or `ear`).
    pub archive_type: String,

    /// Whether an incremental (delta) upload is requested.
    pub incremental: bool,

    /// Platform parameters, such as the container type.
    pub parameters: BTreeMap<String, String>,

    /// Free-form deployment variables.
    pub variables: BTreeMap<String, String>,
}

/// JSON response body returned by a successful deployment submission.
#[derive(Debug, Deserialize)]
pub(crate) struct DeployResponse {
    /// Deployed application id, as registered by the platform.
    pub id: String,

    /// Application access URL.
    pub url: String,
}

/// Deployment API client errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ApiClientError {
    /// HTTP client error.
    Http(reqwest::Error),

    /// Unable to serialize request maps.
    Json(serde_json::Error),

    /// IO error while reading the deployment artifact.
    Io(io::Error),

    /// Non-numeric proxy port configuration value.
    #[display(fmt = "proxy port is not a number: {}", _0)]
    InvalidProxyPort(ParseIntError),
}

/// Narrow deployment API seam.
///
/// One operation: submit a deployment archive and return the deployed
/// application id with its access URL. The remote service owns
/// authentication internals, delta-diff computation and transport retries.
pub(crate) trait DeployApi {
    /// Submit a deployment request exactly once.
    fn deploy_archive(&self, request: &DeployRequest) -> Result<DeployResponse, ApiClientError>;
}

/// Blocking HTTP implementation of [`DeployApi`].
pub(crate) struct HttpApiClient {
    /// Underlying blocking HTTP client.
    client: Client,

    /// Deployment API URL.
    api_url: String,

    /// Hive API key.
    api_key: String,

    /// Hive API secret.
    api_secret: String,
}

impl HttpApiClient {
    /// Construct the client, configuring proxy settings when present.
    pub(crate) fn new(config: ClientConfig) -> Result<Self, ApiClientError> {
        let mut builder = Client::builder();

        if let Some(proxy) = proxy_from_config(&config)? {
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            api_url: config.api_url,
            api_key: config.api_key,
            api_secret: config.api_secret,
        })
    }
}

/// Build a [`reqwest::Proxy`] from proxy-related configuration values.
///
/// The proxy port is coerced to a number here, failing loudly if the
/// configured value is non-numeric.
fn proxy_from_config(config: &ClientConfig) -> Result<Option<reqwest::Proxy>, ApiClientError> {
    let Some(host) = config.proxy_host.as_deref() else {
        return Ok(None);
    };

    let url = match config.proxy_port.as_deref() {
        Some(port) => {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(ApiClientError::InvalidProxyPort)?;
            format!("http://{host}:{port}")
        }
        None => format!("http://{host}"),
    };

    let mut proxy = reqwest::Proxy::all(url)?;

    if let (Some(user), Some(password)) = (
        config.proxy_user.as_deref(),
        config.proxy_password.as_deref(),
    ) {
        proxy = proxy.basic_auth(user, password);
    }

    Ok(Some(proxy))
}

impl DeployApi for HttpApiClient {
    fn deploy_archive(&self, request: &DeployRequest) -> Result<DeployResponse, ApiClientError> {
        let url = format!("{}/applications/deployArchive", self.api_url);

        let mut form = Form::new()
            .text("app_id", request.app_id.clone())
            .text("environment", request.environment.clone())
            .text("archive_type", request.archive_type.clone())
            .text("incremental", request.incremental.to_string())
            .text("parameters", serde_json::to_string(&request.parameters)?)
            .text("variables", serde_json::to_string(&request.variables)?)
            .part(
                "archive",
                Part::file(&request.archive)?.mime_str("application/zip")?,
            );

        if let Some(message) = &request.message {
            form = form.text("description", message.clone());
        }

        Ok(self
            .client
            .post(url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .multipart(form)
            .send()?
            .error_for_status()?
            .json()?)
    }
}
