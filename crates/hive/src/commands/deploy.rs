use std::{collections::BTreeMap, path::Path, time::Duration};

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;

use crate::{
    archiver::{package_deployment_archive, ArchiverError},
    client::{ApiClientError, ClientConfig, DeployApi, DeployRequest, HttpApiClient},
    commands::Deploy,
    config::DeployConfig,
    credentials::{ConsolePrompt, CredentialError, CredentialSource},
    descriptor::{ApplicationDescriptor, DescriptorError, IMPLICIT_ENVIRONMENTS},
};

/// `deploy` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployError {
    /// Deployment archive creation failed; the deployment step is not attempted.
    #[display(fmt = "unable to create deployment archive: {}", _0)]
    Packaging(ArchiverError),

    /// Unable to obtain missing credentials.
    #[display(fmt = "unable to deploy application: {}", _0)]
    Credentials(CredentialError),

    /// Unable to extract the application descriptor.
    #[display(fmt = "unable to deploy application: {}", _0)]
    Descriptor(DescriptorError),

    /// No application id was configured, declared or provided.
    #[display(fmt = "no application id specified")]
    MissingApplicationId,

    /// Unqualified application id without a configured default domain.
    #[display(
        fmt = "default application domain could not be determined, application id needs to be fully qualified (domain/name)"
    )]
    UnqualifiedApplicationId,

    /// Remote deployment call failed.
    #[display(fmt = "unable to deploy application: {}", _0)]
    Api(ApiClientError),
}

/// Fully resolved deployment invocation, ready for submission.
struct Invocation {
    /// API client configuration.
    client: ClientConfig,

    /// Deployment request.
    request: DeployRequest,
}

/// Deploy the web application archive to the Hive platform.
///
/// The flow is strictly linear with no retries: package the deployment
/// archive, resolve credentials and the application id, submit the archive
/// once and report the resulting application id and access URL.
pub(crate) fn deploy(args: Deploy, verbose: bool) -> Result<(), DeployError> {
    if args.packaging != "war" {
        println!(
            "Project packaging is `{}`, there is nothing to deploy.",
            args.packaging
        );

        return Ok(());
    }

    let mut config = DeployConfig::resolve().override_with(&args);
    config.verbose |= verbose;

    let progress = ProgressBar::new_spinner();
    progress.enable_steady_tick(Duration::from_millis(150));
    progress.set_message("Packaging...");

    let artifact = package_deployment_archive(
        &args.archive,
        &args.app_config,
        &args.appxml,
        &args.deploy_file,
        &progress,
    )?;

    let invocation = prepare_invocation(&config, &artifact, &mut ConsolePrompt)?;

    progress.println(format!(
        "Deploying application {} (environment: {})",
        invocation.request.app_id, invocation.request.environment
    ));

    if config.verbose {
        progress.println(submission_diagnostic(
            &invocation.client.api_url,
            &invocation.request,
        ));
    }

    progress.set_message("Uploading deployment archive...");

    let client = HttpApiClient::new(invocation.client)?;
    let response = client.deploy_archive(&invocation.request)?;

    progress.finish_with_message(format!(
        "Application {} deployed: {}",
        response.id, response.url
    ));

    Ok(())
}

/// Resolve everything the single remote call needs: credentials, the
/// application descriptor carried by the deployment artifact, the
/// fully-qualified application id and the request field values.
fn prepare_invocation(
    config: &DeployConfig,
    artifact: &Path,
    credentials: &mut dyn CredentialSource,
) -> Result<Invocation, DeployError> {
    let api_key = match config.api_key.clone() {
        Some(api_key) => api_key,
        None => credentials.api_key()?,
    };

    let api_secret = match config.api_secret.clone() {
        Some(api_secret) => api_secret,
        None => credentials.api_secret()?,
    };

    let descriptor = ApplicationDescriptor::from_archive(
        artifact,
        &config.environments(),
        &IMPLICIT_ENVIRONMENTS,
    )?;

    let app_id = resolve_app_id(config, &descriptor, credentials)?;
    let app_id = qualify_app_id(app_id, config.app_domain.as_deref())?;

    let mut parameters = BTreeMap::new();
    if let Some(container_type) = config.container_type.clone() {
        parameters.insert(String::from("containerType"), container_type);
    }

    let archive_type = if artifact.extension().map_or(false, |ext| ext == "war") {
        "war"
    } else {
        "ear"
    };

    Ok(Invocation {
        client: ClientConfig {
            api_url: config.api_url.clone(),
            api_key,
            api_secret,
            proxy_host: config.proxy_host.clone(),
            proxy_port: config.proxy_port.clone(),
            proxy_user: config.proxy_user.clone(),
            proxy_password: config.proxy_password.clone(),
        },
        request: DeployRequest {
            app_id,
            environment: descriptor.applied_environments().join(","),
            message: config.message.clone(),
            archive: artifact.to_path_buf(),
            archive_type: archive_type.to_owned(),
            incremental: config.incremental(),
            parameters,
            variables: config.parameters.clone(),
        },
    })
}

/// Resolve the application id.
///
/// An explicitly configured id takes precedence over the descriptor-declared
/// one; as a last resort the id is requested from the credential source.
fn resolve_app_id(
    config: &DeployConfig,
    descriptor: &ApplicationDescriptor,
    credentials: &mut dyn CredentialSource,
) -> Result<String, DeployError> {
    let configured = config.app_id.clone().filter(|app_id| !app_id.is_empty());

    let app_id = match configured {
        Some(app_id) => app_id,
        None => match descriptor.application_id() {
            Some(app_id) => app_id.to_owned(),
            None => credentials.application_id()?,
        },
    };

    if app_id.is_empty() {
        return Err(DeployError::MissingApplicationId);
    }

    Ok(app_id)
}

/// Pre-submission diagnostic line, printed when verbose output is requested.
fn submission_diagnostic(api_url: &str, request: &DeployRequest) -> String {
    format!(
        "POST {api_url}/applications/deployArchive: application {}, environment [{}], archive {} ({}, incremental: {})",
        request.app_id,
        request.environment,
        request.archive.display(),
        request.archive_type,
        request.incremental
    )
}

/// Qualify an application id with the default domain when needed.
///
/// An id must be of the form `domain/name`. Ids without a domain segment
/// get the configured default domain prepended; without a default domain
/// qualification fails before any remote call is made.
fn qualify_app_id(app_id: String, default_domain: Option<&str>) -> Result<String, DeployError> {
    if app_id.contains('/') {
        return Ok(app_id);
    }

    match default_domain.filter(|domain| !domain.is_empty()) {
        Some(domain) => Ok(format!("{domain}/{app_id}")),
        None => Err(DeployError::UnqualifiedApplicationId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{fs::File, io::Write, path::PathBuf};

    use zip::{write::FileOptions, ZipWriter};

    use crate::client::DeployResponse;

    /// Credential source that must never be consulted.
    struct NoPrompt;

    impl CredentialSource for NoPrompt {
        fn api_key(&mut self) -> Result<String, CredentialError> {
            panic!("api key should not be prompted for");
        }

        fn api_secret(&mut self) -> Result<String, CredentialError> {
            panic!("api secret should not be prompted for");
        }

        fn application_id(&mut self) -> Result<String, CredentialError> {
            panic!("application id should not be prompted for");
        }
    }

    /// Credential source with scripted answers.
    struct Scripted {
        /// Scripted API key answer.
        api_key: &'static str,

        /// Scripted API secret answer.
        api_secret: &'static str,

        /// Scripted application id answer.
        application_id: &'static str,
    }

    impl CredentialSource for Scripted {
        fn api_key(&mut self) -> Result<String, CredentialError> {
            Ok(self.api_key.to_owned())
        }

        fn api_secret(&mut self) -> Result<String, CredentialError> {
            Ok(self.api_secret.to_owned())
        }

        fn application_id(&mut self) -> Result<String, CredentialError> {
            Ok(self.application_id.to_owned())
        }
    }

    /// Fake remote API recording nothing and answering with fixed values.
    struct FakeApi;

    impl DeployApi for FakeApi {
        fn deploy_archive(
            &self,
            request: &DeployRequest,
        ) -> Result<DeployResponse, ApiClientError> {
            Ok(DeployResponse {
                id: request.app_id.clone(),
                url: format!("https://{}.hive.dev", request.app_id.replace('/', ".")),
            })
        }
    }

    /// Write a deployment bundle holding a platform descriptor.
    fn write_bundle(dir: &Path, descriptor: &str) -> PathBuf {
        let path = dir.join("hive-deploy.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());

        writer.start_file("webapp.war", FileOptions::default()).unwrap();
        writer.write_all(b"war bytes").unwrap();

        writer
            .start_file("META-INF/hive-application.xml", FileOptions::default())
            .unwrap();
        writer.write_all(descriptor.as_bytes()).unwrap();

        writer.finish().unwrap();
        path
    }

    /// Configuration with credentials and a default domain in place.
    fn configured() -> DeployConfig {
        let mut config = DeployConfig::defaults();
        config.api_key = Some(String::from("configured-key"));
        config.api_secret = Some(String::from("configured-secret"));
        config.app_domain = Some(String::from("acme"));
        config
    }

    #[test]
    fn qualified_id_is_kept() {
        assert_eq!(
            qualify_app_id(String::from("acme/petstore"), None).unwrap(),
            "acme/petstore"
        );
    }

    #[test]
    fn unqualified_id_gets_default_domain() {
        assert_eq!(
            qualify_app_id(String::from("petstore"), Some("acme")).unwrap(),
            "acme/petstore"
        );
    }

    #[test]
    fn unqualified_id_without_domain_fails() {
        let result = qualify_app_id(String::from("petstore"), None);
        assert!(matches!(result, Err(DeployError::UnqualifiedApplicationId)));

        let result = qualify_app_id(String::from("petstore"), Some(""));
        assert!(matches!(result, Err(DeployError::UnqualifiedApplicationId)));
    }

    #[test]
    fn non_war_packaging_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let deploy_file = dir.path().join("hive-deploy.zip");

        let args = Deploy {
            archive: dir.path().join("app.jar"),
            packaging: String::from("jar"),
            app_config: dir.path().join("hive-application.xml"),
            appxml: dir.path().join("application.xml"),
            deploy_file: deploy_file.clone(),
            app_id: None,
            environment: None,
            message: None,
            delta: None,
            container_type: None,
            parameters: Vec::new(),
            api_url: None,
            api_key: None,
            api_secret: None,
        };

        deploy(args, false).unwrap();

        assert!(!deploy_file.exists());
    }

    #[test]
    fn invocation_uses_configured_credentials_and_descriptor_id() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = write_bundle(
            dir.path(),
            r#"<application id="petstore">
                   <environment name="production"/>
               </application>"#,
        );

        let mut config = configured();
        config.environment = Some(String::from("production"));
        config.container_type = Some(String::from("tomcat9"));
        config
            .parameters
            .insert(String::from("runtime"), String::from("jdk17"));

        let invocation = prepare_invocation(&config, &bundle, &mut NoPrompt).unwrap();

        assert_eq!(invocation.client.api_url, "https://api.hive.dev/api");
        assert_eq!(invocation.client.api_key, "configured-key");
        assert_eq!(invocation.client.api_secret, "configured-secret");

        // The descriptor-declared id is qualified with the default domain.
        assert_eq!(invocation.request.app_id, "acme/petstore");
        assert_eq!(invocation.request.environment, "production,deploy");
        assert_eq!(invocation.request.archive_type, "ear");
        assert!(invocation.request.incremental);
        assert_eq!(
            invocation.request.parameters.get("containerType").map(String::as_str),
            Some("tomcat9")
        );
        assert_eq!(
            invocation.request.variables.get("runtime").map(String::as_str),
            Some("jdk17")
        );
    }

    #[test]
    fn configured_id_beats_descriptor_id() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = write_bundle(dir.path(), r#"<application id="other/app"/>"#);

        let mut config = configured();
        config.app_id = Some(String::from("acme/petstore"));

        let invocation = prepare_invocation(&config, &bundle, &mut NoPrompt).unwrap();

        assert_eq!(invocation.request.app_id, "acme/petstore");
    }

    #[test]
    fn missing_credentials_are_prompted_for() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = write_bundle(dir.path(), r#"<application id="acme/petstore"/>"#);

        let mut config = DeployConfig::defaults();
        config.app_domain = Some(String::from("acme"));

        let mut credentials = Scripted {
            api_key: "prompted-key",
            api_secret: "prompted-secret",
            application_id: "unused",
        };

        let invocation = prepare_invocation(&config, &bundle, &mut credentials).unwrap();

        assert_eq!(invocation.client.api_key, "prompted-key");
        assert_eq!(invocation.client.api_secret, "prompted-secret");
    }

    #[test]
    fn empty_prompted_id_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = write_bundle(dir.path(), "<application/>");

        let config = configured();

        let mut credentials = Scripted {
            api_key: "unused",
            api_secret: "unused",
            application_id: "",
        };

        let result = prepare_invocation(&config, &bundle, &mut credentials);

        assert!(matches!(result, Err(DeployError::MissingApplicationId)));
    }

    #[test]
    fn war_artifact_is_submitted_as_war() {
        let dir = tempfile::tempdir().unwrap();
        // A raw war used as the artifact directly, carrying its own descriptor.
        let war = dir.path().join("webapp.war");
        let mut writer = ZipWriter::new(File::create(&war).unwrap());
        writer
            .start_file("WEB-INF/hive-web.xml", FileOptions::default())
            .unwrap();
        writer
            .write_all(br#"<application id="acme/petstore"/>"#)
            .unwrap();
        writer.finish().unwrap();

        let mut config = configured();
        config.delta = Some(String::from("false"));

        let invocation = prepare_invocation(&config, &war, &mut NoPrompt).unwrap();

        assert_eq!(invocation.request.archive_type, "war");
        assert!(!invocation.request.incremental);
    }

    #[test]
    fn verbose_diagnostic_names_endpoint_and_archive() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = write_bundle(dir.path(), r#"<application id="acme/petstore"/>"#);

        let invocation = prepare_invocation(&configured(), &bundle, &mut NoPrompt).unwrap();

        let line = submission_diagnostic(&invocation.client.api_url, &invocation.request);

        assert!(line.contains("POST https://api.hive.dev/api/applications/deployArchive"));
        assert!(line.contains("application acme/petstore"));
        assert!(line.contains(&bundle.display().to_string()));
        assert!(line.contains("incremental: true"));
    }

    #[test]
    fn submission_reports_id_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = write_bundle(dir.path(), r#"<application id="acme/petstore"/>"#);

        let invocation = prepare_invocation(&configured(), &bundle, &mut NoPrompt).unwrap();

        let response = FakeApi.deploy_archive(&invocation.request).unwrap();

        assert_eq!(response.id, "acme/petstore");
        assert_eq!(response.url, "https://acme.petstore.hive.dev");
    }
}
