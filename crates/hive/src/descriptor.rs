use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use derive_more::{Display, Error, From};
use zip::ZipArchive;

/// Recognized in-archive descriptor entry paths, checked in priority order.
///
/// The `META-INF` name is where the packager places the platform descriptor
/// inside a deployment bundle; the two `WEB-INF` names are recognized for
/// web archives that carry the descriptor themselves, including the legacy
/// vendor spelling.
pub(crate) const DESCRIPTOR_PATHS: [&str; 3] = [
    "META-INF/hive-application.xml",
    "WEB-INF/hive-web.xml",
    "WEB-INF/apiary-web.xml",
];

/// Implicit environment tags that are always considered applicable at deploy time.
pub(crate) const IMPLICIT_ENVIRONMENTS: [&str; 1] = ["deploy"];

/// Errors that may occur while extracting the application descriptor.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DescriptorError {
    /// [`zip`]-crate specific error.
    Zip(zip::result::ZipError),

    /// IO error.
    Io(io::Error),

    /// Malformed descriptor XML.
    #[display(fmt = "malformed application descriptor: {}", _0)]
    Xml(roxmltree::Error),
}

/// Application metadata declared by the deployment descriptor.
///
/// Created transiently during the deploy step and discarded after the
/// application id and applied environments have been resolved.
#[derive(Debug, Default)]
pub(crate) struct ApplicationDescriptor {
    /// Application id declared by the descriptor, if any.
    application_id: Option<String>,

    /// Environment tags applied to this deployment.
    applied_environments: Vec<String>,
}

impl ApplicationDescriptor {
    /// Extract the application descriptor from a deployment archive.
    ///
    /// Entry names from [`DESCRIPTOR_PATHS`] are checked in priority order
    /// and the first match is parsed. An archive without any recognized
    /// descriptor entry yields an empty descriptor: no application id and
    /// no applied environments.
    pub(crate) fn from_archive(
        archive_path: &Path,
        requested_environments: &[String],
        implicit_environments: &[&str],
    ) -> Result<Self, DescriptorError> {
        let mut archive = ZipArchive::new(File::open(archive_path)?)?;

        for path in DESCRIPTOR_PATHS {
            let mut content = String::new();

            match archive.by_name(path) {
                Ok(mut entry) => {
                    entry.read_to_string(&mut content)?;
                }
                Err(zip::result::ZipError::FileNotFound) => continue,
                Err(error) => return Err(error.into()),
            }

            return Self::parse(&content, requested_environments, implicit_environments);
        }

        tracing::warn!(
            archive = %archive_path.display(),
            "no application descriptor entry found, proceeding with an empty descriptor"
        );

        Ok(Self::default())
    }

    /// Parse descriptor XML content.
    ///
    /// The applied environment list is the requested tags matched against
    /// the declared ones; implicit deploy-time tags are always applicable.
    fn parse(
        content: &str,
        requested_environments: &[String],
        implicit_environments: &[&str],
    ) -> Result<Self, DescriptorError> {
        let document = roxmltree::Document::parse(content)?;
        let root = document.root_element();

        let application_id = root
            .attribute("id")
            .filter(|id| !id.is_empty())
            .map(str::to_owned);

        let declared: Vec<&str> = root
            .children()
            .filter(|node| node.has_tag_name("environment"))
            .filter_map(|node| node.attribute("name"))
            .collect();

        let mut applied_environments: Vec<String> = requested_environments
            .iter()
            .filter(|tag| declared.contains(&tag.as_str()))
            .cloned()
            .collect();

        for tag in implicit_environments {
            if !applied_environments.iter().any(|applied| applied == tag) {
                applied_environments.push((*tag).to_owned());
            }
        }

        Ok(Self {
            application_id,
            applied_environments,
        })
    }

    /// Application id declared by the descriptor.
    pub(crate) fn application_id(&self) -> Option<&str> {
        self.application_id.as_deref()
    }

    /// Environment tags applied to this deployment.
    pub(crate) fn applied_environments(&self) -> &[String] {
        &self.applied_environments
    }
}
