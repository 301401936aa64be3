use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use zip::{write::FileOptions, ZipWriter};

/// Fixed entry name of the web application archive inside the deployment bundle.
pub(crate) const WEBAPP_ENTRY: &str = "webapp.war";

/// Fixed entry name of the platform deployment descriptor inside the deployment bundle.
pub(crate) const PLATFORM_DESCRIPTOR_ENTRY: &str = "META-INF/hive-application.xml";

/// Fixed entry name of the standard application descriptor inside the deployment bundle.
pub(crate) const APPLICATION_DESCRIPTOR_ENTRY: &str = "META-INF/application.xml";

/// Errors that may occur during the deployment archive creation process.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ArchiverError {
    /// [`zip`]-crate specific error.
    Zip(zip::result::ZipError),

    /// IO error.
    Io(io::Error),
}

/// Package the deployment archive for the provided web archive.
///
/// When both descriptor files exist on disk a new zip bundle is created at
/// `output`, holding the web archive's bytes under [`WEBAPP_ENTRY`] and the
/// two descriptors under their fixed `META-INF` entry names, in that order.
/// The bundle path is returned as the deployment artifact.
///
/// When either descriptor is absent no file is written and the web archive
/// itself is returned as the deployment artifact.
///
/// This is a byte-level container merge: neither the web archive nor the
/// descriptors are validated structurally.
pub(crate) fn package_deployment_archive(
    war_file: &Path,
    platform_descriptor: &Path,
    application_descriptor: &Path,
    output: &Path,
    progress: &ProgressBar,
) -> Result<PathBuf, ArchiverError> {
    if !platform_descriptor.exists() || !application_descriptor.exists() {
        progress.println(format!(
            "Deployment descriptors are not present, deploying {} as-is",
            war_file.display()
        ));

        return Ok(war_file.to_path_buf());
    }

    let mut writer = ZipWriter::new(File::create(output)?);

    add_entry(&mut writer, war_file, WEBAPP_ENTRY)?;
    add_entry(&mut writer, platform_descriptor, PLATFORM_DESCRIPTOR_ENTRY)?;
    add_entry(&mut writer, application_descriptor, APPLICATION_DESCRIPTOR_ENTRY)?;

    writer.finish()?;

    Ok(output.to_path_buf())
}

/// Store a single file's bytes under the provided fixed entry name.
fn add_entry(
    writer: &mut ZipWriter<File>,
    path: &Path,
    entry_name: &str,
) -> Result<(), ArchiverError> {
    writer.start_file(entry_name, FileOptions::default())?;
    io::copy(&mut File::open(path)?, writer)?;
    Ok(())
}
