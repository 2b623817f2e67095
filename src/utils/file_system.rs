//! Tools for working with the file system.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use uuid::Uuid;
use xz2::read::XzDecoder;
use zip::ZipArchive;

/// Returns the parent directory of the given path.
pub fn try_parent(path: impl AsRef<Path>) -> Result<PathBuf> {
    let parent = path
        .as_ref()
        .parent()
        .ok_or(Error::Path("Failed to get parent".to_string()))?;

    Ok(parent.to_path_buf())
}

/// Creates a new directory at the given destination.
/// If the directory already exists, nothing is done.
pub fn create_dir(destination: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(destination)?;
    Ok(())
}

/// Creates the parent directory of the given destination.
pub fn create_parent_dir(destination: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = destination.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(())
}

/// A short random identifier used to key temporary files per job.
pub fn job_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Removes a temporary file if it exists and logs any errors.
/// Does not propagate errors to avoid interrupting the execution flow.
///
/// Returns `true` if the file was deleted.
pub async fn remove_temp_file(file_path: impl AsRef<Path> + std::fmt::Debug) -> bool {
    if !tokio::fs::try_exists(&file_path).await.unwrap_or(false) {
        return false;
    }

    let result = tokio::fs::remove_file(&file_path).await;
    if let Err(ref e) = result {
        warn!("Failed to remove temporary file {:?}: {}", file_path, e);
    }

    result.is_ok()
}

/// Records the first path component of every archive entry.
#[derive(Debug, Default)]
struct TopLevel {
    name: Option<PathBuf>,
}

impl TopLevel {
    fn observe(&mut self, entry: &Path) {
        if self.name.is_some() {
            return;
        }
        if let Some(Component::Normal(first)) = entry.components().next() {
            self.name = Some(PathBuf::from(first));
        }
    }
}

/// Extracts a zip file to the given destination, calling `progress(index, total)`
/// after each entry. Returns the name of the archive's top-level entry.
pub fn extract_zip<F>(
    zip_path: impl AsRef<Path> + std::fmt::Debug,
    destination: impl AsRef<Path> + std::fmt::Debug,
    mut progress: F,
) -> Result<Option<PathBuf>>
where
    F: FnMut(usize, usize),
{
    debug!(
        "Extracting zip file: {:?} to {:?}",
        zip_path.as_ref(),
        destination.as_ref()
    );

    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    let total = archive.len();
    let mut top_level = TopLevel::default();

    for i in 0..total {
        let mut file = archive.by_index(i)?;
        let relative = file
            .enclosed_name()
            .ok_or(Error::Path(format!("Unsafe entry name: {}", file.name())))?;
        top_level.observe(&relative);
        let target = destination.as_ref().join(&relative);

        if file.is_dir() {
            create_dir(&target)?;
        } else {
            create_parent_dir(&target)?;
            let mut out = File::create(&target)?;
            std::io::copy(&mut file, &mut out)?;

            #[cfg(unix)]
            if let Some(mode) = file.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))?;
            }
        }

        progress(i + 1, total);
    }

    Ok(top_level.name)
}

/// Extracts a tar.xz file to the given destination, calling `progress(index, total)`
/// after each entry. Returns the name of the archive's top-level entry.
///
/// The archive is read twice: once to count entries, once to unpack them.
pub fn extract_tar_xz<F>(
    tar_path: impl AsRef<Path> + std::fmt::Debug,
    destination: impl AsRef<Path> + std::fmt::Debug,
    mut progress: F,
) -> Result<Option<PathBuf>>
where
    F: FnMut(usize, usize),
{
    debug!(
        "Extracting tar.xz file: {:?} to {:?}",
        tar_path.as_ref(),
        destination.as_ref()
    );

    let mut counter = Archive::new(XzDecoder::new(File::open(tar_path.as_ref())?));
    let total = counter.entries()?.count();

    let mut archive = Archive::new(XzDecoder::new(File::open(tar_path.as_ref())?));
    let mut top_level = TopLevel::default();

    create_dir(destination.as_ref())?;
    for (i, entry) in archive.entries()?.enumerate() {
        let mut entry = entry?;
        top_level.observe(&entry.path()?);
        entry.unpack_in(destination.as_ref())?;

        progress(i + 1, total);
    }

    Ok(top_level.name)
}
