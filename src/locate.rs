//! Finding the ffmpeg directory to hand to `yt-dlp`.

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::installer::INSTALL_NAME;
use crate::utils::file_system;
use crate::utils::platform::Platform;
use log::debug;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const BINARY: &str = "ffmpeg";

fn binary_name() -> String {
    Platform::detect().executable_name(BINARY)
}

/// Searches the directories of a PATH-style list for the ffmpeg binary.
pub fn search_path(paths: impl AsRef<OsStr>, working_dir: &Path) -> Option<PathBuf> {
    which::which_in(binary_name(), Some(paths), working_dir)
        .ok()
        .and_then(|binary| file_system::try_parent(binary).ok())
}

/// `<working_dir>/ffmpeg/bin`, where the installer puts its build.
pub fn local_dir(working_dir: &Path) -> PathBuf {
    working_dir.join(INSTALL_NAME).join("bin")
}

fn contains_binary(dir: &Path) -> bool {
    dir.join(binary_name()).is_file()
}

/// Asks the system's `which` command, for setups where PATH differs from the login shell's.
async fn query_system() -> Option<PathBuf> {
    if Platform::detect() == Platform::Windows {
        return None;
    }

    let output = Executor::new("which", vec![BINARY.to_string()])
        .execute()
        .await
        .ok()?;
    let binary = PathBuf::from(output.stdout.trim());
    if binary.as_os_str().is_empty() {
        return None;
    }

    file_system::try_parent(binary).ok()
}

/// Returns the directory holding the ffmpeg binary.
///
/// A `configured` directory is used as is, provided it contains the binary.
/// Otherwise PATH, then `<working_dir>/ffmpeg/bin`, then the system `which`
/// are consulted in that order.
pub async fn locate(working_dir: &Path, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        return if contains_binary(dir) {
            Ok(dir.to_path_buf())
        } else {
            Err(Error::TranscoderMissing(dir.to_path_buf()))
        };
    }

    if let Some(dir) = std::env::var_os("PATH").and_then(|paths| search_path(paths, working_dir)) {
        debug!("Found ffmpeg in PATH: {}", dir.display());
        return Ok(dir);
    }

    let local = local_dir(working_dir);
    if contains_binary(&local) {
        debug!("Found local ffmpeg: {}", local.display());
        return Ok(local);
    }

    if let Some(dir) = query_system().await {
        debug!("Found ffmpeg through `which`: {}", dir.display());
        return Ok(dir);
    }

    Err(Error::TranscoderMissing(local))
}
