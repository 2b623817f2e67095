//! The optional `config.toml` holding per-user defaults.

use crate::error::{Error, Result};
use crate::orchestrator::DownloadOptions;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tubetrack";
const FILE_NAME: &str = "config.toml";

/// Every field is optional; command line flags take precedence over it.
///
/// ```toml
/// output_dir = "/home/me/Music/Downloads"
/// audio_format = "mp3"
/// audio_quality = "0"
/// embed_thumbnail = true
/// ffmpeg_location = "/opt/ffmpeg/bin"
/// yt_dlp = "/usr/local/bin/yt-dlp"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output_dir: Option<PathBuf>,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
    pub embed_thumbnail: Option<bool>,
    pub ffmpeg_location: Option<PathBuf>,
    pub yt_dlp: Option<PathBuf>,
}

impl Config {
    /// `<config dir>/tubetrack/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads `path`. A missing or empty file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// The `yt-dlp` binary to run.
    pub fn yt_dlp(&self) -> PathBuf {
        self.yt_dlp
            .clone()
            .unwrap_or_else(|| PathBuf::from("yt-dlp"))
    }

    /// Options for a run started from `working_dir`.
    pub fn download_options(&self, working_dir: &Path) -> DownloadOptions {
        let defaults = DownloadOptions::default();

        DownloadOptions {
            output_dir: self
                .output_dir
                .clone()
                .unwrap_or_else(|| working_dir.join(defaults.output_dir)),
            audio_format: self.audio_format.clone().unwrap_or(defaults.audio_format),
            audio_quality: self.audio_quality.clone().unwrap_or(defaults.audio_quality),
            embed_thumbnail: self.embed_thumbnail.unwrap_or(defaults.embed_thumbnail),
            ffmpeg_location: self.ffmpeg_location.clone(),
            temp_dir: working_dir.to_path_buf(),
        }
    }
}
