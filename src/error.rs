//! The errors that can occur.

use crate::utils::platform::{Architecture, Platform};
use std::path::PathBuf;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur.
#[derive(Debug, Error)]
pub enum Error {
    /// An error occurred while running the runtime.
    #[error("An error occurred while running the runtime: {0}")]
    Runtime(#[from] tokio::task::JoinError),
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// An error occurred while unzipping the transcoder archive.
    #[error("An error occurred while extracting the archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// An error occurred while fetching a thumbnail or an archive.
    #[error("An error occurred while fetching: {0}")]
    Network(#[from] reqwest::Error),
    /// An error occurred while parsing the extractor's JSON.
    #[error("An error occurred while parsing JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// An error occurred while decoding or encoding an image.
    #[error("An error occurred while processing an image: {0}")]
    Image(#[from] image::ImageError),
    /// An error occurred while reading or writing tags.
    #[error("An error occurred while writing tags: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    /// The link could not be resolved into items.
    #[error("Failed to resolve link: {0}")]
    Resolution(String),
    /// An external tool exited with an error.
    #[error("Failed to execute command: {0}")]
    Command(String),
    /// There is no prebuilt ffmpeg archive for this machine.
    #[error("No ffmpeg build available for platform {0}/{1}")]
    Binary(Platform, Architecture),
    /// No ffmpeg binary could be found.
    #[error("ffmpeg is not installed (looked in PATH and {})", .0.display())]
    TranscoderMissing(PathBuf),
    /// The extractor finished without reporting the produced file.
    #[error("The downloader did not report an output file for track {0}")]
    MissingOutput(usize),
    /// The selector points past the end of the collection.
    #[error("Track {requested} does not exist, the link only has {available} track(s)")]
    NothingMatched {
        /// The requested 1-based position.
        requested: usize,
        /// The number of resolved items.
        available: usize,
    },
    /// The selector could not be parsed.
    #[error("Invalid track selector: {0}")]
    InvalidSelector(String),
    /// The configuration file is malformed.
    #[error("Malformed config file: {0}")]
    Config(String),
    /// An error occurred manipulating a path.
    #[error("An invalid path was provided: {0}")]
    Path(String),
}
