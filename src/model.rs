//! The types flowing through the pipeline and out to the front end.

use crate::error::{Error, Result};
use crate::thumbnail::Thumbnail;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Chooses which item(s) of a resolved link to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector {
    /// Every item, in resolution order. Written as `0`.
    #[default]
    All,
    /// A single 1-based position.
    Index(usize),
}

impl Selector {
    /// Whether the 1-based `position` should be processed.
    pub fn accepts(&self, position: usize) -> bool {
        match self {
            Selector::All => true,
            Selector::Index(index) => *index == position,
        }
    }

    /// The 1-based positions this selector picks out of `count` items.
    pub fn positions(&self, count: usize) -> Vec<usize> {
        (1..=count).filter(|position| self.accepts(*position)).collect()
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().parse::<usize>() {
            Ok(0) => Ok(Selector::All),
            Ok(index) => Ok(Selector::Index(index)),
            Err(_) => Err(Error::InvalidSelector(s.to_string())),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => write!(f, "all tracks"),
            Selector::Index(index) => write!(f, "track {}", index),
        }
    }
}

/// Display metadata for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub thumbnail_url: Option<String>,
}

impl TrackMetadata {
    /// Builds metadata, substituting placeholders for absent fields.
    pub fn new(
        title: Option<String>,
        artist: Option<String>,
        thumbnail_url: Option<String>,
    ) -> Self {
        Self {
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: artist
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            thumbnail_url: thumbnail_url.filter(|u| !u.is_empty()),
        }
    }
}

/// One item as listed by the extractor.
///
/// Fields come from a flat listing and may be missing until the item is resolved in full.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub id: Option<String>,
    /// The link used to fetch full metadata for this item.
    pub url: String,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
}

impl Entry {
    /// Whether the listing already carried everything shown to the user.
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.uploader.is_some() && self.thumbnail.is_some()
    }

    pub fn metadata(&self) -> TrackMetadata {
        TrackMetadata::new(
            self.title.clone(),
            self.uploader.clone(),
            self.thumbnail.clone(),
        )
    }
}

/// What a link resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Single(Entry),
    Collection {
        title: Option<String>,
        entries: Vec<Entry>,
    },
}

impl Resolution {
    pub fn len(&self) -> usize {
        match self {
            Resolution::Single(_) => 1,
            Resolution::Collection { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at the 1-based `position`.
    pub fn entry(&self, position: usize) -> Option<&Entry> {
        match self {
            Resolution::Single(entry) if position == 1 => Some(entry),
            Resolution::Single(_) => None,
            Resolution::Collection { entries, .. } => {
                position.checked_sub(1).and_then(|i| entries.get(i))
            }
        }
    }
}

/// The lifecycle of a single download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Downloading,
    PostProcessing,
    Complete,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Downloading => write!(f, "downloading"),
            JobState::PostProcessing => write!(f, "post-processing"),
            JobState::Complete => write!(f, "complete"),
        }
    }
}

/// Progress of the transcoder installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallProgress {
    /// Archive bytes received so far. `percent` is in `0..=50`.
    Download {
        downloaded: u64,
        total: Option<u64>,
        percent: u8,
    },
    /// Archive entries unpacked so far. `percent` is in `50..=100`.
    Extract {
        index: usize,
        total: usize,
        percent: u8,
    },
}

/// Notifications sent to the front end.
#[derive(Debug, Clone)]
pub enum Event {
    /// Metadata of the track about to be downloaded.
    Metadata {
        track: usize,
        title: String,
        artist: String,
        thumbnail: Option<Thumbnail>,
    },
    State { track: usize, state: JobState },
    /// Download percentage of the current track, in `0..=100`.
    Progress(u8),
    TrackDone { track: usize, path: PathBuf },
    Install(InstallProgress),
    /// Sent exactly once when a background run ends.
    Finished { success: bool, message: String },
}
