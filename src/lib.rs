use {
    crate::model::Event,
    crate::youtube::YtDlp,
    log::warn,
    regex::Regex,
    std::path::PathBuf,
    std::sync::{Arc, LazyLock},
    tokio::sync::mpsc::UnboundedSender,
    tokio::task::JoinHandle,
    url::Url,
};

pub mod config;
pub mod error;
pub mod executor;
pub mod installer;
pub mod job;
pub mod link;
pub mod locate;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod resolver;
pub mod thumbnail;
pub mod utils;
pub mod youtube;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use model::Selector;
pub use orchestrator::{DownloadOptions, Orchestrator, Summary};

const YOUTUBE_PATTERNS: [&str; 3] = [
    r"^https?://(www\.|m\.|music\.)?youtube\.com/(watch|playlist|shorts/).*",
    r"^https?://youtu\.be/[\w-]+",
    r"^https?://(www\.)?youtube-nocookie\.com/embed/[\w-]+",
];

static YOUTUBE_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    YOUTUBE_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Track,
    Playlist,
}

/// Recognizes YouTube links. Other sites may still work through `yt-dlp`.
pub fn link_kind(url: &str) -> Option<LinkKind> {
    let url = url.trim();
    if !YOUTUBE_REGEXES.iter().any(|re| re.is_match(url)) {
        return None;
    }

    let parsed = Url::parse(url).ok()?;
    if link::is_collection(&parsed) {
        Some(LinkKind::Playlist)
    } else {
        Some(LinkKind::Track)
    }
}

/// Starts downloading `url` in the background with the `yt-dlp` binary at `yt_dlp`.
///
/// Progress and the final outcome arrive on `events`; the run ends with exactly
/// one [`Event::Finished`].
pub fn start_download(
    url: &str,
    selector: Selector,
    options: DownloadOptions,
    yt_dlp: PathBuf,
    events: UnboundedSender<Event>,
) -> JoinHandle<()> {
    if link_kind(url).is_none() {
        warn!("{} does not look like a YouTube link, trying anyway", url);
    }

    let backend = YtDlp::new(yt_dlp, reqwest::Client::new());
    Orchestrator::new(Arc::new(backend), options, events).spawn(url.to_string(), selector)
}
