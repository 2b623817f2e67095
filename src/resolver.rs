//! Parsing of the extractor's JSON output into [`Resolution`]s and [`TrackMetadata`].

use crate::error::{Error, Result};
use crate::model::{Entry, Resolution, TrackMetadata};
use serde::Deserialize;

/// The subset of a `yt-dlp --dump-single-json` document this crate reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InfoJson {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    thumbnails: Vec<ThumbnailJson>,
    url: Option<String>,
    webpage_url: Option<String>,
    entries: Option<Vec<Option<InfoJson>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThumbnailJson {
    url: Option<String>,
    width: Option<u32>,
}

impl InfoJson {
    fn artist(&self) -> Option<String> {
        self.uploader.clone().or_else(|| self.channel.clone())
    }

    /// `thumbnail` if set, else the widest listed one.
    /// On equal widths the later entry wins, matching the extractor's preference order.
    fn best_thumbnail(&self) -> Option<String> {
        if let Some(thumbnail) = &self.thumbnail {
            return Some(thumbnail.clone());
        }

        self.thumbnails
            .iter()
            .filter(|t| t.url.is_some())
            .max_by_key(|t| t.width.unwrap_or(0))
            .and_then(|t| t.url.clone())
    }

    fn page_url(&self) -> Option<String> {
        self.webpage_url
            .clone()
            .or_else(|| self.url.clone().filter(|u| u.starts_with("http")))
            .or_else(|| {
                self.id
                    .as_ref()
                    .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })
    }

    fn into_entry(self, fallback_url: &str) -> Entry {
        Entry {
            url: self.page_url().unwrap_or_else(|| fallback_url.to_string()),
            title: self.title.clone(),
            uploader: self.artist(),
            thumbnail: self.best_thumbnail(),
            id: self.id,
        }
    }
}

fn parse_info(json: &str) -> Result<InfoJson> {
    let json = json.trim();
    if json.is_empty() {
        return Err(Error::Resolution("the extractor returned nothing".to_string()));
    }
    Ok(serde_json::from_str(json)?)
}

/// Parses a flat listing of `link`.
///
/// A document with `entries` is a collection; `null` entries (private or
/// removed items) are dropped. Anything else is a single item.
pub fn parse_resolution(json: &str, link: &str) -> Result<Resolution> {
    let mut info = parse_info(json)?;

    match info.entries.take() {
        Some(entries) => Ok(Resolution::Collection {
            title: info.title,
            entries: entries
                .into_iter()
                .flatten()
                .map(|entry| entry.into_entry(link))
                .collect(),
        }),
        None => Ok(Resolution::Single(info.into_entry(link))),
    }
}

/// Parses the full metadata of one item.
pub fn parse_metadata(json: &str) -> Result<TrackMetadata> {
    let info = parse_info(json)?;
    Ok(TrackMetadata::new(
        info.title.clone(),
        info.artist(),
        info.best_thumbnail(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UNKNOWN_ARTIST, UNKNOWN_TITLE};

    const LINK: &str = "https://www.youtube.com/playlist?list=PL1";

    #[test]
    fn single_video() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "uploader": "Rick Astley",
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        }"#;

        let resolution = parse_resolution(json, LINK).unwrap();
        let Resolution::Single(entry) = resolution else {
            panic!("expected a single item");
        };

        assert!(entry.is_complete());
        assert_eq!(entry.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(entry.uploader.as_deref(), Some("Rick Astley"));
    }

    #[test]
    fn flat_playlist_keeps_order_and_skips_nulls() {
        let json = r#"{
            "_type": "playlist",
            "title": "Mix",
            "entries": [
                {"id": "aaaaaaaaaaa", "url": "https://www.youtube.com/watch?v=aaaaaaaaaaa", "title": "First"},
                null,
                {"id": "bbbbbbbbbbb", "title": "Second", "channel": "Band"},
                {"id": "ccccccccccc", "title": "Third", "thumbnails": [
                    {"url": "https://i.ytimg.com/small.jpg", "width": 120},
                    {"url": "https://i.ytimg.com/large.jpg", "width": 1280},
                    {"url": "https://i.ytimg.com/medium.jpg", "width": 480}
                ]}
            ]
        }"#;

        let resolution = parse_resolution(json, LINK).unwrap();
        assert_eq!(resolution.len(), 3);

        let second = resolution.entry(2).unwrap();
        assert_eq!(second.title.as_deref(), Some("Second"));
        assert_eq!(second.uploader.as_deref(), Some("Band"));
        assert_eq!(second.url, "https://www.youtube.com/watch?v=bbbbbbbbbbb");
        assert!(!second.is_complete());

        let third = resolution.entry(3).unwrap();
        assert_eq!(
            third.thumbnail.as_deref(),
            Some("https://i.ytimg.com/large.jpg")
        );
    }

    #[test]
    fn empty_playlist_resolves_to_no_items() {
        let resolution = parse_resolution(r#"{"title": "Empty", "entries": []}"#, LINK).unwrap();
        assert!(resolution.is_empty());
    }

    #[test]
    fn metadata_falls_back_to_placeholders() {
        let metadata = parse_metadata(r#"{"id": "x"}"#).unwrap();
        assert_eq!(metadata.title, UNKNOWN_TITLE);
        assert_eq!(metadata.artist, UNKNOWN_ARTIST);
        assert!(metadata.thumbnail_url.is_none());
    }

    #[test]
    fn empty_output_is_a_resolution_error() {
        assert!(matches!(
            parse_resolution("  \n", LINK),
            Err(Error::Resolution(_))
        ));
        assert!(matches!(parse_metadata("{oops"), Err(Error::Json(_))));
    }
}
