//! Drives the per-track pipeline: metadata, cover art, download, tagging, cleanup.

use crate::error::{Error, Result};
use crate::job::DownloadJob;
use crate::link;
use crate::metadata;
use crate::model::{Event, JobState, Resolution, Selector};
use crate::thumbnail::Thumbnail;
use crate::utils::file_system;
use crate::youtube::{MediaBackend, notify};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

pub const SUCCESS_MESSAGE: &str = "Download completed successfully!";

/// Settings shared by every job of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
    pub embed_thumbnail: bool,
    /// Directory holding the ffmpeg binary.
    pub ffmpeg_location: Option<PathBuf>,
    /// Where per-job temporary files are written.
    pub temp_dir: PathBuf,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("Downloads"),
            audio_format: "mp3".to_string(),
            audio_quality: "0".to_string(),
            embed_thumbnail: true,
            ffmpeg_location: None,
            temp_dir: PathBuf::from("."),
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Finished files, in track order.
    pub files: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn MediaBackend>,
    options: DownloadOptions,
    events: UnboundedSender<Event>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        options: DownloadOptions,
        events: UnboundedSender<Event>,
    ) -> Self {
        Self {
            backend,
            options,
            events,
        }
    }

    /// Downloads the track(s) of `link` picked by `selector`.
    ///
    /// Fails with [`Error::NothingMatched`] before downloading anything when the
    /// selector points past the end of the resolved items. The first failing
    /// track aborts the run.
    pub async fn run(&self, link: &str, selector: Selector) -> Result<Summary> {
        let link = link::normalize(link);
        let resolution = self.backend.resolve(&link).await?;

        if let Selector::Index(requested) = selector {
            if requested > resolution.len() {
                return Err(Error::NothingMatched {
                    requested,
                    available: resolution.len(),
                });
            }
        }

        let mut summary = Summary::default();
        for position in selector.positions(resolution.len()) {
            let path = self.process_track(&link, &resolution, position).await?;
            summary.files.push(path);
        }

        if summary.files.is_empty() {
            warn!("{} resolved to no tracks", link);
        }

        Ok(summary)
    }

    /// Runs on the tokio runtime and reports the outcome as a single [`Event::Finished`].
    pub fn spawn(self, link: String, selector: Selector) -> JoinHandle<()> {
        tokio::spawn(async move {
            let event = match self.run(&link, selector).await {
                Ok(summary) => {
                    info!("Downloaded {} track(s)", summary.files.len());
                    Event::Finished {
                        success: true,
                        message: SUCCESS_MESSAGE.to_string(),
                    }
                }
                Err(e) => Event::Finished {
                    success: false,
                    message: e.to_string(),
                },
            };
            notify(&self.events, event);
        })
    }

    async fn process_track(
        &self,
        link: &str,
        resolution: &Resolution,
        position: usize,
    ) -> Result<PathBuf> {
        notify(
            &self.events,
            Event::State {
                track: position,
                state: JobState::Pending,
            },
        );

        let entry = resolution.entry(position).ok_or(Error::NothingMatched {
            requested: position,
            available: resolution.len(),
        })?;
        let metadata = self.backend.track_metadata(entry).await?;
        info!("Track {}: {} by {}", position, metadata.title, metadata.artist);

        let thumbnail = match &metadata.thumbnail_url {
            Some(url) => self.fetch_thumbnail(url).await,
            None => None,
        };

        notify(
            &self.events,
            Event::Metadata {
                track: position,
                title: metadata.title.clone(),
                artist: metadata.artist.clone(),
                thumbnail: thumbnail.clone(),
            },
        );

        let job = DownloadJob {
            id: file_system::job_id(),
            url: link.to_string(),
            track: position,
            output_dir: self.options.output_dir.clone(),
            audio_format: self.options.audio_format.clone(),
            audio_quality: self.options.audio_quality.clone(),
            ffmpeg_location: self.options.ffmpeg_location.clone(),
        };

        let thumbnail_path = job.thumbnail_path(&self.options.temp_dir);
        // The cover is still shown to the front end when embedding is off.
        let cover = thumbnail.as_ref().filter(|_| self.options.embed_thumbnail);
        let result = self.run_job(&job, cover, &thumbnail_path).await;
        file_system::remove_temp_file(&thumbnail_path).await;
        let path = result?;

        notify(
            &self.events,
            Event::State {
                track: position,
                state: JobState::Complete,
            },
        );
        notify(
            &self.events,
            Event::TrackDone {
                track: position,
                path: path.clone(),
            },
        );

        Ok(path)
    }

    async fn fetch_thumbnail(&self, url: &str) -> Option<Thumbnail> {
        match self.backend.fetch_thumbnail(url).await {
            Ok(thumbnail) => Some(thumbnail),
            Err(e) => {
                warn!("Continuing without cover art, thumbnail {} failed: {}", url, e);
                None
            }
        }
    }

    async fn run_job(
        &self,
        job: &DownloadJob,
        thumbnail: Option<&Thumbnail>,
        thumbnail_path: &Path,
    ) -> Result<PathBuf> {
        if let Some(thumbnail) = thumbnail {
            thumbnail.write_to(thumbnail_path).await?;
        }

        let path = self
            .backend
            .download(job, &self.events)
            .await?
            .ok_or(Error::MissingOutput(job.track))?;

        let audio = path.clone();
        let image = thumbnail.map(|_| thumbnail_path.to_path_buf());
        let track = u32::try_from(job.track).unwrap_or(u32::MAX);

        tokio::task::spawn_blocking(move || match image {
            Some(image) => metadata::embed_cover(&audio, &image, track),
            None => metadata::set_track_number(&audio, track),
        })
        .await??;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, TrackMetadata};
    use crate::test_support::{silent_mp3, tiny_jpeg};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    /// Pretends to be yt-dlp: every download writes a silent MP3 named after the title.
    struct FakeBackend {
        titles: Vec<&'static str>,
        collection: bool,
        with_thumbnails: bool,
        report_path: bool,
        downloads: Mutex<Vec<DownloadJob>>,
    }

    impl FakeBackend {
        fn new(titles: Vec<&'static str>, collection: bool) -> Self {
            Self {
                titles,
                collection,
                with_thumbnails: true,
                report_path: true,
                downloads: Mutex::new(Vec::new()),
            }
        }

        fn entry(&self, i: usize) -> Entry {
            Entry {
                id: Some(format!("id{i}")),
                url: format!("https://www.youtube.com/watch?v=id{i}"),
                title: Some(self.titles[i].to_string()),
                uploader: None,
                thumbnail: None,
            }
        }
    }

    #[async_trait]
    impl MediaBackend for FakeBackend {
        async fn resolve(&self, _link: &str) -> Result<Resolution> {
            if self.collection {
                Ok(Resolution::Collection {
                    title: Some("Playlist".to_string()),
                    entries: (0..self.titles.len()).map(|i| self.entry(i)).collect(),
                })
            } else {
                Ok(Resolution::Single(self.entry(0)))
            }
        }

        async fn track_metadata(&self, entry: &Entry) -> Result<TrackMetadata> {
            let thumbnail = self
                .with_thumbnails
                .then(|| "https://i.ytimg.com/cover.jpg".to_string());
            Ok(TrackMetadata::new(
                entry.title.clone(),
                Some("Uploader".to_string()),
                thumbnail,
            ))
        }

        async fn fetch_thumbnail(&self, _url: &str) -> Result<Thumbnail> {
            Thumbnail::from_bytes(&tiny_jpeg())
        }

        async fn download(
            &self,
            job: &DownloadJob,
            events: &UnboundedSender<Event>,
        ) -> Result<Option<PathBuf>> {
            self.downloads.lock().unwrap().push(job.clone());
            for percent in [0, 50, 100] {
                notify(events, Event::Progress(percent));
            }

            if !self.report_path {
                return Ok(None);
            }

            let title = self.titles[job.track - 1];
            let path = job.output_dir.join(format!("{title}.{}", job.audio_format));
            std::fs::create_dir_all(&job.output_dir)?;
            silent_mp3(&path);
            Ok(Some(path))
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        output_dir: PathBuf,
        temp_dir: PathBuf,
        backend: Arc<FakeBackend>,
        orchestrator: Orchestrator,
        events: UnboundedReceiver<Event>,
    }

    fn harness(backend: FakeBackend) -> Harness {
        harness_with(backend, |_| {})
    }

    fn harness_with(backend: FakeBackend, adjust: impl FnOnce(&mut DownloadOptions)) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("Downloads");
        let mut options = DownloadOptions {
            output_dir: output_dir.clone(),
            temp_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        adjust(&mut options);
        let backend = Arc::new(backend);
        let (tx, rx) = unbounded_channel();

        Harness {
            temp_dir: dir.path().to_path_buf(),
            _dir: dir,
            output_dir,
            orchestrator: Orchestrator::new(backend.clone(), options, tx),
            backend,
            events: rx,
        }
    }

    fn drain(events: &mut UnboundedReceiver<Event>) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn single_item_with_selector_zero() {
        let mut h = harness(FakeBackend::new(vec!["Only Song"], false));

        let summary = h
            .orchestrator
            .run("https://www.youtube.com/watch?v=id0&t=10", Selector::All)
            .await
            .unwrap();

        assert_eq!(files_in(&h.output_dir), vec!["Only Song.mp3"]);
        assert_eq!(summary.files, vec![h.output_dir.join("Only Song.mp3")]);

        let file = &summary.files[0];
        assert_eq!(metadata::read_track_number(file).unwrap(), Some(1));
        assert!(!metadata::read_cover(file).unwrap().unwrap().is_empty());

        let jobs = h.backend.downloads.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url, "https://www.youtube.com/watch?v=id0");

        let events = drain(&mut h.events);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Metadata { title, thumbnail: Some(t), .. } if title == "Only Song" && t.side() == 8
        )));
    }

    #[tokio::test]
    async fn collection_with_index_downloads_only_that_track() {
        let h = harness(FakeBackend::new(vec!["One", "Two", "Three"], true));

        let summary = h
            .orchestrator
            .run("https://www.youtube.com/playlist?list=PL1", Selector::Index(2))
            .await
            .unwrap();

        assert_eq!(files_in(&h.output_dir), vec!["Two.mp3"]);
        assert_eq!(
            metadata::read_track_number(&summary.files[0]).unwrap(),
            Some(2)
        );

        let jobs = h.backend.downloads.lock().unwrap();
        assert_eq!(jobs.iter().map(|j| j.track).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn selector_all_processes_each_item_once_in_order() {
        let h = harness(FakeBackend::new(vec!["One", "Two", "Three"], true));

        let summary = h
            .orchestrator
            .run("https://www.youtube.com/playlist?list=PL1", Selector::All)
            .await
            .unwrap();

        assert_eq!(summary.files.len(), 3);
        let jobs = h.backend.downloads.lock().unwrap();
        assert_eq!(
            jobs.iter().map(|j| j.track).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        for (i, file) in summary.files.iter().enumerate() {
            assert_eq!(metadata::read_track_number(file).unwrap(), Some(i as u32 + 1));
        }
    }

    #[tokio::test]
    async fn out_of_range_selector_downloads_nothing() {
        let h = harness(FakeBackend::new(vec!["One", "Two", "Three"], true));

        let err = h
            .orchestrator
            .run("https://www.youtube.com/playlist?list=PL1", Selector::Index(4))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::NothingMatched {
                requested: 4,
                available: 3
            }
        ));
        assert!(h.backend.downloads.lock().unwrap().is_empty());
        assert!(!h.output_dir.exists());
    }

    #[tokio::test]
    async fn missing_thumbnail_is_not_an_error() {
        let mut backend = FakeBackend::new(vec!["Bare"], false);
        backend.with_thumbnails = false;
        let mut h = harness(backend);

        let summary = h
            .orchestrator
            .run("https://www.youtube.com/watch?v=id0", Selector::All)
            .await
            .unwrap();

        assert_eq!(metadata::read_cover(&summary.files[0]).unwrap(), None);
        assert!(drain(&mut h.events).iter().any(|e| matches!(
            e,
            Event::Metadata {
                thumbnail: None,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn disabled_embedding_only_writes_the_track_number() {
        let mut h = harness_with(FakeBackend::new(vec!["Plain"], false), |options| {
            options.embed_thumbnail = false;
        });

        let summary = h
            .orchestrator
            .run("https://www.youtube.com/watch?v=id0", Selector::All)
            .await
            .unwrap();

        let file = &summary.files[0];
        assert_eq!(metadata::read_cover(file).unwrap(), None);
        assert_eq!(metadata::read_track_number(file).unwrap(), Some(1));
        assert!(drain(&mut h.events).iter().any(|e| matches!(
            e,
            Event::Metadata {
                thumbnail: Some(_),
                ..
            }
        )));
    }

    #[tokio::test]
    async fn thumbnail_temp_files_are_removed() {
        let h = harness(FakeBackend::new(vec!["One", "Two"], true));

        h.orchestrator
            .run("https://www.youtube.com/playlist?list=PL1", Selector::All)
            .await
            .unwrap();

        let leftovers: Vec<String> = files_in(&h.temp_dir)
            .into_iter()
            .filter(|name| name.starts_with("thumbnail-"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn unreported_output_is_an_error() {
        let mut backend = FakeBackend::new(vec!["Ghost"], false);
        backend.report_path = false;
        let h = harness(backend);

        let err = h
            .orchestrator
            .run("https://www.youtube.com/watch?v=id0", Selector::All)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingOutput(1)));
    }

    #[tokio::test]
    async fn progress_stays_within_bounds_and_states_are_ordered() {
        let mut h = harness(FakeBackend::new(vec!["Song"], false));

        h.orchestrator
            .run("https://www.youtube.com/watch?v=id0", Selector::All)
            .await
            .unwrap();

        let events = drain(&mut h.events);
        assert!(
            events
                .iter()
                .filter_map(|e| match e {
                    Event::Progress(p) => Some(*p),
                    _ => None,
                })
                .all(|p| p <= 100)
        );

        let states: Vec<JobState> = events
            .iter()
            .filter_map(|e| match e {
                Event::State { state, .. } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![JobState::Pending, JobState::Complete]);
    }

    #[tokio::test]
    async fn spawned_run_reports_exactly_one_finish() {
        let mut h = harness(FakeBackend::new(vec!["One", "Two", "Three"], true));

        h.orchestrator
            .clone()
            .spawn(
                "https://www.youtube.com/playlist?list=PL1".to_string(),
                Selector::Index(9),
            )
            .await
            .unwrap();

        let finished: Vec<(bool, String)> = drain(&mut h.events)
            .into_iter()
            .filter_map(|e| match e {
                Event::Finished { success, message } => Some((success, message)),
                _ => None,
            })
            .collect();

        assert_eq!(finished.len(), 1);
        assert!(!finished[0].0);
        assert!(finished[0].1.contains("Track 9"));
    }

    #[tokio::test]
    async fn spawned_success_uses_fixed_message() {
        let mut h = harness(FakeBackend::new(vec!["One"], false));

        h.orchestrator
            .clone()
            .spawn(
                "https://www.youtube.com/watch?v=id0".to_string(),
                Selector::All,
            )
            .await
            .unwrap();

        let events = drain(&mut h.events);
        assert!(matches!(
            events.last(),
            Some(Event::Finished { success: true, message }) if message == SUCCESS_MESSAGE
        ));
    }
}
