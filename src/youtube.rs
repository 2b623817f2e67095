//! The `yt-dlp` side of the pipeline: resolving links and running download jobs.

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::job::{DownloadJob, JobLine, parse_line};
use crate::model::{Entry, Event, JobState, Resolution, TrackMetadata};
use crate::resolver::{parse_metadata, parse_resolution};
use crate::thumbnail::Thumbnail;
use async_trait::async_trait;
use derive_more::Constructor;
use log::{debug, info};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Sends `event` if anyone is still listening.
pub(crate) fn notify(events: &UnboundedSender<Event>, event: Event) {
    let _ = events.send(event);
}

/// Everything the orchestrator needs from the outside world.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Lists the item(s) behind `link` without downloading anything.
    async fn resolve(&self, link: &str) -> Result<Resolution>;

    /// Full metadata for one listed item.
    async fn track_metadata(&self, entry: &Entry) -> Result<TrackMetadata>;

    /// Fetches and squares the cover image at `url`.
    async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail>;

    /// Runs `job`, reporting progress on `events`.
    ///
    /// Returns the path of the finished file, or `None` if the extractor never reported one.
    async fn download(
        &self,
        job: &DownloadJob,
        events: &UnboundedSender<Event>,
    ) -> Result<Option<PathBuf>>;
}

/// Drives a `yt-dlp` executable.
#[derive(Constructor, Clone, Debug)]
pub struct YtDlp {
    /// The path to the `yt-dlp` binary (a bare name is looked up in PATH).
    pub executable: PathBuf,
    pub client: reqwest::Client,
}

impl YtDlp {
    fn executor(&self, args: Vec<String>) -> Executor {
        Executor::new(self.executable.clone(), args)
    }

    /// The installed `yt-dlp` version. Fails if the binary cannot be run.
    pub async fn version(&self) -> Result<String> {
        let output = self.executor(vec!["--version".to_string()]).execute().await?;
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl MediaBackend for YtDlp {
    async fn resolve(&self, link: &str) -> Result<Resolution> {
        info!("Resolving {}", link);

        let args = vec![
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            link.to_string(),
        ];
        let output = self
            .executor(args)
            .execute()
            .await
            .map_err(|e| Error::Resolution(format!("{}: {}", link, e)))?;

        let resolution = parse_resolution(&output.stdout, link)?;
        match &resolution {
            Resolution::Single(_) => info!("This is a single track"),
            Resolution::Collection { title, entries } => info!(
                "Found {} tracks in {}",
                entries.len(),
                title.as_deref().unwrap_or("the playlist")
            ),
        }

        Ok(resolution)
    }

    async fn track_metadata(&self, entry: &Entry) -> Result<TrackMetadata> {
        if entry.is_complete() {
            return Ok(entry.metadata());
        }

        debug!("Fetching full metadata for {}", entry.url);
        let args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            entry.url.clone(),
        ];
        let output = self
            .executor(args)
            .execute()
            .await
            .map_err(|e| Error::Resolution(format!("{}: {}", entry.url, e)))?;

        parse_metadata(&output.stdout)
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail> {
        Thumbnail::fetch(&self.client, url).await
    }

    async fn download(
        &self,
        job: &DownloadJob,
        events: &UnboundedSender<Event>,
    ) -> Result<Option<PathBuf>> {
        tokio::fs::create_dir_all(&job.output_dir).await?;

        let track = job.track;
        let mut final_path = None;
        let mut post_processing = false;

        notify(
            events,
            Event::State {
                track,
                state: JobState::Downloading,
            },
        );

        self.executor(job.to_args())
            .execute_streaming(|line| match parse_line(line) {
                JobLine::Progress(percent) => notify(events, Event::Progress(percent)),
                JobLine::PostProcessing if !post_processing => {
                    post_processing = true;
                    notify(
                        events,
                        Event::State {
                            track,
                            state: JobState::PostProcessing,
                        },
                    );
                }
                JobLine::Finished(path) => final_path = Some(path),
                JobLine::PostProcessing | JobLine::Other => debug!("yt-dlp: {}", line),
            })
            .await?;

        Ok(final_path)
    }
}
