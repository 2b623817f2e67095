//! A single track download, as handed to `yt-dlp`.

use std::path::{Path, PathBuf};

const PROGRESS_PREFIX: &str = "progress:";
const POST_PROCESS_PREFIX: &str = "postprocess:";
const FINISHED_PREFIX: &str = "finished:";

/// The configuration of one track download. Built fresh for every track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// Keys the temporary files belonging to this job.
    pub id: String,
    /// The normalized link the track belongs to.
    pub url: String,
    /// 1-based position inside `url`; also written as the track number.
    pub track: usize,
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
    /// Directory holding the ffmpeg binary.
    pub ffmpeg_location: Option<PathBuf>,
}

impl DownloadJob {
    /// `<output_dir>/%(title)s.%(ext)s`
    pub fn output_template(&self) -> String {
        self.output_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }

    /// Where this job's cropped cover art is written.
    pub fn thumbnail_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("thumbnail-{}.jpg", self.id))
    }

    /// The `yt-dlp` arguments for this job.
    ///
    /// Progress, the start of post-processing and the final file path are printed
    /// one per line with the prefixes understood by [`parse_line`].
    ///
    /// Cover art is left out: [`crate::metadata::embed_cover`] writes the cropped
    /// cover once the file exists, for every audio format.
    pub fn to_args(&self) -> Vec<String> {
        let track = self.track.to_string();
        let mut args = vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            self.audio_quality.clone(),
            "--embed-metadata".to_string(),
            "--postprocessor-args".to_string(),
            format!("Metadata:-metadata track={}", track),
            "--playlist-start".to_string(),
            track.clone(),
            "--playlist-end".to_string(),
            track,
            "--output".to_string(),
            self.output_template(),
        ];

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }

        args.extend(
            [
                "--no-warnings",
                "--no-colors",
                "--newline",
                "--progress",
                "--progress-template",
                "download:progress:%(progress._percent_str)s",
                "--print",
                "post_process:postprocess:%(id)s",
                "--print",
                "after_move:finished:%(filepath)s",
            ]
            .map(String::from),
        );

        args.push(self.url.clone());
        args
    }
}

/// One line of `yt-dlp` output, as far as a job is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobLine {
    Progress(u8),
    PostProcessing,
    Finished(PathBuf),
    Other,
}

/// Classifies a line printed by a job started with [`DownloadJob::to_args`].
pub fn parse_line(line: &str) -> JobLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(path) = line.strip_prefix(FINISHED_PREFIX) {
        let path = path.trim();
        if !path.is_empty() && path != "NA" {
            return JobLine::Finished(PathBuf::from(path));
        }
        return JobLine::Other;
    }

    if line.starts_with(POST_PROCESS_PREFIX) {
        return JobLine::PostProcessing;
    }

    match parse_progress(line) {
        Some(percent) => JobLine::Progress(percent),
        None => JobLine::Other,
    }
}

/// Extracts a whole percentage from a status line.
///
/// The `download:` part of the progress template only selects the download
/// phase and is not printed, so a job emits `progress:  45.2%`. A bare
/// `  45.2%` or `[download]  45.2% of 3.1MiB` is accepted as well.
///
/// Anything that is not a finite number in `[0, 100]` yields `None`.
pub fn parse_progress(line: &str) -> Option<u8> {
    let line = line.trim();
    let token = match line.strip_prefix(PROGRESS_PREFIX) {
        Some(rest) => rest.trim(),
        None => line.split_whitespace().find(|token| token.ends_with('%'))?,
    };

    let value = token.strip_suffix('%')?.trim().parse::<f64>().ok()?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return None;
    }

    Some(value as u8)
}
