use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{error, info};
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tubetrack::config::Config;
use tubetrack::installer::Installer;
use tubetrack::model::{Event, InstallProgress, JobState};
use tubetrack::youtube::YtDlp;
use tubetrack::{Selector, locate, start_download};

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(
        long = "verbosity",
        short,
        global = true,
        default_value = "info",
        value_parser = clap::builder::PossibleValuesParser::new([
            "info", "debug", "error", "none", "full"
        ])
    )]
    pub verbosity: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download a track or a playlist as audio files.
    Download {
        url: String,

        /// 1-based position inside a playlist, 0 for every track.
        #[arg(long = "track", short, default_value = "0")]
        track: Selector,

        #[arg(long = "output-dir", short)]
        output_dir: Option<PathBuf>,

        #[arg(
            long = "format",
            short,
            value_parser = clap::builder::PossibleValuesParser::new([
                "mp3", "flac", "ogg", "opus", "m4a", "wav"
            ])
        )]
        format: Option<String>,

        /// yt-dlp audio quality: 0 (best) to 9 (worst), or a bitrate such as 192K.
        #[arg(long = "quality", short)]
        quality: Option<String>,

        #[arg(long = "no-thumbnail", action = clap::ArgAction::SetTrue)]
        no_thumbnail: bool,

        /// Directory containing the ffmpeg binary.
        #[arg(long = "ffmpeg-location")]
        ffmpeg_location: Option<PathBuf>,
    },
    /// Download a static ffmpeg build into `<dir>/ffmpeg`.
    InstallFfmpeg {
        #[arg(long = "dir", short)]
        dir: Option<PathBuf>,
    },
}

fn log_filter(verbosity: &str) -> &'static str {
    match verbosity {
        "debug" => "tubetrack=debug",
        "error" => "error",
        "none" => "off",
        "full" => "trace",
        _ => "tubetrack=info",
    }
}

fn init_logging(verbosity: &str, multi: &MultiProgress) {
    let logger = env_logger::Builder::new()
        .parse_filters(log_filter(verbosity))
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if LogWrapper::new(multi.clone(), logger).try_init().is_ok() {
        log::set_max_level(level);
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:40!} [{bar:30.cyan/blue}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Cli::parse();
    let multi = MultiProgress::new();
    init_logging(&args.verbosity, &multi);

    let success = match args.command {
        Command::Download {
            url,
            track,
            output_dir,
            format,
            quality,
            no_thumbnail,
            ffmpeg_location,
        } => {
            let config = Config::load()?;
            let working_dir = std::env::current_dir()?;

            let mut options = config.download_options(&working_dir);
            if let Some(dir) = output_dir {
                options.output_dir = dir;
            }
            if let Some(format) = format {
                options.audio_format = format;
            }
            if let Some(quality) = quality {
                options.audio_quality = quality;
            }
            if no_thumbnail {
                options.embed_thumbnail = false;
            }
            let configured = ffmpeg_location.or(options.ffmpeg_location.take());

            // Environment problems are reported before anything starts.
            let ffmpeg = match locate::locate(&working_dir, configured.as_deref()).await {
                Ok(dir) => dir,
                Err(e) => {
                    error!("{}", e);
                    eprintln!("Run `tubetrack install-ffmpeg` or pass --ffmpeg-location.");
                    std::process::exit(1);
                }
            };
            options.ffmpeg_location = Some(ffmpeg);

            let yt_dlp = config.yt_dlp();
            match YtDlp::new(yt_dlp.clone(), reqwest::Client::new()).version().await {
                Ok(version) => info!("Using yt-dlp {}", version),
                Err(e) => {
                    error!("yt-dlp is not available at {}: {}", yt_dlp.display(), e);
                    std::process::exit(1);
                }
            }

            let (tx, rx) = unbounded_channel();
            let handle = start_download(&url, track, options, yt_dlp, tx);
            let success = render_download(rx, &multi).await;
            handle.await?;
            success
        }
        Command::InstallFfmpeg { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            install_ffmpeg(dir, &multi).await
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Draws one bar per track until the run reports its outcome.
async fn render_download(mut rx: UnboundedReceiver<Event>, multi: &MultiProgress) -> bool {
    let style = bar_style();
    let mut bar: Option<ProgressBar> = None;
    let mut success = false;

    while let Some(event) = rx.recv().await {
        match event {
            Event::Metadata {
                track,
                title,
                artist,
                thumbnail,
            } => {
                let pb = multi.add(ProgressBar::new(100));
                pb.set_style(style.clone());
                pb.set_message(format!("{}. {} - {}", track, artist, title));
                match thumbnail {
                    Some(cover) => info!("Cover art: {}x{}", cover.side(), cover.side()),
                    None => info!("No cover art for {}", title),
                }
                bar = Some(pb);
            }
            Event::Progress(percent) => {
                if let Some(pb) = &bar {
                    pb.set_position(u64::from(percent));
                }
            }
            Event::State {
                state: JobState::PostProcessing,
                ..
            } => {
                if let Some(pb) = &bar {
                    pb.set_position(100);
                    pb.set_message(format!("{} (converting)", pb.message()));
                }
            }
            Event::State { .. } | Event::Install(_) => {}
            Event::TrackDone { path, .. } => {
                if let Some(pb) = bar.take() {
                    pb.finish_with_message(format!("Saved {}", path.display()));
                }
            }
            Event::Finished {
                success: ok,
                message,
            } => {
                if let Some(pb) = bar.take() {
                    pb.abandon();
                }
                if ok {
                    println!("{}", message);
                } else {
                    error!("{}", message);
                }
                success = ok;
            }
        }
    }

    success
}

async fn install_ffmpeg(dir: PathBuf, multi: &MultiProgress) -> bool {
    let installer = Installer::new(dir, reqwest::Client::new());
    let (tx, mut rx) = unbounded_channel();
    let handle = tokio::spawn(async move { installer.install(&tx).await });

    let pb = multi.add(ProgressBar::new(100));
    pb.set_style(bar_style());
    pb.set_message("Downloading ffmpeg");

    while let Some(event) = rx.recv().await {
        match event {
            Event::Install(InstallProgress::Download { percent, .. }) => {
                pb.set_position(u64::from(percent));
            }
            Event::Install(InstallProgress::Extract {
                index,
                total,
                percent,
            }) => {
                pb.set_message(format!("Extracting {}/{}", index, total));
                pb.set_position(u64::from(percent));
            }
            _ => {}
        }
    }

    match handle.await {
        Ok(Ok(bin)) => {
            pb.finish_with_message("ffmpeg installed");
            println!("FFmpeg was installed in {}", bin.display());
            println!("Add this directory to PATH to use it system-wide.");
            true
        }
        Ok(Err(e)) => {
            pb.abandon();
            error!("Installation failed: {}", e);
            false
        }
        Err(e) => {
            pb.abandon();
            error!("Installation task failed: {}", e);
            false
        }
    }
}
