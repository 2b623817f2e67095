//! Fetch and unpack a static ffmpeg build next to the program.

use crate::error::{Error, Result};
use crate::model::{Event, InstallProgress};
use crate::utils::file_system;
use crate::utils::platform::{Architecture, Platform};
use crate::youtube::notify;
use derive_more::Constructor;
use futures_util::StreamExt;
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedSender;

/// The directory the extracted build is renamed to.
pub const INSTALL_NAME: &str = "ffmpeg";

const RELEASE_BASE: &str = "https://github.com/BtbN/FFmpeg-Builds/releases/download/latest";

/// The container format of a build archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarXz,
}

impl ArchiveKind {
    fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarXz => "tar.xz",
        }
    }
}

/// A downloadable ffmpeg build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    pub url: String,
    pub kind: ArchiveKind,
}

impl Build {
    /// The build for the given platform and architecture, if one is published.
    pub fn for_platform(platform: &Platform, architecture: &Architecture) -> Option<Self> {
        let (name, kind) = match (platform, architecture) {
            (Platform::Windows, Architecture::X64) => ("win64", ArchiveKind::Zip),
            (Platform::Windows, Architecture::Aarch64) => ("winarm64", ArchiveKind::Zip),
            (Platform::Linux, Architecture::X64) => ("linux64", ArchiveKind::TarXz),
            (Platform::Linux, Architecture::Aarch64) => ("linuxarm64", ArchiveKind::TarXz),
            _ => return None,
        };

        Some(Self {
            url: format!(
                "{}/ffmpeg-master-latest-{}-gpl.{}",
                RELEASE_BASE,
                name,
                kind.extension()
            ),
            kind,
        })
    }

    pub fn detect() -> Result<Self> {
        let platform = Platform::detect();
        let architecture = Architecture::detect();

        Self::for_platform(&platform, &architecture).ok_or(Error::Binary(platform, architecture))
    }
}

/// Percentage of the download phase, scaled to `0..=50`.
pub fn download_percent(downloaded: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => (50 * downloaded.min(total) / total) as u8,
        _ => 0,
    }
}

/// Percentage of the extraction phase, scaled to `50..=100`.
pub fn extract_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (50 + 50 * index.min(total) / total) as u8
}

/// Installs ffmpeg into `install_dir/ffmpeg`.
///
/// # Example
///
/// ```rust,no_run
/// # use tubetrack::installer::Installer;
/// # use std::path::PathBuf;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (events, _rx) = tokio::sync::mpsc::unbounded_channel();
/// let installer = Installer::new(PathBuf::from("."), reqwest::Client::new());
///
/// let bin = installer.install(&events).await?;
/// println!("ffmpeg installed in {}", bin.display());
/// # Ok(())
/// # }
/// ```
#[derive(Constructor, Clone, Debug)]
pub struct Installer {
    pub install_dir: PathBuf,
    pub client: reqwest::Client,
}

impl Installer {
    /// Downloads, unpacks and renames the build for this machine.
    /// Returns the directory holding the ffmpeg binary.
    pub async fn install(&self, events: &UnboundedSender<Event>) -> Result<PathBuf> {
        let build = Build::detect()?;
        self.install_build(&build, events).await
    }

    pub async fn install_build(
        &self,
        build: &Build,
        events: &UnboundedSender<Event>,
    ) -> Result<PathBuf> {
        let target = self.install_dir.join(INSTALL_NAME);
        if target.exists() {
            return Err(Error::Path(format!(
                "{} already exists, remove it to reinstall",
                target.display()
            )));
        }

        file_system::create_dir(&self.install_dir)?;
        let archive = self.install_dir.join(format!(
            "ffmpeg-{}.{}",
            file_system::job_id(),
            build.kind.extension()
        ));

        let result = match self.download(&build.url, &archive, events).await {
            Ok(()) => self.unpack(&archive, build.kind, events).await,
            Err(e) => Err(e),
        };
        file_system::remove_temp_file(&archive).await;

        let bin = result?;
        info!("FFmpeg installed in {}", bin.display());
        Ok(bin)
    }

    /// Streams `url` into `destination`, reporting the download phase.
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        events: &UnboundedSender<Event>,
    ) -> Result<()> {
        info!("Downloading {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length();

        let mut file = tokio::fs::File::create(destination).await?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            notify(
                events,
                Event::Install(InstallProgress::Download {
                    downloaded,
                    total,
                    percent: download_percent(downloaded, total),
                }),
            );
        }
        file.flush().await?;

        debug!("Downloaded {} bytes to {}", downloaded, destination.display());
        Ok(())
    }

    /// Unpacks `archive` into the install directory and renames its top-level
    /// directory to [`INSTALL_NAME`]. Returns the `bin` directory.
    pub async fn unpack(
        &self,
        archive: &Path,
        kind: ArchiveKind,
        events: &UnboundedSender<Event>,
    ) -> Result<PathBuf> {
        let archive = archive.to_path_buf();
        let destination = self.install_dir.clone();
        let sender = events.clone();

        let top_level = tokio::task::spawn_blocking(move || {
            let progress = |index: usize, total: usize| {
                notify(
                    &sender,
                    Event::Install(InstallProgress::Extract {
                        index,
                        total,
                        percent: extract_percent(index, total),
                    }),
                )
            };

            match kind {
                ArchiveKind::Zip => file_system::extract_zip(&archive, &destination, progress),
                ArchiveKind::TarXz => file_system::extract_tar_xz(&archive, &destination, progress),
            }
        })
        .await??
        .ok_or_else(|| Error::Path("The archive is empty".to_string()))?;

        let extracted = self.install_dir.join(&top_level);
        let target = self.install_dir.join(INSTALL_NAME);
        if extracted != target {
            tokio::fs::rename(&extracted, &target).await?;
        }

        Ok(target.join("bin"))
    }
}
