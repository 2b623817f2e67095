//! Cover art: fetching, square center-cropping and JPEG encoding.

use crate::error::Result;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use log::debug;
use std::io::Cursor;
use std::path::Path;

/// A square cover image, ready for display and embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub image: RgbImage,
    /// The JPEG encoding of `image`.
    pub jpeg: Vec<u8>,
}

/// Crops the largest centered square out of `image`. No scaling happens.
pub fn center_crop(image: &DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();

    if width > height {
        let left = (width - height) / 2;
        image.crop_imm(left, 0, height, height)
    } else {
        let top = (height - width) / 2;
        image.crop_imm(0, top, width, width)
    }
}

impl Thumbnail {
    /// Decodes `bytes`, crops them square and re-encodes as JPEG.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        let image = center_crop(&decoded).to_rgb8();

        let mut jpeg = Vec::new();
        image.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;

        Ok(Self { image, jpeg })
    }

    /// Downloads and processes the image at `url`.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self> {
        debug!("Fetching thumbnail from {}", url);

        let bytes = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Self::from_bytes(&bytes)
    }

    pub fn side(&self) -> u32 {
        self.image.width()
    }

    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, &self.jpeg).await?;
        Ok(())
    }
}
