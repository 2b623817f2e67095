//! Fixtures shared by the unit tests.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, joint stereo, no CRC.
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
const FRAME_LEN: usize = 417;

/// Writes a tag-less MP3 made of silent frames.
pub fn silent_mp3(path: &Path) {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&FRAME_HEADER);

    std::fs::write(path, frame.repeat(40)).unwrap();
}

pub fn tiny_jpeg() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([200, 40, 40])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}
