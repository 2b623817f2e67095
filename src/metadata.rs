use crate::error::{Error, Result};
use lofty::{
    config::WriteOptions,
    file::{AudioFile, TaggedFile, TaggedFileExt},
    picture::{MimeType, Picture, PictureType},
    read_from_path,
    tag::{Accessor, Tag, TagType},
};
use log::{debug, warn};
use std::path::Path;

/// Returns the tag type to write into, inserting an empty tag when the file has none.
fn writable_tag_type(tagged_file: &mut TaggedFile) -> TagType {
    if tagged_file.primary_tag().is_some() {
        return tagged_file.primary_tag_type();
    }
    if let Some(first_tag) = tagged_file.first_tag() {
        return first_tag.tag_type();
    }

    let tag_type = tagged_file.primary_tag_type();
    warn!("No tags found, creating a new tag of type `{tag_type:?}`");
    tagged_file.insert_tag(Tag::new(tag_type));
    tag_type
}

/// Embeds the JPEG at `image_path` as the front cover of `audio_path` and
/// writes `track` as its track number.
///
/// Any previous front cover is replaced.
pub fn embed_cover(audio_path: &Path, image_path: &Path, track: u32) -> Result<()> {
    debug!(
        "Embedding {} into {} as track {}",
        image_path.display(),
        audio_path.display(),
        track
    );

    let image_bytes = std::fs::read(image_path)?;
    let mut tagged_file = read_from_path(audio_path)?;

    let tag_type = writable_tag_type(&mut tagged_file);
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| Error::Path(format!("{} has no writable tag", audio_path.display())))?;

    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Jpeg),
        Some("Cover".to_string()),
        image_bytes,
    ));
    tag.set_track(track);

    save(&tagged_file, audio_path)
}

/// Writes only the track number, for tracks that have no cover art.
pub fn set_track_number(audio_path: &Path, track: u32) -> Result<()> {
    let mut tagged_file = read_from_path(audio_path)?;

    let tag_type = writable_tag_type(&mut tagged_file);
    if let Some(tag) = tagged_file.tag_mut(tag_type) {
        tag.set_track(track);
    }

    save(&tagged_file, audio_path)
}

fn save(tagged_file: &TaggedFile, path: &Path) -> Result<()> {
    let write_options = WriteOptions::new()
        .use_id3v23(true)
        .remove_others(false)
        .respect_read_only(false);

    tagged_file.save_to_path(path, write_options)?;
    Ok(())
}

/// Returns the embedded front cover, if any tag in the file carries one.
pub fn read_cover(audio_path: &Path) -> Result<Option<Vec<u8>>> {
    let tagged_file = read_from_path(audio_path)?;

    Ok(tagged_file.tags().iter().find_map(|tag| {
        tag.pictures()
            .iter()
            .find(|picture| picture.pic_type() == PictureType::CoverFront)
            .map(|picture| picture.data().to_vec())
    }))
}

pub fn read_track_number(audio_path: &Path) -> Result<Option<u32>> {
    let tagged_file = read_from_path(audio_path)?;
    Ok(tagged_file.tags().iter().find_map(|tag| tag.track()))
}
