//! ID3 tagging of exported episodes.
//!
//! Uses the lofty crate. The file type is detected from content rather than
//! the `.mp3` extension, because a fallback copy may hold the original
//! WAV/FLAC bytes under an `.mp3` name.

use chrono::{Datelike, NaiveDate};
use lofty::config::WriteOptions;
use lofty::file::{FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use std::path::Path;

use crate::error::TagWriteError;
use crate::metadata::ShowMetadata;

/// Tag values for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeTags {
    /// DJ name, already falling back to the show name
    pub artist: String,
    /// Canonical title form is the show name alone
    pub title: String,
    pub album: String,
    pub date: NaiveDate,
    pub track_number: Option<u32>,
    pub genre: Option<String>,
}

impl EpisodeTags {
    pub fn new(meta: &ShowMetadata, date: NaiveDate) -> Self {
        Self {
            artist: meta.artist().to_string(),
            title: meta.show_name.clone(),
            album: meta.show_name.clone(),
            date,
            track_number: meta.episode_number.as_track_number(),
            genre: Some(meta.genre.clone()).filter(|g| !g.trim().is_empty()),
        }
    }

    pub fn year(&self) -> u32 {
        self.date.year().max(0) as u32
    }
}

/// Writes artist, title, album, year, release date, track and genre.
///
/// Track total is left unset. Existing tags are updated in place.
pub fn write_tags(path: &Path, tags: &EpisodeTags) -> Result<(), TagWriteError> {
    let open_err = |message: String| TagWriteError::Open {
        path: path.to_path_buf(),
        message,
    };

    let mut tagged_file = Probe::open(path)
        .map_err(|e| open_err(e.to_string()))?
        .guess_file_type()
        .map_err(|e| open_err(e.to_string()))?
        .read()
        .map_err(|e| open_err(e.to_string()))?;

    if tagged_file.file_type() != FileType::Mpeg {
        return Err(TagWriteError::NotMp3 {
            path: path.to_path_buf(),
            detected: format!("{:?}", tagged_file.file_type()),
        });
    }

    let tag_type = tagged_file.primary_tag_type();
    let tag = match tagged_file.tag_mut(tag_type) {
        Some(tag) => tag,
        None => {
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file.tag_mut(tag_type).ok_or_else(|| TagWriteError::Save {
                path: path.to_path_buf(),
                message: "Failed to create tag".to_string(),
            })?
        }
    };

    tag.set_artist(tags.artist.clone());
    tag.set_title(tags.title.clone());
    tag.set_album(tags.album.clone());
    tag.set_year(tags.year());
    tag.insert_text(ItemKey::ReleaseDate, tags.date.format("%Y-%m-%d").to_string());
    if let Some(track) = tags.track_number {
        tag.set_track(track);
    }
    tag.remove_track_total();
    if let Some(ref genre) = tags.genre {
        tag.set_genre(genre.clone());
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| TagWriteError::Save {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    tracing::debug!(path = %path.display(), artist = %tags.artist, "Wrote ID3 tags");
    Ok(())
}
