//! Re-tagging a single exported episode.

use chrono::NaiveDate;
use std::path::Path;

use crate::metadata::{EpisodeNumber, ShowMetadata};
use crate::tagging::{self, EpisodeTags};

/// Write episode tags to an exported MP3
pub fn cmd_tag(
    path: &Path,
    show: &str,
    dj: &str,
    episode: &str,
    genre: &str,
    date: &str,
) -> anyhow::Result<()> {
    let date = parse_date(date)?;
    let meta = ShowMetadata {
        show_name: show.to_string(),
        dj_name: dj.to_string(),
        episode_number: EpisodeNumber::new(episode),
        genre: genre.to_string(),
    };
    let tags = EpisodeTags::new(&meta, date);

    tagging::write_tags(path, &tags)?;
    println!("✓ Tags written to {:?}", path);
    println!("  Artist: {}", tags.artist);
    println!("  Title:  {}", tags.title);
    if let Some(track) = tags.track_number {
        println!("  Track:  {}", track);
    }
    Ok(())
}

fn parse_date(date: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d"))
        .map_err(|_| anyhow::anyhow!("Invalid date '{}': expected YYYYMMDD or YYYY-MM-DD", date))
}
