//! Destination filename construction and source filename parsing.
//!
//! Exported shows are named `{date}_{tag}_{show}_{episode}_{dj}.mp3` with
//! the normalization rules applied by [`normalize`]. Parsing of incoming
//! filenames lives in [`convention`], one strategy per naming scheme.

pub mod convention;

pub use convention::{FilenameConvention, HyphenConvention, NamingConvention, UnderscoreConvention};

use chrono::NaiveDate;

/// Tag and date extracted from a pending source file's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileDescriptor {
    pub original_filename: String,
    pub extracted_tag: String,
    /// Date exactly as it appears in the filename
    pub extracted_date: String,
    pub date: NaiveDate,
}

/// Applies the filename rules: space to underscore, drop `/`, `&` to `and`.
///
/// Idempotent: none of the replacements produce a character another rule
/// would rewrite.
pub fn normalize(name: &str) -> String {
    name.replace(' ', "_").replace('/', "").replace('&', "and")
}

/// Builds the canonical destination filename for an episode.
///
/// An empty `dj_name` falls back to `show_name`, matching the artist tag.
pub fn build_filename(
    tag: &str,
    show_name: &str,
    dj_name: &str,
    episode_number: &str,
    date: &str,
) -> String {
    let dj_name = if dj_name.trim().is_empty() {
        show_name
    } else {
        dj_name
    };

    normalize(&format!(
        "{date}_{tag}_{show_name}_{episode_number}_{dj_name}.mp3"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rules() {
        assert_eq!(normalize("Show Name"), "Show_Name");
        assert_eq!(normalize("AC/DC"), "ACDC");
        assert_eq!(normalize("Drum & Bass"), "Drum_and_Bass");
        assert_eq!(normalize("Already_Clean"), "Already_Clean");
    }

    #[test]
    fn test_build_filename_orders_fields() {
        let name = build_filename("NEON", "Night Shift", "DJ Ray", "7", "20240115");
        assert_eq!(name, "20240115_NEON_Night_Shift_7_DJ_Ray.mp3");
    }

    #[test]
    fn test_build_filename_empty_dj_uses_show_name() {
        let name = build_filename("NEON", "Show Name", "", "12", "20240115");
        assert_eq!(name, "20240115_NEON_Show_Name_12_Show_Name.mp3");
    }

    #[test]
    fn test_build_filename_special_chars() {
        let name = build_filename("RNB", "R&B / Soul", "Kim & Lee", "3", "20230301");
        assert_eq!(name, "20230301_RNB_RandB__Soul_3_Kim_and_Lee.mp3");
    }
}
