//! Source filename conventions.
//!
//! Recorders upstream have used more than one naming scheme, so parsing is
//! a strategy selected from config rather than a hardcoded split:
//!
//! - [`HyphenConvention`]: `20240115-NEON-Show Name.wav`
//! - [`UnderscoreConvention`]: `20240115_NEON_Show Name.wav` or
//!   `20240115_NEON Show Name.wav`

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SourceFileDescriptor;
use crate::error::FilenameParseError;

/// Date layouts accepted in source filenames.
const DATE_FORMATS: [&str; 2] = ["%Y%m%d", "%Y-%m-%d"];

/// Extracts the show tag and recording date from a source filename.
pub trait FilenameConvention: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn parse_source_filename(
        &self,
        filename: &str,
    ) -> Result<SourceFileDescriptor, FilenameParseError>;
}

/// Convention selector as it appears in config and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NamingConvention {
    #[default]
    Hyphen,
    Underscore,
}

impl NamingConvention {
    pub fn strategy(self) -> Box<dyn FilenameConvention> {
        match self {
            NamingConvention::Hyphen => Box::new(HyphenConvention),
            NamingConvention::Underscore => Box::new(UnderscoreConvention),
        }
    }
}

/// `{date}-{tag}-{rest}`: date first, tag as the second hyphen token.
#[derive(Debug, Clone, Copy, Default)]
pub struct HyphenConvention;

impl FilenameConvention for HyphenConvention {
    fn name(&self) -> &'static str {
        "hyphen"
    }

    fn parse_source_filename(
        &self,
        filename: &str,
    ) -> Result<SourceFileDescriptor, FilenameParseError> {
        let mut parts = file_stem(filename).splitn(3, '-');
        let date = non_empty(parts.next(), filename, "date")?;
        let tag = non_empty(parts.next(), filename, "tag")?;
        // A bare "{date}-{tag}" is fine, but the tag must be delimited
        // from the title when a title is present.
        let tag = tag.trim();
        if tag.is_empty() || tag.contains(' ') {
            return Err(FilenameParseError::MissingField {
                filename: filename.to_string(),
                field: "tag",
            });
        }
        descriptor(filename, date, tag)
    }
}

/// `{date}_{tag}[_ ]{rest}`: date first, tag ends at `_` or a space.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnderscoreConvention;

impl FilenameConvention for UnderscoreConvention {
    fn name(&self) -> &'static str {
        "underscore"
    }

    fn parse_source_filename(
        &self,
        filename: &str,
    ) -> Result<SourceFileDescriptor, FilenameParseError> {
        let stem = file_stem(filename);
        let (date, rest) = stem
            .split_once('_')
            .ok_or_else(|| FilenameParseError::MissingField {
                filename: filename.to_string(),
                field: "tag",
            })?;
        let tag = rest.split(['_', ' ']).next();
        let tag = non_empty(tag, filename, "tag")?;
        let date = non_empty(Some(date), filename, "date")?;
        descriptor(filename, date, tag)
    }
}

fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

fn non_empty<'a>(
    part: Option<&'a str>,
    filename: &str,
    field: &'static str,
) -> Result<&'a str, FilenameParseError> {
    part.map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| FilenameParseError::MissingField {
            filename: filename.to_string(),
            field,
        })
}

fn descriptor(
    filename: &str,
    date: &str,
    tag: &str,
) -> Result<SourceFileDescriptor, FilenameParseError> {
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
        .ok_or_else(|| FilenameParseError::InvalidDate {
            filename: filename.to_string(),
            date: date.to_string(),
        })?;

    Ok(SourceFileDescriptor {
        original_filename: filename.to_string(),
        extracted_tag: tag.to_string(),
        extracted_date: date.to_string(),
        date: parsed,
    })
}
