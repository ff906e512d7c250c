//! Batch driver for the trim-rename-tag pipeline.
//!
//! One run lists the pending source directory and, for each file in name
//! order: parses tag and date from the filename, resolves show metadata,
//! builds the destination name, decodes, trims and fades, exports (with
//! fallback copy) and tags. Files are handled sequentially and each one
//! exactly once; only startup failures abort the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::audio::{self, Mp3Encoder, TrimSettings};
use crate::config::Config;
use crate::error::{Error, ExportError, ResultExt};
use crate::export::{self, ExportOutcome};
use crate::metadata::{self, AmbiguityPolicy, MetadataSource, ShowMetadata};
use crate::naming::{self, FilenameConvention, SourceFileDescriptor};
use crate::tagging::{self, EpisodeTags};

/// Where a batch run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Listing,
    /// Index into the listed files
    Processing(usize),
    Done,
}

/// What happened to one listed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Destination written; `tag_error` is set when tagging failed afterwards
    /// and `source_error` when the consumed source could not be removed
    Exported {
        destination: PathBuf,
        export: ExportOutcome,
        tag_error: Option<String>,
        source_error: Option<String>,
    },
    /// Left in place; nothing written
    Skipped { reason: String },
    /// Not even the fallback copy could be written; source kept
    Errored { reason: String },
}

/// Per-file outcomes of one run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub files: Vec<(String, FileOutcome)>,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.count(|o| {
            matches!(o, FileOutcome::Exported { export, .. } if export.is_passed())
        })
    }

    pub fn fallbacks(&self) -> usize {
        self.count(|o| {
            matches!(o, FileOutcome::Exported { export: ExportOutcome::Failed(_), .. })
        })
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Errored { .. }))
    }

    pub fn outcome(&self, filename: &str) -> Option<&FileOutcome> {
        self.files
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Planned rename for a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub destination: Result<PathBuf, String>,
}

/// Per-file settings pulled out of [`Config`].
#[derive(Debug, Clone)]
struct RunSettings {
    source_dir: PathBuf,
    destination_dir: PathBuf,
    trim: TrimSettings,
    bitrate_kbps: u32,
    ambiguity: AmbiguityPolicy,
}

/// Runs the pipeline over a source directory.
pub struct BatchDriver {
    settings: RunSettings,
    source: Box<dyn MetadataSource>,
    convention: Box<dyn FilenameConvention>,
    encoder: Box<dyn Mp3Encoder>,
    state: BatchState,
}

impl BatchDriver {
    pub fn new(
        config: &Config,
        source: Box<dyn MetadataSource>,
        convention: Box<dyn FilenameConvention>,
        encoder: Box<dyn Mp3Encoder>,
    ) -> Self {
        Self {
            settings: RunSettings {
                source_dir: config.paths.source_dir(),
                destination_dir: config.paths.destination_dir(),
                trim: config.audio.trim_settings(),
                bitrate_kbps: config.audio.export_bitrate_kbps,
                ambiguity: config.metadata.on_ambiguous,
            },
            source,
            convention,
            encoder,
            state: BatchState::Idle,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Processes every pending file once.
    ///
    /// Fails only if the destination can't be created or the source
    /// directory can't be read.
    pub async fn run(&mut self) -> crate::error::Result<BatchReport> {
        std::fs::create_dir_all(&self.settings.destination_dir).with_context(format!(
            "Failed to create destination directory {}",
            self.settings.destination_dir.display()
        ))?;

        self.state = BatchState::Listing;
        let pending = list_pending(&self.settings.source_dir)?;

        let mut report = BatchReport::default();
        if pending.is_empty() {
            tracing::info!("No files to trim, exiting");
            self.state = BatchState::Done;
            return Ok(report);
        }

        tracing::info!(
            count = pending.len(),
            convention = self.convention.name(),
            "Found files to trim"
        );

        for (index, path) in pending.iter().enumerate() {
            self.state = BatchState::Processing(index);
            let filename = file_name(path);
            let outcome = self.process_file(path, &filename).await;
            report.files.push((filename, outcome));
        }

        self.state = BatchState::Done;
        tracing::info!(
            passed = report.passed(),
            fallbacks = report.fallbacks(),
            skipped = report.skipped(),
            errored = report.errored(),
            "Finished trimming stage"
        );
        Ok(report)
    }

    /// Resolves destination names for every pending file without touching them.
    ///
    /// A file whose destination already exists, or is claimed by an earlier
    /// file in this listing, is reported the way `run` would skip it.
    pub async fn plan(&self) -> crate::error::Result<Vec<PlannedFile>> {
        let pending = list_pending(&self.settings.source_dir)?;
        let mut planned = Vec::with_capacity(pending.len());
        let mut claimed = HashSet::new();

        for path in pending {
            let filename = file_name(&path);
            let destination = match self.prepare(&filename).await {
                Ok((_, _, name)) => {
                    let destination = self.settings.destination_dir.join(name);
                    if destination.exists() || !claimed.insert(destination.clone()) {
                        Err(destination_taken(&destination))
                    } else {
                        Ok(destination)
                    }
                }
                Err(e) => Err(e.to_string()),
            };
            planned.push(PlannedFile {
                source: path,
                destination,
            });
        }
        Ok(planned)
    }

    async fn process_file(&self, path: &Path, filename: &str) -> FileOutcome {
        tracing::info!("Starting trimming sound for {}", filename);

        let (descriptor, meta, dst_name) = match self.prepare(filename).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(file = %filename, error = %e, "Skipping file");
                return FileOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };
        let destination = self.settings.destination_dir.join(&dst_name);

        // Never overwrite an earlier export; the source stays for a rerun
        if destination.exists() {
            let reason = destination_taken(&destination);
            tracing::warn!(file = %filename, destination = %dst_name, "Skipping file: {}", reason);
            return FileOutcome::Skipped { reason };
        }

        // The decoded buffer lives only inside this expression
        let processed = audio::decode_file(path)
            .and_then(|buffer| audio::trim_and_fade(&buffer, &self.settings.trim));

        let (export, source_error) = match export::export(
            processed,
            self.encoder.as_ref(),
            self.settings.bitrate_kbps,
            &destination,
            path,
        ) {
            Ok(outcome) => (outcome, None),
            Err(ExportError::RemoveSource {
                path: _,
                error,
                outcome,
            }) => {
                tracing::warn!(file = %filename, error = %error, "Exported, but failed to remove source");
                (outcome, Some(error.to_string()))
            }
            Err(e) => {
                tracing::error!(file = %filename, error = %e, "Export failed, source kept");
                return FileOutcome::Errored {
                    reason: e.to_string(),
                };
            }
        };

        let tags = EpisodeTags::new(&meta, descriptor.date);
        let tag_error = match tagging::write_tags(&destination, &tags) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(file = %dst_name, error = %e, "Failed to write ID3 tags");
                Some(e.to_string())
            }
        };

        FileOutcome::Exported {
            destination,
            export,
            tag_error,
            source_error,
        }
    }

    /// Filename parse, metadata lookup and destination name.
    async fn prepare(
        &self,
        filename: &str,
    ) -> crate::error::Result<(SourceFileDescriptor, ShowMetadata, String)> {
        let descriptor = self.convention.parse_source_filename(filename)?;
        let meta = metadata::resolve(
            &descriptor.extracted_tag,
            self.source.as_ref(),
            self.settings.ambiguity,
        )
        .await?;

        let dst_name = naming::build_filename(
            &descriptor.extracted_tag,
            &meta.show_name,
            meta.artist(),
            meta.episode_number.as_str(),
            &descriptor.extracted_date,
        );
        Ok((descriptor, meta, dst_name))
    }
}

/// Non-hidden regular files directly inside `dir`, sorted by name.
fn list_pending(dir: &Path) -> crate::error::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry
            .map_err(|e| Error::Io(e.into()))
            .with_context(format!("Failed to read source directory {}", dir.display()))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn destination_taken(destination: &Path) -> String {
    format!("Destination {} already exists", destination.display())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SheetTable;
    use crate::naming::HyphenConvention;
    use crate::error::ProcessingError;
    use crate::test_utils::{
        FailingEncoder, LogCapture, StubEncoder, read_tag, show_row, silence_then_tone,
        write_wav,
    };
    use lofty::tag::Accessor;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn config_for(root: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.root = root.path().to_path_buf();
        config
    }

    fn neon_table() -> SheetTable {
        SheetTable::from_rows(vec![(
            "NEON".into(),
            show_row("Show Name", "", 12, "House"),
        )])
    }

    fn driver(config: &Config, table: SheetTable, encoder: Box<dyn Mp3Encoder>) -> BatchDriver {
        BatchDriver::new(config, Box::new(table), Box::new(HyphenConvention), encoder)
    }

    fn write_show(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let buffer = silence_then_tone(8_000, 1, 400, 1_000, 400);
        write_wav(&path, buffer.samples(), 8_000, 1);
        path
    }

    #[tokio::test]
    async fn test_end_to_end_trim_rename_tag() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let source = write_show(&source_dir, "20240115-NEON-Show Name.wav");

        let mut driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let report = driver.run().await.unwrap();

        let expected = config
            .paths
            .destination_dir()
            .join("20240115_NEON_Show_Name_12_Show_Name.mp3");
        assert_eq!(
            report.outcome("20240115-NEON-Show Name.wav"),
            Some(&FileOutcome::Exported {
                destination: expected.clone(),
                export: ExportOutcome::Passed,
                tag_error: None,
                source_error: None,
            })
        );
        assert!(expected.exists());
        assert!(!source.exists());
        assert_eq!(driver.state(), BatchState::Done);

        let tag = read_tag(&expected);
        assert_eq!(tag.artist().as_deref(), Some("Show Name"));
        assert_eq!(tag.title().as_deref(), Some("Show Name"));
        assert_eq!(tag.track(), Some(12));
        assert_eq!(tag.genre().as_deref(), Some("House"));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_skipped_and_source_kept() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let source = write_show(&source_dir, "20240115-XYZ-Mystery.wav");

        let logs = LogCapture::start();
        let mut driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let report = driver.run().await.unwrap();

        assert_eq!(report.skipped(), 1);
        assert_eq!(logs.count("WARN", "Skipping file"), 1);
        assert!(matches!(
            report.outcome("20240115-XYZ-Mystery.wav"),
            Some(FileOutcome::Skipped { reason }) if reason.contains("XYZ")
        ));
        assert!(source.exists());
        let written: Vec<_> = fs::read_dir(config.paths.destination_dir())
            .unwrap()
            .collect();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_source_falls_back_to_copy() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let source = source_dir.join("20240115-NEON-Show Name.wav");
        let corrupt: Vec<u8> = b"RIFF\x10\x00\x00\x00WAVEtruncated".to_vec();
        fs::write(&source, &corrupt).unwrap();

        let logs = LogCapture::start();
        let mut driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let report = driver.run().await.unwrap();

        assert_eq!(
            logs.count("INFO", "FAILED: Trim and fade in/out for: 20240115-NEON-Show Name.wav"),
            1
        );
        assert_eq!(logs.count("INFO", "PASSED:"), 0);

        let expected = config
            .paths
            .destination_dir()
            .join("20240115_NEON_Show_Name_12_Show_Name.mp3");
        assert_eq!(report.fallbacks(), 1);
        assert_eq!(fs::read(&expected).unwrap(), corrupt);
        assert!(!source.exists());
        // Tagging a non-MP3 fallback copy fails without undoing the export
        assert!(matches!(
            report.outcome("20240115-NEON-Show Name.wav"),
            Some(FileOutcome::Exported { tag_error: Some(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_encoder_failure_falls_back_to_copy() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let source = write_show(&source_dir, "20240115-NEON-Show Name.wav");
        let original = fs::read(&source).unwrap();

        let mut driver = driver(&config, neon_table(), Box::new(FailingEncoder));
        let report = driver.run().await.unwrap();

        let expected = config
            .paths
            .destination_dir()
            .join("20240115_NEON_Show_Name_12_Show_Name.mp3");
        assert_eq!(report.fallbacks(), 1);
        assert_eq!(fs::read(&expected).unwrap(), original);
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_empty_source_dir_is_noop() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        fs::create_dir_all(config.paths.source_dir()).unwrap();
        fs::write(config.paths.source_dir().join(".DS_Store"), b"x").unwrap();

        let mut driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let report = driver.run().await.unwrap();

        assert!(report.files.is_empty());
        assert_eq!(driver.state(), BatchState::Done);
        assert!(config.paths.destination_dir().is_dir());
    }

    #[tokio::test]
    async fn test_missing_source_dir_is_fatal() {
        let root = tempdir().unwrap();
        let config = config_for(&root);

        let mut driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        assert!(driver.run().await.is_err());
    }

    #[tokio::test]
    async fn test_every_file_attempted_once_in_order() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        write_show(&source_dir, "20240116-NEON-Second.wav");
        write_show(&source_dir, "20240115-NEON-First.wav");
        fs::write(source_dir.join("notes.txt"), b"not a show").unwrap();

        let mut driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let report = driver.run().await.unwrap();

        let names: Vec<_> = report.files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "20240115-NEON-First.wav",
                "20240116-NEON-Second.wav",
                "notes.txt"
            ]
        );
        assert_eq!(report.passed(), 2);
        // notes.txt fails the naming convention and is left alone
        assert_eq!(report.skipped(), 1);
        assert!(source_dir.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_ambiguous_tag_skipped_by_default() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let source = write_show(&source_dir, "20240115-NEON-Show.wav");

        let table = SheetTable::from_rows(vec![
            ("NEON".into(), show_row("Show Name", "", 12, "House")),
            ("NEON".into(), show_row("Other Show", "", 3, "Techno")),
        ]);
        let mut driver = driver(&config, table, Box::new(StubEncoder::default()));
        let report = driver.run().await.unwrap();

        assert!(matches!(
            report.outcome("20240115-NEON-Show.wav"),
            Some(FileOutcome::Skipped { reason }) if reason.contains("Ambiguous")
        ));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_plan_does_not_touch_files() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let good = write_show(&source_dir, "20240115-NEON-Show Name.wav");
        let bad = write_show(&source_dir, "20240115-XYZ-Show.wav");

        let driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let plan = driver.plan().await.unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].source, good);
        assert_eq!(
            plan[0].destination,
            Ok(config
                .paths
                .destination_dir()
                .join("20240115_NEON_Show_Name_12_Show_Name.mp3"))
        );
        assert_eq!(plan[1].source, bad);
        assert!(plan[1].destination.is_err());
        assert!(good.exists() && bad.exists());
        assert!(!config.paths.destination_dir().exists());
    }

    /// Encoder that deletes the source while encoding, so cleanup fails.
    struct SourceStealingEncoder(PathBuf);

    impl Mp3Encoder for SourceStealingEncoder {
        fn encode(
            &self,
            buffer: &audio::AudioBuffer,
            bitrate_kbps: u32,
            destination: &Path,
        ) -> Result<(), ProcessingError> {
            fs::remove_file(&self.0).unwrap();
            StubEncoder::default().encode(buffer, bitrate_kbps, destination)
        }
    }

    #[tokio::test]
    async fn test_two_parts_with_same_destination_keep_second_source() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let part_one = write_show(&source_dir, "20240115-NEON-Part One.wav");
        let part_two = write_show(&source_dir, "20240115-NEON-Part Two.wav");

        let logs = LogCapture::start();
        let mut driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let report = driver.run().await.unwrap();

        assert_eq!(report.passed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            report.outcome("20240115-NEON-Part Two.wav"),
            Some(FileOutcome::Skipped { reason }) if reason.contains("already exists")
        ));
        assert_eq!(logs.count("WARN", "already exists"), 1);
        assert!(!part_one.exists());
        assert!(part_two.exists());

        let outputs: Vec<_> = fs::read_dir(config.paths.destination_dir())
            .unwrap()
            .collect();
        assert_eq!(outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_destination_from_earlier_run_is_not_overwritten() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        let destination_dir = config.paths.destination_dir();
        fs::create_dir_all(&source_dir).unwrap();
        fs::create_dir_all(&destination_dir).unwrap();
        let earlier = destination_dir.join("20240115_NEON_Show_Name_12_Show_Name.mp3");
        fs::write(&earlier, b"already uploaded").unwrap();
        let source = write_show(&source_dir, "20240115-NEON-Show Name.wav");

        let calls = std::sync::Arc::new(std::sync::Mutex::new(0));
        let encoder = StubEncoder::counting(calls.clone());
        let mut driver = driver(&config, neon_table(), Box::new(encoder));
        let report = driver.run().await.unwrap();

        assert_eq!(report.skipped(), 1);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(fs::read(&earlier).unwrap(), b"already uploaded");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_plan_reports_destination_conflicts() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        write_show(&source_dir, "20240115-NEON-Part One.wav");
        write_show(&source_dir, "20240115-NEON-Part Two.wav");

        let driver = driver(&config, neon_table(), Box::new(StubEncoder::default()));
        let plan = driver.plan().await.unwrap();

        assert!(plan[0].destination.is_ok());
        assert!(matches!(
            &plan[1].destination,
            Err(reason) if reason.contains("already exists")
        ));
    }

    #[tokio::test]
    async fn test_source_removal_failure_still_tags_export() {
        let root = tempdir().unwrap();
        let config = config_for(&root);
        let source_dir = config.paths.source_dir();
        fs::create_dir_all(&source_dir).unwrap();
        let source = write_show(&source_dir, "20240115-NEON-Show Name.wav");

        let mut driver = driver(
            &config,
            neon_table(),
            Box::new(SourceStealingEncoder(source.clone())),
        );
        let report = driver.run().await.unwrap();

        let Some(FileOutcome::Exported {
            destination,
            export,
            tag_error,
            source_error,
        }) = report.outcome("20240115-NEON-Show Name.wav")
        else {
            panic!("expected an exported outcome");
        };
        assert!(export.is_passed());
        assert!(tag_error.is_none());
        assert!(source_error.is_some());
        assert_eq!(report.errored(), 0);
        assert_eq!(read_tag(destination).artist().as_deref(), Some("Show Name"));
    }
}
