//! Batch run and dry-run preview.

use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::audio::FfmpegEncoder;
use crate::config::{Config, MetadataBackend, MetadataConfig};
use crate::metadata::{MetadataSource, SheetTable, SqliteMetadataSource};
use crate::pipeline::{BatchDriver, FileOutcome};

/// Trim, rename and tag every pending recording
pub fn cmd_run(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let mut driver = build_driver(config).await?;
        let report = driver.run().await?;
        debug!(state = ?driver.state(), files = report.files.len(), "Batch driver stopped");

        for (name, outcome) in &report.files {
            match outcome {
                FileOutcome::Exported {
                    destination,
                    export,
                    tag_error,
                    source_error,
                } => {
                    let mark = if export.is_passed() { "✓" } else { "!" };
                    println!("{} {} → {}", mark, name, destination.display());
                    if let Some(e) = tag_error {
                        println!("    tags not written: {}", e);
                    }
                    if let Some(e) = source_error {
                        println!("    source not removed: {}", e);
                    }
                }
                FileOutcome::Skipped { reason } => println!("- {} skipped: {}", name, reason),
                FileOutcome::Errored { reason } => println!("✗ {} failed: {}", name, reason),
            }
        }

        println!(
            "\n{} passed, {} copied unmodified, {} skipped, {} failed",
            report.passed(),
            report.fallbacks(),
            report.skipped(),
            report.errored()
        );

        if report.errored() > 0 {
            anyhow::bail!("{} file(s) could not be exported", report.errored());
        }
        Ok(())
    })
}

/// Show the planned renames without touching any file
pub fn cmd_plan(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let driver = build_driver(config).await?;
        let plan = driver.plan().await?;

        if plan.is_empty() {
            println!("No files to trim in {}", config.paths.source_dir().display());
            return Ok(());
        }

        for file in &plan {
            let source = file
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match &file.destination {
                Ok(destination) => println!("{} → {}", source, destination.display()),
                Err(reason) => println!("{} (skip: {})", source, reason),
            }
        }
        println!("\nDry run - no files were changed.");
        Ok(())
    })
}

async fn build_driver(config: &Config) -> anyhow::Result<BatchDriver> {
    let source = open_metadata_source(&config.metadata).await?;
    let convention = config.naming.convention.strategy();
    let encoder = FfmpegEncoder::new(config.audio.ffmpeg_path.clone());

    info!(
        source_dir = %config.paths.source_dir().display(),
        destination_dir = %config.paths.destination_dir().display(),
        convention = convention.name(),
        "Starting trimming stage"
    );

    Ok(BatchDriver::new(
        config,
        source,
        convention,
        Box::new(encoder),
    ))
}

async fn open_metadata_source(
    config: &MetadataConfig,
) -> anyhow::Result<Box<dyn MetadataSource>> {
    Ok(match config.backend {
        MetadataBackend::Sheet => Box::new(SheetTable::load(&config.sheet_path)?),
        MetadataBackend::Sqlite => {
            Box::new(SqliteMetadataSource::connect(&config.database_url).await?)
        }
    })
}
