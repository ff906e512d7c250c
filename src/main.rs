//! Show Trimmer - post-processing for recorded radio shows.
//!
//! Picks up raw show recordings, trims leading and trailing silence, adds
//! fades, exports MP3 under a name built from the show's metadata and
//! writes ID3 tags.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod tagging;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("show_trimmer=info".parse()?))
        .init();

    cli::run_command(&args)
}
