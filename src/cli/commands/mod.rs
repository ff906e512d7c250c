//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `batch`: the trim-rename-tag run and its dry-run preview
//! - `tag`: re-tagging a single exported episode

mod batch;
mod tag;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

pub use batch::{cmd_plan, cmd_run};
pub use tag::cmd_tag;

use crate::config::{self, Config, MetadataBackend};
use crate::metadata::AmbiguityPolicy;
use crate::naming::NamingConvention;

/// Show Trimmer CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true, env = "SHOW_TRIMMER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Trim, rename and tag every pending recording
    Run(BatchArgs),
    /// Show what `run` would name each pending recording
    Plan(BatchArgs),
    /// Write episode tags to an exported MP3
    Tag {
        /// Path to the MP3 file
        path: PathBuf,
        /// Show name (title and album)
        #[arg(long)]
        show: String,
        /// DJ name (artist); the show name is used when omitted
        #[arg(long, default_value = "")]
        dj: String,
        /// Episode number (track)
        #[arg(long, default_value = "")]
        episode: String,
        /// Genre
        #[arg(long, default_value = "")]
        genre: String,
        /// Broadcast date, YYYYMMDD or YYYY-MM-DD
        #[arg(long)]
        date: String,
    },
}

/// Overrides shared by `run` and `plan`
#[derive(Args, Debug, Clone, Default)]
pub struct BatchArgs {
    /// Root directory holding to_mix/ and to_upload/
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// JSON export of the show spreadsheet
    #[arg(long, conflicts_with = "database")]
    pub sheet: Option<PathBuf>,
    /// SQLite database URL with a base_data table
    #[arg(long)]
    pub database: Option<String>,
    /// Source filename convention
    #[arg(long, value_enum)]
    pub convention: Option<NamingConvention>,
    /// Use the first matching row when a tag is ambiguous
    #[arg(long)]
    pub first_match: bool,
}

impl BatchArgs {
    /// Layers command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref root) = self.root {
            config.paths.root = root.clone();
        }
        if let Some(ref sheet) = self.sheet {
            config.metadata.backend = MetadataBackend::Sheet;
            config.metadata.sheet_path = sheet.clone();
        }
        if let Some(ref url) = self.database {
            config.metadata.backend = MetadataBackend::Sqlite;
            config.metadata.database_url = url.clone();
        }
        if let Some(convention) = self.convention {
            config.naming.convention = convention;
        }
        if self.first_match {
            config.metadata.on_ambiguous = AmbiguityPolicy::First;
        }
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Run(args) => {
            let config = load_config(cli, args)?;
            cmd_run(&rt, &config)
        }
        Commands::Plan(args) => {
            let config = load_config(cli, args)?;
            cmd_plan(&rt, &config)
        }
        Commands::Tag {
            path,
            show,
            dj,
            episode,
            genre,
            date,
        } => cmd_tag(path, show, dj, episode, genre, date),
    }
}

fn load_config(cli: &Cli, args: &BatchArgs) -> anyhow::Result<Config> {
    let mut config = config::load(cli.config.as_deref());
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}
