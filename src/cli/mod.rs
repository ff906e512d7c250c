//! Command-line interface for show-trimmer.
//!
//! `run` processes the pending recordings, `plan` previews the renames and
//! `tag` re-tags a single exported episode.

mod commands;

pub use commands::{Cli, Commands, run_command};
