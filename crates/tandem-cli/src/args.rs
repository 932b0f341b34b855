//! Command-line argument definitions for the Tandem CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control the script and output paths,
//! configuration file selection, and logging verbosity.

use clap::Parser;

/// Replay an edit script against a diagram session and write the final
/// render tree
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the edit script (TOML)
    #[arg(help = "Path to the edit script")]
    pub script: String,

    /// Path to the output render tree (TOML)
    #[arg(short, long, default_value = "out.toml")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
