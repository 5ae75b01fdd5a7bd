//! Global arguments that apply to every subcommand.
//!
//! Flattened into [`super::Cli`]; each flag is accepted before or after the
//! subcommand.

use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase logging verbosity: `-v` INFO (one line per stage), `-vv`
    /// DEBUG (every side effect), `-vvv` TRACE.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also set by `NO_COLOR`).
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Read configuration from FILE instead of the user config.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format [default: auto, or `output.format` from config].
    #[arg(long, global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Project root directory (default: current directory). Must already
    /// exist; kiln never creates it.
    #[arg(short = 'C', long, global = true, value_name = "DIR", env = "KILN_ROOT")]
    pub root: Option<PathBuf>,
}

/// How the CLI should render its output.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human on a terminal, plain otherwise.
    #[default]
    Auto,
    Human,
    Plain,
    /// One JSON document per command.
    Json,
}
