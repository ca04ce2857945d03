//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Download and install titles into a UnionCrax.Direct library.
#[derive(Parser, Debug)]
#[command(name = "ucd")]
#[command(about = "Download and manage titles in a UnionCrax.Direct library")]
#[command(version)]
pub struct Cli {
    /// Override the download root for this invocation
    #[arg(long, env = "UCD_DOWNLOAD_ROOT", global = true)]
    pub root: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
