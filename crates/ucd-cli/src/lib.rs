//! `ucd` command-line adapter.
//!
//! `main.rs` is the composition root; everything it wires lives here so the
//! parser and presentation helpers can be tested without a binary.
#![deny(unused_crate_dependencies)]

// Logging is initialized by the binary only.
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, InstalledCommand, InstallingCommand, RootCommand};
pub use error::CliError;
pub use parser::Cli;
