//! Command-line interface for textsieve.
//!
//! Provides the `run` and `sample` commands.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands, RunArgs, SampleArgs};
