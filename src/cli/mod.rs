//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ListCommand, ResolveCommand, ValidateCommand};
use std::ffi::OsString;

/// Inspect pipeline configuration and its scoped step overrides
#[derive(Debug, Parser, Clone)]
#[command(name = "scoped-pipeline")]
#[command(author = "Pipeline Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Resolve pipeline steps with workspace and label overrides", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List declared pipelines
    List(ListCommand),

    /// Resolve every pipeline to check the configuration
    Validate(ValidateCommand),

    /// Resolve the steps of one pipeline
    Resolve(ResolveCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
