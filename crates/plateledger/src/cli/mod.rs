//! Command-line interface for plateledger.
//!
//! This module provides the CLI structure and command definitions for the
//! `platerec` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, HistoryCommand, LogCommand, OutputFormat, RecentCommand, StatusCommand,
};

/// platerec - Record license plate detections on the edge
///
/// Appends recognized plates to an on-device ledger: one JPEG crop plus one
/// database row per admitted sighting, with per-plate duplicate suppression.
#[derive(Debug, Parser)]
#[command(name = "platerec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a plate detection
    Log(LogCommand),

    /// Show all sightings of a plate
    History(HistoryCommand),

    /// Show the most recent detections across all plates
    Recent(RecentCommand),

    /// Show ledger status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
