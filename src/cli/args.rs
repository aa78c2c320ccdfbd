//! Command-line argument parsing for Manga Fetcher
//!
//! This module defines the CLI structure using clap derive macros: chapter
//! downloads, the download history view and configuration management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::SchedulingMode;

/// Manga Fetcher - Archive manga chapters page by page
#[derive(Parser, Debug)]
#[command(
    name = "manga_fetcher",
    version,
    about = "Download manga chapters as numbered page images",
    long_about = "Downloads the pages of one or more chapters of a manga series into
<root>/<Series-Slug>/Chapter-<NNNN>/<NNN>.png. Chapters run concurrently under a
shared connection budget and every completed series is recorded in a history file."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download chapters of a series
    Download(DownloadArgs),

    /// Show the series recorded in the download history
    History,

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Series name; several words are joined with spaces
    #[arg(value_name = "NAME", required = true, num_args = 1..)]
    pub name: Vec<String>,

    /// Chapters to download, e.g. "1-3,5,10.5" (prompted for when omitted)
    #[arg(short, long, value_name = "LIST")]
    pub chapters: Option<String>,

    /// Upper-case the series name instead of title-casing it
    #[arg(short = 'U', long)]
    pub uppercase: bool,

    /// Use the series name exactly as typed
    #[arg(short, long)]
    pub edit: bool,

    /// Chapters per wave (workers in pool mode)
    #[arg(short = 'w', long, value_name = "N")]
    pub wave_size: Option<usize>,

    /// Requests allowed in flight across all chapters
    #[arg(long, value_name = "N")]
    pub connections: Option<usize>,

    /// Scheduling strategy: waves or pool
    #[arg(long, value_name = "MODE")]
    pub mode: Option<SchedulingMode>,

    /// Library root directory
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Re-download pages that already exist
    #[arg(short, long)]
    pub force: bool,

    /// Show what would be downloaded without touching the network
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Where to write it (defaults to the per-user config location)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level requested by the global flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl DownloadArgs {
    /// Reject flag values the scheduler cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.wave_size == Some(0) {
            return Err("Wave size must be greater than 0".to_string());
        }

        if self.connections == Some(0) {
            return Err("Number of connections must be greater than 0".to_string());
        }

        if self.series_name().trim().is_empty() {
            return Err("Series name must not be empty".to_string());
        }

        Ok(())
    }

    /// Series name as typed, words joined by single spaces
    pub fn series_name(&self) -> String {
        self.name.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> DownloadArgs {
        DownloadArgs {
            name: vec!["one".to_string(), "piece".to_string()],
            chapters: Some("1-3".to_string()),
            uppercase: false,
            edit: false,
            wave_size: None,
            connections: None,
            mode: None,
            root: None,
            force: false,
            dry_run: false,
        }
    }

    #[test]
    fn test_download_args_validation() {
        let mut args = base_args();
        assert!(args.validate().is_ok());

        args.wave_size = Some(0);
        assert!(args.validate().is_err());

        args.wave_size = Some(3);
        args.connections = Some(0);
        assert!(args.validate().is_err());

        args.connections = None;
        args.name = vec!["  ".to_string()];
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_series_name_joins_words() {
        assert_eq!(base_args().series_name(), "one piece");
    }

    #[test]
    fn test_download_command_parsing() {
        let cli = Cli::try_parse_from([
            "manga_fetcher",
            "download",
            "one",
            "piece",
            "-c",
            "1-3,5",
            "-U",
            "--mode",
            "pool",
            "-w",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.series_name(), "one piece");
                assert_eq!(args.chapters.as_deref(), Some("1-3,5"));
                assert!(args.uppercase);
                assert_eq!(args.mode, Some(SchedulingMode::WorkerPool));
                assert_eq!(args.wave_size, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_level() {
        let quiet = Cli::try_parse_from(["manga_fetcher", "-q", "history"]).unwrap();
        let verbose = Cli::try_parse_from(["manga_fetcher", "history", "-v"]).unwrap();
        let debug = Cli::try_parse_from(["manga_fetcher", "--very-verbose", "history"]).unwrap();
        let default = Cli::try_parse_from(["manga_fetcher", "history"]).unwrap();

        assert_eq!(quiet.log_level(), Some(tracing::Level::ERROR));
        assert_eq!(verbose.log_level(), Some(tracing::Level::INFO));
        assert_eq!(debug.log_level(), Some(tracing::Level::DEBUG));
        assert_eq!(default.log_level(), None);
    }

    #[test]
    fn test_config_command_parsing() {
        let cli = Cli::try_parse_from(["manga_fetcher", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                action: ConfigAction::Init {
                    path: None,
                    force: true
                }
            })
        ));
    }
}
