use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;
use video_skipper::error::Result;

/// Video Skipper - keyboard skip and undo for embedded web video players
#[derive(Parser)]
#[command(name = "video-skipper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Group store file (chrome.storage JSON: {"groups": {...}})
    #[arg(long, env = "VIDEO_SKIPPER_STORE", global = true)]
    pub store: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the video search once against a page snapshot
    Locate {
        /// Page snapshot JSON file
        page: PathBuf,
    },

    /// Replay a timed event scenario against a page snapshot
    Replay {
        /// Scenario JSON file ({"page", "storage"?, "events": [...]})
        scenario: PathBuf,
    },

    /// List skip groups and the one that would be active
    Groups,

    /// Native messaging host for the browser extension
    Host {
        /// Page snapshot to start from (defaults to an empty page)
        #[arg(long)]
        page: Option<PathBuf>,

        #[command(subcommand)]
        command: Option<HostCommands>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum HostCommands {
    /// Register the host manifest with the browser
    Install {
        /// ID of the extension allowed to launch the host
        #[arg(long, env = "VIDEO_SKIPPER_EXTENSION_ID")]
        extension_id: String,
    },

    /// Remove the host manifest
    Uninstall,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. retry.max_attempts)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show configuration file path
    Path,

    /// Delete the configuration file
    Reset,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Locate { page } => commands::locate::run(self, page).await,
            Commands::Replay { scenario } => commands::replay::run(self, scenario).await,
            Commands::Groups => commands::groups::run(self).await,
            Commands::Host { page, command } => {
                commands::host::run(self, page.as_deref(), command.as_ref()).await
            }
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}
