use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Warm and inspect the video prefetch state of a showreel catalog
#[derive(Parser)]
#[command(name = "showreel", version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "SHOWREEL_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how each source locator would be played
    Classify {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// List catalog items with their cached state
    List {
        /// Catalog file; defaults to the configured one
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Only show items in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Run one page visit: the delayed batch plus any hovers
    Prefetch {
        /// Catalog file; defaults to the configured one
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Item identifier to rest the pointer on (repeatable)
        #[arg(long, value_name = "ID")]
        hover: Vec<String>,
    },
    /// Open the playback dialog on an item
    Play {
        /// Item identifier
        id: String,
        /// Catalog file; defaults to the configured one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Print the locators recorded as cached
    Status,
    /// Forget every cached locator
    Clear,
}
