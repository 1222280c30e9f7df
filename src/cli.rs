// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Global flags (--config, --timeout, ...) live on Cli and work with every
// subcommand; each subcommand then adds its own arguments.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bookmark-guardian",
    version,
    about = "Find broken browser bookmarks and clean them up",
    long_about = "bookmark-guardian reads a Chromium-style Bookmarks file, decides which bookmarks \
                  point at dead pages and can delete them. Ambiguous results are always treated \
                  as alive, so nothing is deleted on a hunch."
)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// JSON config file (see Config for the keys)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Per-probe timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// How many bookmarks to check at once (overrides the config file)
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Relay endpoint template containing {url} (overrides the config file)
    #[arg(long, global = true)]
    pub relay: Option<String>,

    /// Skip all network probes and use the static rules only
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a single URL looks broken
    ///
    /// Example: bookmark-guardian check https://github.com/rust-lang/rust
    Check {
        /// The URL to check
        url: String,

        /// Output the result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check every bookmark in a bookmarks file
    ///
    /// Example: bookmark-guardian scan ~/.config/google-chrome/Default/Bookmarks --delete
    Scan {
        /// Path to the Bookmarks JSON file
        file: PathBuf,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,

        /// Delete every bookmark found broken (rewrites the file)
        #[arg(long)]
        delete: bool,
    },

    /// List bookmarks whose title or URL contains a search term
    ///
    /// Example: bookmark-guardian search Bookmarks rust
    Search {
        /// Path to the Bookmarks JSON file
        file: PathBuf,

        /// Case-insensitive search term
        term: String,

        /// Output results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Move a bookmark into another folder
    ///
    /// Example: bookmark-guardian move Bookmarks 42 2
    Move {
        /// Path to the Bookmarks JSON file
        file: PathBuf,

        /// Id of the bookmark to move
        id: String,

        /// Id of the destination folder
        folder: String,
    },
}
