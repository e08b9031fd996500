//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::Side;

/// Collision-free bidirectional layout for mind maps stored as JSON
#[derive(Parser, Debug)]
#[command(name = "mindlayout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Directory searched for .mindlayout.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a map file with a single root node
    New {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Root text
        #[arg(default_value = "Central topic")]
        text: String,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Add a child node
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Parent node id, id prefix, or "root"
        parent: String,
        text: String,
        /// Side for a new root branch (default: the emptier side)
        #[arg(short, long)]
        side: Option<Side>,
    },

    /// Remove a node and its subtree
    Remove {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
    },

    /// Move a node with its subtree under a new parent
    Move {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        new_parent: String,
        /// Side when moving directly under the root
        #[arg(short, long)]
        side: Option<Side>,
    },

    /// Change a node's position among its siblings
    Reorder {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        /// New zero-based index (clamped)
        index: usize,
    },

    /// Move a root branch to the other side
    Side {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        side: Side,
    },

    /// Record a node's rendered size
    Resize {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        width: f64,
        height: f64,
    },

    /// Print computed node positions
    Layout {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show the map as a tree
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Check a map file against the export format
    Validate {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
