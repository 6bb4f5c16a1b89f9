use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Connectivity;
use crate::models::Priority;
use crate::offline::SyncPolicy;
use crate::view::Tab;

#[derive(Parser)]
#[command(author, version, about = "A small to-do list for the terminal", long_about = None)]
pub struct Cli {
    /// Task database file (defaults to ~/.tasker.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log file (defaults to tasker.log in the temp directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log level; RUST_LOG takes precedence when set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// What happens to buffered changes whose replay fails
    #[arg(long, global = true, value_name = "best-effort|retain")]
    pub sync_policy: Option<SyncPolicy>,

    /// Where the link state comes from
    #[arg(long, global = true, value_name = "always|manual")]
    pub connectivity: Option<Connectivity>,

    /// Start the TUI with the link down
    #[arg(long, global = true)]
    pub start_offline: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch TUI interface
    Tui,
    /// Add a task
    Add {
        #[arg(value_name = "NAME")]
        name: String,
        /// baixa, media or alta
        #[arg(short, long)]
        priority: Priority,
    },
    /// List tasks
    List {
        #[arg(short, long, default_value = "all")]
        tab: Tab,
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// Mark every task with this name complete
    Done {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Mark every task with this name incomplete
    Undo {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Rename every task with this name
    Rename {
        #[arg(value_name = "OLD_NAME")]
        old_name: String,
        #[arg(value_name = "NEW_NAME")]
        new_name: String,
    },
    /// Delete every task with this name
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Manage stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Store a setting (sync_policy, connectivity)
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Print a stored setting
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// List stored settings
    List,
    /// Remove a stored setting
    Unset {
        #[arg(value_name = "KEY")]
        key: String,
    },
}
