use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tripsync")]
#[command(about = "Keep travel plans in step across devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local trips file
    #[arg(long, global = true, value_name = "PATH")]
    pub data_path: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync local trips with the backup store
    Sync {
        /// Resolve conflicts now instead of only listing them
        #[arg(long)]
        resolve: bool,
        /// Take the remote copy of this trip (repeatable, implies --resolve)
        #[arg(long = "use-remote", value_name = "TRIP")]
        use_remote: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List or import local trips
    Trips {
        #[command(subcommand)]
        command: Option<TripCommands>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change the sync identifier
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },
    /// Save, list, search and restore trip versions
    Version {
        #[command(subcommand)]
        command: VersionCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum TripCommands {
    /// Merge trips from a JSON export into the local file
    Import {
        /// Exported dataset (current or legacy format)
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum IdCommands {
    /// Print the current sync identifier
    Show,
    /// Use an existing sync identifier
    Set {
        /// Identifier shared by your devices
        id: String,
    },
    /// Create and store a fresh random identifier
    Generate,
}

#[derive(Subcommand)]
pub enum VersionCommands {
    /// Snapshot a trip
    Save {
        /// Trip ID, ID prefix or exact title
        trip: String,
        /// Short description of the snapshot
        note: Vec<String>,
    },
    /// List versions of a trip, newest first
    List {
        /// Trip ID, ID prefix or exact title
        trip: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find versions of any trip by note or trip title
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a saved version into the local trips file
    Restore {
        /// Version ID or unique ID prefix (see `version search`)
        version: String,
        /// Restore onto another local trip instead of the one it was saved from
        #[arg(long, value_name = "TRIP")]
        into: Option<String>,
        /// Overwrite another trip without asking
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StoreBackend {
    Memory,
    Sqlite,
    Http,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Sync identifier shared by your devices
        #[arg(long, value_name = "ID")]
        sync_id: Option<String>,
        /// Backup store backend
        #[arg(long, value_enum)]
        backend: Option<StoreBackend>,
        /// `SQLite` backup file (sqlite backend)
        #[arg(long, value_name = "PATH")]
        store_path: Option<PathBuf>,
        /// Backup service URL (http backend)
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
        /// Backup service API key (http backend)
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
