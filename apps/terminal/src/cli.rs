use clap::{Args, Parser, Subcommand, ValueEnum};
use ideaboard_core::ideas::IdeaStatus;
use ideaboard_core::session::EXPORT_FILE_NAME;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ideaboard")]
#[command(about = "Idea board with password-sealed shared boards and reminders", version)]
pub struct Cli {
    /// Directory holding the board database. Overrides IDEABOARD_DIR and the config.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add an idea to the board.
    Add(IdeaArgs),
    /// List ideas grouped by status.
    List {
        /// Category to show, or "all".
        #[arg(long, default_value = "all")]
        category: String,
    },
    /// Rewrite an existing idea.
    Edit {
        id: String,
        #[command(flatten)]
        idea: IdeaArgs,
    },
    /// Delete an idea.
    Delete { id: String },
    /// Move an idea between in progress and paused.
    Toggle { id: String },
    /// Turn the reminder for an idea on or off.
    Notify {
        id: String,
        #[arg(value_enum)]
        state: Switch,
    },
    /// Switch between the dark and light theme.
    Theme,
    /// List the categories in use.
    Categories,
    /// Seal the shared-category ideas into a file.
    Share {
        #[arg(long, value_name = "FILE", default_value = EXPORT_FILE_NAME)]
        out: PathBuf,
    },
    /// Open a sealed board file, replacing the current board.
    Open { file: PathBuf },
    /// Show dated ideas by day.
    Calendar,
    /// Stay running and raise reminders as ideas come due.
    Watch(WatchArgs),
    /// Append an idea to the stored board without opening it.
    QuickAdd(IdeaArgs),
    /// Show the effective configuration.
    Config {
        /// Write a config file with the current values.
        #[arg(long)]
        init: bool,
    },
}

#[derive(Debug, Args)]
pub struct IdeaArgs {
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, value_enum, default_value_t = StatusArg::Progress)]
    pub status: StatusArg,
    #[arg(long)]
    pub category: Option<String>,
    /// Image file to attach.
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,
    /// When the idea is due, e.g. 2024-06-01T18:00 (local) or RFC 3339.
    #[arg(long)]
    pub date: Option<String>,
    /// Do not raise a reminder when the date arrives.
    #[arg(long)]
    pub no_notify: bool,
}

#[derive(Debug, Args, Default)]
pub struct WatchArgs {
    /// Milliseconds between scans.
    #[arg(long)]
    pub period_ms: Option<u64>,
    /// How far back a scan still fires, in milliseconds.
    #[arg(long)]
    pub lookback_ms: Option<u64>,
    /// JSON file with calendar occurrences to remind about as well.
    #[arg(long, value_name = "FILE")]
    pub calendar_feed: Option<PathBuf>,
    /// Stop after this many scans.
    #[arg(long, hide = true)]
    pub ticks: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Progress,
    Paused,
}

impl From<StatusArg> for IdeaStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Progress => IdeaStatus::Progress,
            StatusArg::Paused => IdeaStatus::Paused,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}
