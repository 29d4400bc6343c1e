//! CLI command definitions and subcommands

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{Priority, Recurrence, Week};

/// TaskBurst - personal tasks, lists, calendar and timetables
#[derive(Parser)]
#[command(
    name = "tb",
    about = "Personal productivity store with single-instance editing",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hold this instance open in the foreground (Enter retries, Ctrl-C quits)
    Open,

    /// Show which instance holds the heartbeat
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Manage checklists
    List {
        #[command(subcommand)]
        command: ListCommand,
    },

    /// Manage calendar events
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },

    /// Manage timetables
    Timetable {
        #[command(subcommand)]
        command: TimetableCommand,
    },

    /// Manage task categories
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },

    /// Track assessments and results
    Assessment {
        #[command(subcommand)]
        command: AssessmentCommand,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Export one entity to a JSON file
    Export {
        /// Entity kind
        kind: EntityKind,

        /// Entity id (a unique prefix is enough)
        id: String,

        /// Output file (defaults to {kind}-{id}.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import one entity from a JSON file
    Import {
        /// Entity kind
        kind: EntityKind,

        file: PathBuf,
    },

    /// Write the whole store to a ZIP bundle
    Backup { file: PathBuf },

    /// Merge a ZIP bundle into the store
    Restore { file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,

        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Project id (a unique prefix is enough)
        #[arg(long)]
        project: Option<String>,

        /// Category id (a unique prefix is enough)
        #[arg(long)]
        category: Option<String>,
    },

    /// Change a task's title or description
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show earlier descriptions of a task
    History { id: String },

    /// List tasks
    List {
        /// Show deleted tasks instead
        #[arg(long, conflicts_with = "archived")]
        deleted: bool,

        /// Show archived tasks instead
        #[arg(long)]
        archived: bool,

        /// Hide completed tasks
        #[arg(long)]
        open: bool,
    },

    /// Mark a task complete
    Done { id: String },

    /// Mark a task not complete
    Reopen { id: String },

    /// Move a task to the deleted bin
    Delete { id: String },

    /// Move a task to the archive
    Archive { id: String },

    /// Bring a deleted or archived task back
    Restore { id: String },

    /// Permanently remove deleted tasks
    Purge,

    /// Move a task to a position in the list (0 is first)
    Move { id: String, position: usize },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Add a project
    Add {
        name: String,

        #[arg(long)]
        color: Option<String>,
    },

    /// List projects
    List,
}

#[derive(Debug, Subcommand)]
pub enum ListCommand {
    /// Create a checklist
    New { name: String },

    /// Show one checklist, or a summary of all of them
    Show { list: Option<String> },

    /// Add an item to a checklist
    AddItem { list: String, text: String },

    /// Check (or uncheck) an item
    Check {
        list: String,
        item: String,

        #[arg(long)]
        uncheck: bool,
    },

    /// Remove an item (it can be restored)
    RemoveItem { list: String, item: String },

    /// Restore a removed item
    RestoreItem { item: String },
}

#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Add an event (times as YYYY-MM-DDTHH:MM:SS)
    Add {
        title: String,
        start: NaiveDateTime,
        end: NaiveDateTime,

        #[arg(long)]
        recurrence: Option<Recurrence>,

        /// Last day a recurrence may fall on
        #[arg(long)]
        until: Option<NaiveDate>,

        #[arg(long)]
        all_day: bool,
    },

    /// Show one day's events with their overlap columns
    Day { date: Option<NaiveDate> },

    /// Delete an event (and all of its repeats)
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// Add a category
    Add {
        name: String,

        #[arg(long)]
        color: Option<String>,
    },

    /// List categories
    List,

    /// Remove a category and clear it from tasks
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum AssessmentCommand {
    /// Add an assessment
    Add {
        title: String,

        #[arg(long)]
        subject: Option<String>,

        /// Assessment type id (a unique prefix is enough)
        #[arg(long = "type")]
        kind: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,

        /// Share of the final grade
        #[arg(long)]
        weight: Option<f64>,

        /// Maximum score
        #[arg(long)]
        out_of: Option<f64>,
    },

    /// Record a result
    Grade {
        id: String,
        score: f64,

        /// Maximum score, if not set when the assessment was added
        #[arg(long)]
        out_of: Option<f64>,
    },

    /// List assessments with results and the weighted average
    List {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Delete an assessment
    Delete { id: String },

    /// Add an assessment type (exam, essay, ...)
    AddType { name: String },

    /// List assessment types
    Types,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print the current settings
    Show {
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Change one setting
    Set { field: SettingField, value: String },
}

/// Settings that can be changed from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingField {
    Theme,
    WeekStartsOn,
    DefaultView,
    ShowCompleted,
}

#[derive(Debug, Subcommand)]
pub enum TimetableCommand {
    /// Create a timetable
    New {
        name: String,

        /// A date in week A
        #[arg(long)]
        anchor: NaiveDate,

        /// Alternate between week A and week B
        #[arg(long)]
        fortnightly: bool,
    },

    /// Add a block to a timetable (times as HH:MM:SS)
    AddBlock {
        timetable: String,
        day: Weekday,
        start: NaiveTime,
        end: NaiveTime,
        subject: String,

        /// Only in week a or b
        #[arg(long)]
        week: Option<Week>,

        #[arg(long)]
        room: Option<String>,
    },

    /// Show the current and next block
    Now {
        timetable: String,

        /// Moment to look up instead of now (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        at: Option<NaiveDateTime>,
    },
}

/// Entity kinds that can be exported and imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Task,
    Project,
    Category,
    List,
    Event,
    Timetable,
    Assessment,
    AssessmentType,
    TextBackup,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskburst")
        .join("logs")
        .join("taskburst.log")
}

/// Output format for status and settings
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
