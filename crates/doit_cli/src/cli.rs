use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doit", about = "Personal task board", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "doit.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a task from free text
    Add(AddArgs),
    /// Show the inbox, or one project
    List(ListArgs),
    /// Show tasks due today
    Today,
    /// Show the upcoming calendar
    Upcoming(UpcomingArgs),
    /// Show open counts per priority and the labels
    Filters,
    /// Search content and descriptions
    Search(SearchArgs),
    /// Toggle a task's completion
    Complete(TaskRef),
    /// Delete a task and all its subtasks
    Delete(TaskRef),
    /// Ask the assistant for subtasks and add them
    Subtasks(TaskRef),
    /// List, add or delete sections
    Sections(SectionsArgs),
    /// Retry writes left in the outbox by earlier commands
    Sync,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text, e.g. "pay rent tomorrow p1"
    #[arg(required = true)]
    pub text: Vec<String>,
    /// Priority override (p1..p4)
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Due override: YYYY-MM-DD or "YYYY-MM-DD HH:MM"
    #[arg(short, long)]
    pub due: Option<String>,
    /// Description override
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long)]
    pub section: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Project id (default: inbox)
    pub project: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Month,
    Week,
    Day,
}

#[derive(Args)]
pub struct UpcomingArgs {
    #[arg(short, long, value_enum, default_value_t = ModeArg::Month)]
    pub mode: ModeArg,
    /// Steps forward (or backward when negative) from today
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset: i32,
}

#[derive(Args)]
pub struct SearchArgs {
    pub query: String,
}

#[derive(Args)]
pub struct TaskRef {
    /// Task id
    pub id: String,
}

#[derive(Args)]
pub struct SectionsArgs {
    /// Project id (default: inbox)
    #[arg(long)]
    pub project: Option<String>,
    /// Name of a section to append
    #[arg(long, conflicts_with = "delete")]
    pub add: Option<String>,
    /// Id of a section to delete
    #[arg(long)]
    pub delete: Option<String>,
}
