//! `doit` command-line surface.
//!
//! # Responsibility
//! - Load configuration and logging, open the configured store.
//! - Map each subcommand onto one board operation or projection.

mod cli;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use clap::Parser;
use doit_core::model::defaults::INBOX_PROJECT_ID;
use doit_core::service::capture::{CaptureOverrides, PickedDue};
use doit_core::view::{self, CalendarMode, UpcomingCursor};
use doit_core::{
    init_from_config, open_outbox, open_store, AppConfig, GeminiAssistant, Priority, StorageConfig, Task,
    TaskBoard,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use cli::{Cli, Commands, ModeArg};

const DEFAULT_DB_FILE: &str = "doit.db";
const DEFAULT_OUTBOX_FILE: &str = "doit-outbox.db";

type CliResult<T> = Result<T, Box<dyn Error>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(&cli.config)?;
    init_from_config(&config.logging)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        doit_core::core_version()
    );

    // Each invocation is a new process, so storage and outbox need files.
    let storage = match config.storage {
        StorageConfig::Local { path: None } => StorageConfig::Local {
            path: Some(PathBuf::from(DEFAULT_DB_FILE)),
        },
        StorageConfig::Remote {
            base_url,
            auth_token,
            timeout_secs,
            outbox_path,
        } => StorageConfig::Remote {
            base_url,
            auth_token,
            timeout_secs,
            outbox_path: outbox_path.or_else(|| Some(PathBuf::from(DEFAULT_OUTBOX_FILE))),
        },
        other => other,
    };
    let store = open_store(&storage)?;
    let mut board = match open_outbox(&storage)? {
        Some(outbox) => TaskBoard::load_with_outbox(store, Arc::new(outbox)).await?,
        None => TaskBoard::load(store).await?,
    };
    let assistant = GeminiAssistant::from_config(&config.ai);
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Add(args) => {
            let overrides = CaptureOverrides {
                priority: args.priority.as_deref().map(str::parse::<Priority>).transpose()?,
                due: args.due.as_deref().map(parse_picked_due).transpose()?,
                description: args.description,
                project_id: args.project,
                section_id: args.section,
            };
            let task = board
                .quick_add(&assistant, &args.text.join(" "), overrides, today)
                .await?;
            println!("added {}", describe(&task));
        }
        Commands::List(args) => match args.project.as_deref() {
            None | Some(INBOX_PROJECT_ID) => print_inbox(&board),
            Some(project_id) => {
                let list = view::project(board.tasks(), project_id);
                let name = board
                    .project(project_id)
                    .map_or(project_id, |project| project.name.as_str());
                println!("{name} ({} open)", list.open_count);
                print_trees(&board, &list.tasks);
            }
        },
        Commands::Today => {
            let list = view::today(board.tasks(), today);
            println!("Today ({} open)", list.open_count);
            print_trees(&board, &list.tasks);
        }
        Commands::Upcoming(args) => {
            let mut cursor = UpcomingCursor::new(today, config.calendar.week_start.weekday());
            cursor.set_mode(match args.mode {
                ModeArg::Month => CalendarMode::Month,
                ModeArg::Week => CalendarMode::Week,
                ModeArg::Day => CalendarMode::Day,
            });
            for _ in 0..args.offset.unsigned_abs() {
                if args.offset > 0 {
                    cursor.next();
                } else {
                    cursor.prev();
                }
            }
            println!("{}", cursor.title());
            for day in cursor.visible_days() {
                let due = view::tasks_on_day(board.tasks(), day, today);
                if due.is_empty() {
                    continue;
                }
                println!("{}", day.format("%a %b %-d"));
                for task in due {
                    println!("  {}", describe(task));
                }
            }
        }
        Commands::Filters => {
            let filters = view::filters(board.tasks(), board.labels());
            for count in &filters.priorities {
                println!("{}  {} tasks", count.priority, count.open);
            }
            for label in filters.labels {
                println!("@{} {}", label.name, label.color);
            }
        }
        Commands::Search(args) => {
            for task in view::search(board.tasks(), &args.query) {
                println!("{}", describe(task));
            }
        }
        Commands::Complete(target) => {
            let done = board.toggle_task(&target.id).await?;
            println!("{} {}", if done { "completed" } else { "reopened" }, target.id);
        }
        Commands::Delete(target) => {
            let removed = board.delete_task(&target.id).await?;
            println!("deleted {} task(s)", removed.len());
        }
        Commands::Subtasks(target) => {
            let created = board.suggest_subtasks(&assistant, &target.id).await?;
            if created.is_empty() {
                println!("no subtasks suggested");
            }
            for task in &created {
                println!("added {}", describe(task));
            }
        }
        Commands::Sections(args) => {
            let project_id = args.project.as_deref().unwrap_or(INBOX_PROJECT_ID);
            if let Some(name) = args.add.as_deref() {
                let section = board.add_section(project_id, name).await?;
                println!("added section {} ({})", section.name, section.id);
            } else if let Some(id) = args.delete.as_deref() {
                let section = board.delete_section(id).await?;
                println!("deleted section {}", section.name);
            } else {
                for section in board.sections(Some(project_id)) {
                    println!("{:>3} {} ({})", section.order, section.name, section.id);
                }
            }
        }
        Commands::Sync => {
            let remaining = board.flush_pending().await;
            println!("{remaining} write(s) still pending");
        }
    }

    for notice in board.take_notices() {
        eprintln!("warning: {notice}");
    }
    Ok(())
}

fn print_inbox(board: &TaskBoard) {
    let inbox = view::inbox(board.tasks(), board.sections(Some(INBOX_PROJECT_ID)));
    println!("Inbox");
    print_trees(board, &inbox.unsectioned);
    for group in &inbox.sections {
        println!("\n## {}", group.section.name);
        print_trees(board, &group.tasks);
    }
    if !inbox.orphaned.is_empty() {
        println!("\n## (deleted section)");
        print_trees(board, &inbox.orphaned);
    }
}

fn print_trees(board: &TaskBoard, roots: &[&Task]) {
    for root in roots {
        for row in board.forest().walk(board.tasks(), &root.id) {
            println!("{}{}", "  ".repeat(row.depth), describe(row.task));
        }
    }
}

fn describe(task: &Task) -> String {
    let mut line = format!(
        "[{}] {} {} ({})",
        if task.is_completed { "x" } else { " " },
        task.priority,
        task.content,
        task.id
    );
    if let Some(due) = &task.due_string {
        line.push_str(&format!(" - {due}"));
    }
    line
}

fn parse_picked_due(raw: &str) -> CliResult<PickedDue> {
    let raw = raw.trim();
    let (naive, has_time) = match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        Ok(naive) => (naive, true),
        Err(_) => {
            let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")?;
            (day.and_time(chrono::NaiveTime::MIN), false)
        }
    };
    let at: DateTime<FixedOffset> = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("`{raw}` does not exist in the local time zone"))?
        .fixed_offset();
    Ok(PickedDue { at, has_time })
}
