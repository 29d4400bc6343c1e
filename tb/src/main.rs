//! TaskBurst CLI entry point

use std::fs;
use std::path::{Path, PathBuf};

use burststore::{Store, now_ms};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::io::AsyncBufReadExt;
use tracing::{debug, info};

use taskburst::board::{Collection, Gradebook, ListBoard, TaskBin, TaskBoard};
use taskburst::cli::{
    AssessmentCommand, CategoryCommand, Cli, Command, EntityKind, EventCommand, ListCommand, OutputFormat,
    ProjectCommand, SettingField, SettingsCommand, TaskCommand, TimetableCommand, get_log_path,
};
use taskburst::config::Config;
use taskburst::coordinator::{CoordinatorRunner, HeartbeatLock, InstanceLock, InstanceState, with_instance};
use taskburst::domain::{
    Assessment, AssessmentType, CalendarEvent, Category, Priority, Project, Record, Recurrence, Settings, Task,
    TaskList, TextBackup, Timetable, TimetableBlock, keys, weighted_average,
};
use taskburst::schedule::{events_on, layout_overlaps};
use taskburst::transfer::{default_file_name, export_bundle, export_entity, import_bundle, import_entity};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let store = Store::open(&config.storage.path)
        .context(format!("Failed to open store at {}", config.storage.path.display()))?;
    info!(path = %config.storage.path.display(), "Store opened");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Open => cmd_open(&config, store).await,
        Command::Status { format } => cmd_status(&config, &store, format),
        Command::Task { command } => cmd_task(&config, &store, command),
        Command::Project { command } => cmd_project(&config, &store, command),
        Command::List { command } => cmd_list(&config, &store, command),
        Command::Event { command } => cmd_event(&config, &store, command),
        Command::Timetable { command } => cmd_timetable(&config, &store, command),
        Command::Category { command } => cmd_category(&config, &store, command),
        Command::Assessment { command } => cmd_assessment(&config, &store, command),
        Command::Settings { command } => cmd_settings(&config, &store, command),
        Command::Export { kind, id, output } => cmd_export(&store, kind, &id, output.as_deref()),
        Command::Import { kind, file } => {
            with_instance(&store, &config.instance, || cmd_import(&store, kind, &file))
        }
        Command::Backup { file } => cmd_backup(&config, &store, &file),
        Command::Restore { file } => with_instance(&store, &config.instance, || cmd_restore(&config, &store, &file)),
    }
}

fn notice(msg: impl std::fmt::Display) {
    println!("{} {}", "✓".green(), msg);
}

/// Hold the instance open until Ctrl-C
async fn cmd_open(config: &Config, store: Store) -> Result<()> {
    debug!("cmd_open: called");
    let runner = CoordinatorRunner::new(config.instance.clone(), store);
    let handle = runner.handle();
    let task = tokio::spawn(runner.run());

    println!("TaskBurst instance {}", handle.id().to_string().dimmed());
    let mut states = handle.subscribe();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                print_state(state);
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    if handle.retry().await? == InstanceState::Blocked {
                        println!("{}", "Still blocked by another instance.".yellow());
                    }
                }
                Ok(None) | Err(_) => {
                    debug!("cmd_open: stdin closed");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("cmd_open: ctrl-c");
                break;
            }
        }
    }

    let _ = handle.shutdown().await;
    task.await.context("Coordinator task failed")?;
    println!("Instance closed.");
    Ok(())
}

fn print_state(state: InstanceState) {
    match state {
        InstanceState::Active => notice("This instance is active. Press Ctrl-C to close it."),
        InstanceState::Blocked => {
            println!(
                "{} TaskBurst is open elsewhere. Close the other instance, then press Enter to retry.",
                "!".yellow().bold()
            );
        }
        InstanceState::Starting => {}
    }
}

fn cmd_status(config: &Config, store: &Store, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_status: called");
    let lock = HeartbeatLock::new(
        store.clone(),
        config.instance.heartbeat_key.clone(),
        config.instance.heartbeat_timeout_ms,
    );
    let now = now_ms();
    let holder = lock.holder();
    let live = holder.as_ref().is_some_and(|hb| hb.is_live(now, lock.timeout_ms()));

    match format {
        OutputFormat::Json => {
            let age_ms = holder.as_ref().map(|hb| hb.age_ms(now));
            let status = serde_json::json!({
                "holder": holder,
                "ageMs": age_ms,
                "live": live,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => match holder {
            None => println!("No active instance"),
            Some(hb) if live => println!(
                "Active instance: {} (heartbeat {} ms ago)",
                hb.id.green(),
                hb.age_ms(now)
            ),
            Some(hb) => println!(
                "Stale heartbeat from {} ({} ms old); the next instance will take over",
                hb.id.yellow(),
                hb.age_ms(now)
            ),
        },
    }
    Ok(())
}

fn print_task(task: &Task) {
    let mark = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let priority = match task.priority {
        Priority::High => " !".red().to_string(),
        Priority::Low => " ~".dimmed().to_string(),
        Priority::Medium => String::new(),
    };
    let due = task.due.map(|d| format!(" due {}", d)).unwrap_or_default();
    println!("{} {}{}{}  {}", mark, task.title, priority, due, task.id.dimmed());
}

fn cmd_task(config: &Config, store: &Store, command: TaskCommand) -> Result<()> {
    debug!(?command, "cmd_task: called");
    let board = TaskBoard::new(store.clone());

    match command {
        TaskCommand::List { deleted, archived, open } => {
            let bin = if deleted {
                TaskBin::Deleted
            } else if archived {
                TaskBin::Archived
            } else {
                TaskBin::Live
            };
            let tasks = board.list(bin)?;
            let shown: Vec<&Task> = tasks.iter().filter(|t| !(open && t.completed)).collect();
            if shown.is_empty() {
                println!("{}", "No tasks.".dimmed());
            }
            for task in shown {
                print_task(task);
            }
            Ok(())
        }
        TaskCommand::Add {
            title,
            description,
            due,
            priority,
            project,
            category,
        } => with_instance(store, &config.instance, || {
            let mut task = Task::new(title);
            task.description = description;
            task.due = due;
            task.priority = priority;
            if let Some(reference) = project {
                task.project_id = Some(Collection::<Project>::new(store.clone()).resolve(&reference)?.id);
            }
            if let Some(reference) = category {
                task.category_id = Some(Collection::<Category>::new(store.clone()).resolve(&reference)?.id);
            }
            let task = board.add(task)?;
            notice(format!("Added task {}", task.id));
            Ok(())
        }),
        TaskCommand::Edit { id, title, description } => {
            if title.is_none() && description.is_none() {
                return Err(eyre::eyre!("Nothing to change: pass --title or --description"));
            }
            with_instance(store, &config.instance, || {
                let target = board.collection(TaskBin::Live).resolve(&id)?;
                let task = board.edit(&target.id, title, description)?;
                notice(format!("Updated: {}", task.title));
                Ok(())
            })
        }
        TaskCommand::History { id } => {
            let task = board.collection(TaskBin::Live).resolve(&id)?;
            let history = board.history(&task.id)?;
            if history.is_empty() {
                println!("{}", "No earlier descriptions.".dimmed());
            }
            for backup in &history {
                println!("{}  {}", format_ms(backup.created_at).dimmed(), backup.content);
            }
            Ok(())
        }
        TaskCommand::Done { id } => with_instance(store, &config.instance, || {
            let task = board.complete(&board.collection(TaskBin::Live).resolve(&id)?.id)?;
            notice(format!("Completed: {}", task.title));
            Ok(())
        }),
        TaskCommand::Reopen { id } => with_instance(store, &config.instance, || {
            let task = board.reopen(&board.collection(TaskBin::Live).resolve(&id)?.id)?;
            notice(format!("Reopened: {}", task.title));
            Ok(())
        }),
        TaskCommand::Delete { id } => with_instance(store, &config.instance, || {
            let task = board.delete(&board.collection(TaskBin::Live).resolve(&id)?.id)?;
            notice(format!("Deleted: {} (restore with `tb task restore {}`)", task.title, task.id));
            Ok(())
        }),
        TaskCommand::Archive { id } => with_instance(store, &config.instance, || {
            let task = board.archive(&board.collection(TaskBin::Live).resolve(&id)?.id)?;
            notice(format!("Archived: {}", task.title));
            Ok(())
        }),
        TaskCommand::Restore { id } => with_instance(store, &config.instance, || {
            let found = board
                .collection(TaskBin::Deleted)
                .resolve(&id)
                .or_else(|_| board.collection(TaskBin::Archived).resolve(&id))?;
            let task = board.restore(&found.id)?;
            notice(format!("Restored: {}", task.title));
            Ok(())
        }),
        TaskCommand::Purge => with_instance(store, &config.instance, || {
            let count = board.purge_deleted()?;
            notice(format!("Purged {} deleted task(s)", count));
            Ok(())
        }),
        TaskCommand::Move { id, position } => with_instance(store, &config.instance, || {
            let target = board.collection(TaskBin::Live).resolve(&id)?;
            board.reorder(&target.id, position)?;
            notice(format!("Moved {} to position {}", target.title, position));
            Ok(())
        }),
    }
}

fn cmd_project(config: &Config, store: &Store, command: ProjectCommand) -> Result<()> {
    let projects = Collection::<Project>::new(store.clone());
    match command {
        ProjectCommand::Add { name, color } => with_instance(store, &config.instance, || {
            let mut all = projects.all()?;
            let mut project = Project::new(name);
            project.color = color;
            project.order = taskburst::domain::next_order(&all);
            all.push(project.clone());
            projects.save_all(&all)?;
            notice(format!("Added project {}", project.id));
            Ok(())
        }),
        ProjectCommand::List => {
            let mut all = projects.all()?;
            all.sort_by_key(|p| p.order);
            for project in all.iter().filter(|p| p.archived_at.is_none()) {
                println!("{}  {}", project.name.bold(), project.id.dimmed());
            }
            Ok(())
        }
    }
}

fn print_list(list: &TaskList) {
    let (checked, total) = list.progress();
    println!("{} ({}/{})  {}", list.name.bold(), checked, total, list.id.dimmed());
    for item in list.sorted_items() {
        let mark = if item.checked { "[x]".green() } else { "[ ]".normal() };
        println!("  {} {}  {}", mark, item.text, item.id.dimmed());
    }
}

fn cmd_list(config: &Config, store: &Store, command: ListCommand) -> Result<()> {
    let board = ListBoard::new(store.clone());
    match command {
        ListCommand::Show { list: Some(reference) } => {
            print_list(&board.lists().resolve(&reference)?);
            Ok(())
        }
        ListCommand::Show { list: None } => {
            let mut lists = board.lists().all()?;
            lists.sort_by_key(|l| l.order);
            if lists.is_empty() {
                println!("{}", "No lists.".dimmed());
            }
            for list in &lists {
                let (checked, total) = list.progress();
                println!("{} ({}/{})  {}", list.name.bold(), checked, total, list.id.dimmed());
            }
            Ok(())
        }
        ListCommand::New { name } => with_instance(store, &config.instance, || {
            let list = board.create(&name)?;
            notice(format!("Created list {}", list.id));
            Ok(())
        }),
        ListCommand::AddItem { list, text } => with_instance(store, &config.instance, || {
            let list = board.lists().resolve(&list)?;
            let item = board.add_item(&list.id, &text)?;
            notice(format!("Added item {}", item.id));
            Ok(())
        }),
        ListCommand::Check { list, item, uncheck } => with_instance(store, &config.instance, || {
            let list = board.lists().resolve(&list)?;
            let item = board.set_checked(&list.id, &item, !uncheck)?;
            notice(format!("{}: {}", if item.checked { "Checked" } else { "Unchecked" }, item.text));
            Ok(())
        }),
        ListCommand::RemoveItem { list, item } => with_instance(store, &config.instance, || {
            let list = board.lists().resolve(&list)?;
            let item = board.remove_item(&list.id, &item)?;
            notice(format!("Removed: {} (restore with `tb list restore-item {}`)", item.text, item.id));
            Ok(())
        }),
        ListCommand::RestoreItem { item } => with_instance(store, &config.instance, || {
            let item = board.restore_item(&item)?;
            notice(format!("Restored: {}", item.text));
            Ok(())
        }),
    }
}

fn cmd_event(config: &Config, store: &Store, command: EventCommand) -> Result<()> {
    let events = Collection::<CalendarEvent>::new(store.clone());
    match command {
        EventCommand::Add {
            title,
            start,
            end,
            recurrence,
            until,
            all_day,
        } => {
            if end < start {
                return Err(eyre::eyre!("Event ends before it starts"));
            }
            with_instance(store, &config.instance, || {
                let mut event = CalendarEvent::new(title, start, end);
                event.recurrence = recurrence;
                event.until = until;
                event.all_day = all_day;
                events.insert(event.clone())?;
                notice(format!("Added event {}", event.id));
                Ok(())
            })
        }
        EventCommand::Day { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            print_day(&events.all()?, date);
            Ok(())
        }
        EventCommand::Delete { id } => with_instance(store, &config.instance, || {
            let target = events.resolve(&id)?;
            if target.deleted_at.is_some() {
                return Err(eyre::eyre!("Event already deleted: {}", target.title));
            }
            let now = now_ms();
            events.update(&target.id, |event| event.deleted_at = Some(now))?;
            notice(format!("Deleted event: {}", target.title));
            Ok(())
        }),
    }
}

/// Local wall-clock rendering of a Unix-millisecond timestamp
fn format_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn print_day(events: &[CalendarEvent], date: NaiveDate) {
    println!("{}", date.format("%A %Y-%m-%d").to_string().bold());
    let occurrences = events_on(events, date);
    if occurrences.is_empty() {
        println!("{}", "No events.".dimmed());
        return;
    }

    let intervals: Vec<(NaiveDateTime, NaiveDateTime)> = occurrences.iter().map(|o| (o.start, o.end)).collect();
    let slots = layout_overlaps(&intervals);
    for (occ, slot) in occurrences.iter().zip(slots) {
        let when = if occ.event.all_day {
            "all day    ".to_string()
        } else {
            format!("{}-{}", occ.start.format("%H:%M"), occ.end.format("%H:%M"))
        };
        let repeat = occ
            .event
            .recurrence
            .map(|r: Recurrence| format!(" ({})", r))
            .unwrap_or_default();
        println!(
            "  {}  [{}/{}]  {}{}",
            when,
            slot.column + 1,
            slot.columns,
            occ.event.title,
            repeat.dimmed()
        );
    }
}

fn cmd_timetable(config: &Config, store: &Store, command: TimetableCommand) -> Result<()> {
    let timetables = Collection::<Timetable>::new(store.clone());
    match command {
        TimetableCommand::New {
            name,
            anchor,
            fortnightly,
        } => with_instance(store, &config.instance, || {
            let mut timetable = Timetable::new(name, anchor);
            timetable.fortnightly = fortnightly;
            timetables.insert(timetable.clone())?;
            notice(format!("Created timetable {}", timetable.id));
            Ok(())
        }),
        TimetableCommand::AddBlock {
            timetable,
            day,
            start,
            end,
            subject,
            week,
            room,
        } => {
            if end <= start {
                return Err(eyre::eyre!("Block must end after it starts"));
            }
            with_instance(store, &config.instance, || {
                let target = timetables.resolve(&timetable)?;
                timetables.update(&target.id, |tt| {
                    tt.blocks.push(TimetableBlock {
                        day,
                        week,
                        start,
                        end,
                        subject: subject.clone(),
                        room,
                    });
                })?;
                notice(format!("Added {} on {} to {}", subject, day, target.name));
                Ok(())
            })
        }
        TimetableCommand::Now { timetable, at } => {
            let timetable = timetables.resolve(&timetable)?;
            let at = at.unwrap_or_else(|| Local::now().naive_local());
            if let Some(week) = timetable.week_on(at.date()) {
                println!("{} week {}", timetable.name.bold(), week);
            } else {
                println!("{}", timetable.name.bold());
            }
            match timetable.current_block(at) {
                Some(block) => println!("Now:  {}", describe_block(block)),
                None => println!("Now:  {}", "free".dimmed()),
            }
            match timetable.next_block(at) {
                Some(block) => println!("Next: {}", describe_block(block)),
                None => println!("Next: {}", "nothing else today".dimmed()),
            }
            Ok(())
        }
    }
}

fn describe_block(block: &TimetableBlock) -> String {
    let room = block.room.as_ref().map(|r| format!(" in {}", r)).unwrap_or_default();
    format!(
        "{} {}-{}{}",
        block.subject,
        block.start.format("%H:%M"),
        block.end.format("%H:%M"),
        room
    )
}

fn cmd_category(config: &Config, store: &Store, command: CategoryCommand) -> Result<()> {
    let categories = Collection::<Category>::new(store.clone());
    match command {
        CategoryCommand::Add { name, color } => with_instance(store, &config.instance, || {
            let mut category = Category::new(name);
            category.color = color;
            categories.insert(category.clone())?;
            notice(format!("Added category {}", category.id));
            Ok(())
        }),
        CategoryCommand::List => {
            let all = categories.all()?;
            if all.is_empty() {
                println!("{}", "No categories.".dimmed());
            }
            for category in &all {
                let color = category.color.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default();
                println!("{}{}  {}", category.name.bold(), color, category.id.dimmed());
            }
            Ok(())
        }
        CategoryCommand::Delete { id } => with_instance(store, &config.instance, || {
            let target = categories.resolve(&id)?;
            let board = TaskBoard::new(store.clone());
            let mut cleared = 0;
            for bin in [TaskBin::Live, TaskBin::Deleted, TaskBin::Archived] {
                let tasks = board.collection(bin);
                let mut all = tasks.all()?;
                let mut touched = false;
                for task in all.iter_mut().filter(|t| t.category_id.as_deref() == Some(target.id.as_str())) {
                    task.category_id = None;
                    touched = true;
                    cleared += 1;
                }
                if touched {
                    tasks.save_all(&all)?;
                }
            }
            categories.remove(&target.id)?;
            notice(format!("Deleted category {} ({} task(s) cleared)", target.name, cleared));
            Ok(())
        }),
    }
}

fn print_assessment(assessment: &Assessment, types: &[AssessmentType]) {
    let result = match (assessment.score, assessment.max_score, assessment.percentage()) {
        (Some(score), Some(max), Some(pct)) => format!("{}/{} ({:.1}%)", score, max, pct),
        _ => "ungraded".dimmed().to_string(),
    };
    let kind = assessment
        .assessment_type_id
        .as_ref()
        .and_then(|id| types.iter().find(|t| &t.id == id))
        .map(|t| format!(" [{}]", t.name))
        .unwrap_or_default();
    let subject = assessment.subject.as_ref().map(|s| format!(" {}", s)).unwrap_or_default();
    let due = assessment.due.map(|d| format!(" due {}", d)).unwrap_or_default();
    println!(
        "{}{}{}{}  {}  {}",
        assessment.title.bold(),
        kind,
        subject.dimmed(),
        due,
        result,
        assessment.id.dimmed()
    );
}

fn cmd_assessment(config: &Config, store: &Store, command: AssessmentCommand) -> Result<()> {
    let book = Gradebook::new(store.clone());
    match command {
        AssessmentCommand::Add {
            title,
            subject,
            kind,
            due,
            weight,
            out_of,
        } => with_instance(store, &config.instance, || {
            let mut assessment = Assessment::new(title);
            assessment.subject = subject;
            assessment.due = due;
            assessment.weight = weight;
            assessment.max_score = out_of;
            if let Some(reference) = kind {
                assessment.assessment_type_id = Some(book.types().resolve(&reference)?.id);
            }
            let assessment = book.add(assessment)?;
            notice(format!("Added assessment {}", assessment.id));
            Ok(())
        }),
        AssessmentCommand::Grade { id, score, out_of } => with_instance(store, &config.instance, || {
            let target = book.assessments().resolve(&id)?;
            let graded = book.grade(&target.id, score, out_of)?;
            let pct = graded.percentage().unwrap_or_default();
            notice(format!("Graded {}: {:.1}%", graded.title, pct));
            Ok(())
        }),
        AssessmentCommand::List { subject } => {
            let items = book.list(subject.as_deref())?;
            let types = book.types().all()?;
            if items.is_empty() {
                println!("{}", "No assessments.".dimmed());
                return Ok(());
            }
            for assessment in &items {
                print_assessment(assessment, &types);
            }
            match weighted_average(&items) {
                Some(avg) => println!("Weighted average: {:.1}%", avg),
                None => println!("Weighted average: {}", "no results yet".dimmed()),
            }
            Ok(())
        }
        AssessmentCommand::Delete { id } => with_instance(store, &config.instance, || {
            let target = book.assessments().resolve(&id)?;
            book.delete(&target.id)?;
            notice(format!("Deleted assessment: {}", target.title));
            Ok(())
        }),
        AssessmentCommand::AddType { name } => with_instance(store, &config.instance, || {
            let kind = book.add_type(&name)?;
            notice(format!("Added assessment type {}", kind.id));
            Ok(())
        }),
        AssessmentCommand::Types => {
            for kind in book.types().all()? {
                println!("{}  {}", kind.name.bold(), kind.id.dimmed());
            }
            Ok(())
        }
    }
}

fn cmd_settings(config: &Config, store: &Store, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show { format } => {
            let settings: Settings = store.load_or_default(keys::SETTINGS, Settings::default());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
                OutputFormat::Text => {
                    println!("theme: {}", settings.theme);
                    println!("week-starts-on: {}", settings.week_starts_on);
                    println!("default-view: {}", settings.default_view);
                    println!("show-completed: {}", settings.show_completed);
                }
            }
            Ok(())
        }
        SettingsCommand::Set { field, value } => with_instance(store, &config.instance, || {
            let mut settings: Settings = store.load_or_default(keys::SETTINGS, Settings::default());
            match field {
                SettingField::Theme => settings.theme = value.parse().map_err(|e: String| eyre::eyre!(e))?,
                SettingField::WeekStartsOn => {
                    settings.week_starts_on = value
                        .parse()
                        .map_err(|_| eyre::eyre!("Unknown weekday: {}", value))?
                }
                SettingField::DefaultView => {
                    settings.default_view = value.parse().map_err(|e: String| eyre::eyre!(e))?
                }
                SettingField::ShowCompleted => {
                    settings.show_completed = value
                        .parse()
                        .map_err(|_| eyre::eyre!("Expected true or false, got {}", value))?
                }
            }
            store.save(keys::SETTINGS, &settings)?;
            notice(format!("Settings updated: {}", value));
            Ok(())
        }),
    }
}

/// Dispatch a generic transfer function over the entity kind
macro_rules! for_kind {
    ($kind:expr, $f:ident ( $($arg:expr),* )) => {
        match $kind {
            EntityKind::Task => $f::<Task>($($arg),*),
            EntityKind::Project => $f::<Project>($($arg),*),
            EntityKind::Category => $f::<Category>($($arg),*),
            EntityKind::List => $f::<TaskList>($($arg),*),
            EntityKind::Event => $f::<CalendarEvent>($($arg),*),
            EntityKind::Timetable => $f::<Timetable>($($arg),*),
            EntityKind::Assessment => $f::<Assessment>($($arg),*),
            EntityKind::AssessmentType => $f::<AssessmentType>($($arg),*),
            EntityKind::TextBackup => $f::<TextBackup>($($arg),*),
        }
    };
}

fn export_one<T: Record>(store: &Store, reference: &str, output: Option<&Path>) -> Result<PathBuf> {
    let entity = Collection::<T>::new(store.clone()).resolve(reference)?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_file_name(T::KIND, entity.id())));
    export_entity(&entity, &path).context(format!("Failed to export to {}", path.display()))?;
    Ok(path)
}

fn import_one<T: Record>(store: &Store, file: &Path) -> Result<String> {
    let entity: T = import_entity(store, file).context(format!("Import of {} rejected", file.display()))?;
    Ok(entity.id().to_string())
}

fn cmd_export(store: &Store, kind: EntityKind, reference: &str, output: Option<&Path>) -> Result<()> {
    debug!(?kind, %reference, "cmd_export: called");
    let path = for_kind!(kind, export_one(store, reference, output))?;
    notice(format!("Exported to {}", path.display()));
    Ok(())
}

fn cmd_import(store: &Store, kind: EntityKind, file: &Path) -> Result<()> {
    debug!(?kind, ?file, "cmd_import: called");
    let id = for_kind!(kind, import_one(store, file))?;
    notice(format!("Imported as {}", id));
    Ok(())
}

fn cmd_backup(config: &Config, store: &Store, file: &Path) -> Result<()> {
    let manifest = export_bundle(store, file, &[config.instance.heartbeat_key.as_str()])
        .context(format!("Failed to write {}", file.display()))?;
    notice(format!("Backed up {} key(s) to {}", manifest.keys.len(), file.display()));
    Ok(())
}

fn cmd_restore(config: &Config, store: &Store, file: &Path) -> Result<()> {
    let report = import_bundle(store, file, &[config.instance.heartbeat_key.as_str()])
        .context(format!("Restore from {} rejected", file.display()))?;
    for entry in &report.keys {
        let label = keys::ALL
            .iter()
            .find(|k| **k == entry.key)
            .map_or(entry.key.as_str(), |k| k.trim_start_matches("taskburst-"));
        if entry.replaced {
            println!("  {}: replaced", label);
        } else {
            println!("  {}: +{}", label, entry.added);
        }
    }
    notice(format!("Restored {} item(s)", report.total_added()));
    Ok(())
}
