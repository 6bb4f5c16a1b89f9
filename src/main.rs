mod cli;
mod config;
mod connectivity;
mod controller;
mod database;
mod editor;
mod error;
mod models;
mod offline;
mod ui;
mod view;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ConfigAction};
use config::{AppConfig, Connectivity, Overrides};
use connectivity::{AlwaysOnline, ConnectivityProbe, ManualLink};
use controller::TaskController;
use database::Database;
use models::Status;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use ui::run_tui;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let db_path = cli.db.clone().unwrap_or_else(Database::default_path);
    let db = Database::open(&db_path)
        .with_context(|| format!("cannot open task database {}", db_path.display()))?;

    match cli.command {
        Some(Commands::Tui) | None => {
            let config = AppConfig::resolve(
                &db,
                Overrides {
                    sync_policy: cli.sync_policy,
                    connectivity: cli.connectivity,
                    start_offline: cli.start_offline,
                },
            )?;
            log::info!(
                "starting tui: db={} sync_policy={} connectivity={}",
                db_path.display(),
                config.sync_policy,
                config.connectivity
            );
            let probe: Box<dyn ConnectivityProbe> = match config.connectivity {
                Connectivity::Always => Box::new(AlwaysOnline),
                Connectivity::Manual => Box::new(ManualLink::new(!config.start_offline)),
            };
            let controller = TaskController::new(db, probe, config.sync_policy)?;
            run_tui(controller)?;
        }
        Some(command) => {
            let stdin = io::stdin();
            run_command(&db, command, &mut stdin.lock(), &mut io::stdout())?;
        }
    }

    Ok(())
}

/// One-shot subcommands. Prompts are read from `input`, results go to `out`.
fn run_command<R: BufRead, W: Write>(
    db: &Database,
    command: Commands,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Add { name, priority } => {
            let id = db.insert(&name, Status::Incomplete, Some(priority))?;
            log::info!("added task #{} '{}' from the command line", id, name);
            writeln!(out, "Task '{}' added with priority {}", name, priority)?;
        }
        Commands::List { tab, priority } => {
            let tasks = match (tab.status(), priority) {
                (None, None) => db.list_all()?,
                (Some(status), None) => db.list_by_status(status)?,
                (status, priority) => db.list_by_status_and_priority(status, priority)?,
            };
            if tasks.is_empty() {
                writeln!(out, "No tasks.")?;
            }
            for task in &tasks {
                let mark = if task.status.is_complete() { "x" } else { " " };
                let priority = task.priority.map_or("-", |p| p.as_str());
                writeln!(out, "[{}] {} | Priority: {}", mark, task.name, priority)?;
            }
            writeln!(out, "{} of {} task(s) shown", tasks.len(), db.count()?)?;
        }
        Commands::Done { name } => set_status(db, &name, Status::Complete, out)?,
        Commands::Undo { name } => set_status(db, &name, Status::Incomplete, out)?,
        Commands::Rename { old_name, new_name } => {
            let rows = db.rename(&old_name, &new_name)?;
            if rows == 0 {
                writeln!(out, "Nothing renamed.")?;
            } else {
                writeln!(
                    out,
                    "Renamed '{}' to '{}' ({} task(s))",
                    old_name, new_name, rows
                )?;
            }
        }
        Commands::Delete { name, yes } => {
            let matching = db.list_all()?.iter().filter(|t| t.name == name).count();
            if matching == 0 {
                writeln!(out, "Task '{}' not found.", name)?;
            } else if yes || ask_user_confirmation(&name, matching, input, out)? {
                let rows = db.delete(&name)?;
                log::info!("deleted {} task(s) named '{}'", rows, name);
                writeln!(out, "Deleted {} task(s) named '{}'", rows, name)?;
            } else {
                writeln!(out, "Operation cancelled.")?;
            }
        }
        Commands::Config { action } => run_config(db, action, out)?,
        Commands::Completions { shell } => {
            use clap_complete::{generate, Shell};
            let shell_enum = match shell.to_lowercase().as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "elvish" => Shell::Elvish,
                "powershell" => Shell::PowerShell,
                _ => bail!("Unsupported shell: {}", shell),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "tasker", out);
        }
        Commands::Tui => bail!("the tui is not a one-shot command"),
    }
    Ok(())
}

/// Logs go to a file; the TUI owns the terminal. `log` records are picked up
/// by the subscriber's log bridge. A log file that cannot be opened disables
/// logging instead of aborting the command.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tasker.log");
    let log_path = file_path.unwrap_or(&default_path);

    let file_appender = match open_log_file(log_path) {
        Ok(appender) => appender,
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

fn open_log_file(log_path: &Path) -> Result<RollingFileAppender> {
    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid log file path {}", log_path.display()))?;
    let log_dir = match log_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(log_dir)
        .with_context(|| format!("cannot open log file {}", log_path.display()))
}

fn ask_user_confirmation<R: BufRead, W: Write>(
    name: &str,
    matching: usize,
    input: &mut R,
    out: &mut W,
) -> Result<bool> {
    write!(out, "Delete {} task(s) named '{}'? (y/n): ", matching, name)?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn set_status<W: Write>(db: &Database, name: &str, status: Status, out: &mut W) -> Result<()> {
    let rows = db.update_status(name, status)?;
    if rows == 0 {
        writeln!(out, "Task '{}' not found.", name)?;
    } else {
        writeln!(out, "Task '{}' marked {} ({} task(s))", name, status, rows)?;
    }
    Ok(())
}

fn run_config<W: Write>(db: &Database, action: ConfigAction, out: &mut W) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config::set(db, &key, &value)?;
            writeln!(out, "{} = {}", key, value)?;
        }
        ConfigAction::Get { key } => {
            let key = config::SettingKey::parse(&key)?;
            match db.get_setting(key.as_str())? {
                Some(value) => writeln!(out, "{}", value)?,
                None => writeln!(out, "{} is not set", key.as_str())?,
            }
        }
        ConfigAction::List => {
            let settings = db.list_settings()?;
            if settings.is_empty() {
                writeln!(out, "No settings stored.")?;
            }
            for (key, value) in settings {
                writeln!(out, "{} = {}", key, value)?;
            }
        }
        ConfigAction::Unset { key } => {
            let key = config::SettingKey::parse(&key)?;
            if db.delete_setting(key.as_str())? {
                writeln!(out, "{} removed", key.as_str())?;
            } else {
                writeln!(out, "{} is not set", key.as_str())?;
            }
        }
    }
    Ok(())
}
