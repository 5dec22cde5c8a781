use clap::{ArgAction, Parser, Subcommand};
use service_calendar::{
    FeedConfig, PersistedCalendar, PersistenceError, ProblemCollector, ServiceSchedule,
    SqliteCalendarStore, is_valid_date, load_feed_dir, logging, save_feed_dir,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Inspect and validate transit service calendars.
#[derive(Parser)]
#[command(name = "cli", version, about = "Inspect and validate transit service calendars")]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// JSON feed configuration file.
    #[arg(long, global = true, env = "SERVICE_CALENDAR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the calendars of a feed directory and print every problem.
    Validate {
        dir: PathBuf,
        /// Fail on warnings as well as errors.
        #[arg(long)]
        strict: bool,
    },
    /// List every date a service runs on.
    Active { dir: PathBuf, service_id: String },
    /// Report whether a service runs on a date (YYYYMMDD).
    Check {
        dir: PathBuf,
        service_id: String,
        date: String,
    },
    /// List the services running on a date (YYYYMMDD).
    Services { dir: PathBuf, date: String },
    /// Store the validated calendars in a SQLite database.
    Import {
        dir: PathBuf,
        #[arg(long, env = "SERVICE_CALENDAR_DB")]
        db: PathBuf,
    },
    /// Write the validated calendars to another feed directory.
    Export { dir: PathBuf, out: PathBuf },
}

fn load_config(path: Option<&Path>) -> Result<FeedConfig, PersistenceError> {
    match path {
        Some(path) => FeedConfig::from_json_file(path),
        None => Ok(FeedConfig::default()),
    }
}

/// Load and validate a feed, returning the calendars and what was found.
fn load_validated(
    dir: &Path,
    config: &FeedConfig,
) -> Result<(ServiceSchedule, ProblemCollector), PersistenceError> {
    let mut problems = ProblemCollector::new();
    let mut schedule = load_feed_dir(dir, config, &mut problems)?;
    schedule.validate(&mut problems);
    Ok((schedule, problems))
}

fn require_date(date: &str) -> Result<(), PersistenceError> {
    if is_valid_date(date) {
        Ok(())
    } else {
        Err(PersistenceError::InvalidData(format!(
            "'{date}' is not a YYYYMMDD date"
        )))
    }
}

fn run(cli: Cli) -> Result<ExitCode, PersistenceError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Validate { dir, strict } => {
            let (_, problems) = load_validated(&dir, &config)?;
            for problem in problems.problems() {
                println!("{}: {}", problem.severity(), problem);
            }
            let errors = problems.errors().count();
            let warnings = problems.warnings().count();
            println!("{errors} error(s), {warnings} warning(s)");
            let failed = errors > 0 || ((strict || config.strict) && warnings > 0);
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Active { dir, service_id } => {
            let (schedule, _) = load_validated(&dir, &config)?;
            let calendar = schedule.calendar(&service_id).ok_or_else(|| {
                PersistenceError::InvalidData(format!("unknown service_id '{service_id}'"))
            })?;
            for date in calendar.active_dates() {
                println!("{date}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            dir,
            service_id,
            date,
        } => {
            require_date(&date)?;
            let (schedule, _) = load_validated(&dir, &config)?;
            let calendar = schedule.calendar(&service_id).ok_or_else(|| {
                PersistenceError::InvalidData(format!("unknown service_id '{service_id}'"))
            })?;
            if calendar.is_active_on(&date, None) {
                println!("{service_id} is active on {date}");
            } else {
                println!("{service_id} is inactive on {date}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Services { dir, date } => {
            require_date(&date)?;
            let (schedule, _) = load_validated(&dir, &config)?;
            for service_id in schedule.services_active_on(&date) {
                println!("{service_id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Import { dir, db } => {
            let (schedule, _) = load_validated(&dir, &config)?;
            let store = SqliteCalendarStore::new(&db)?;
            let mut updated = 0;
            for calendar in schedule.calendars() {
                // Re-importing a service overwrites its row instead of adding one
                let mut persisted = match store.row_id_for(calendar.service_id())? {
                    Some(row_id) => {
                        updated += 1;
                        PersistedCalendar::attach(calendar.clone(), &store, row_id)
                    }
                    None => PersistedCalendar::new(calendar.clone(), &store),
                };
                persisted.sync()?;
            }
            info!(db = %db.display(), services = schedule.len(), updated, "imported calendars");
            println!(
                "Imported {} calendar(s) into {} ({updated} updated)",
                schedule.len(),
                db.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Export { dir, out } => {
            let (schedule, _) = load_validated(&dir, &config)?;
            save_feed_dir(&schedule, &out, &config)?;
            println!("Exported {} calendar(s) to {}", schedule.len(), out.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
