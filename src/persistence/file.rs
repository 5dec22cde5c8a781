use super::{PersistenceError, PersistenceResult};
use crate::calendar::{CALENDAR_FIELD_NAMES, ServiceCalendar};
use crate::config::FeedConfig;
use crate::exception::ExceptionKind;
use crate::problems::{IgnoreProblems, ProblemSink};
use crate::schedule::ServiceSchedule;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

const CALENDAR_DATES_FIELD_NAMES: [&str; 3] = ["service_id", "date", "exception_type"];

#[derive(Serialize, Deserialize)]
struct ScheduleSnapshot {
    calendars: Vec<ServiceCalendar>,
}

impl ScheduleSnapshot {
    fn from_schedule(schedule: &ServiceSchedule) -> Self {
        Self {
            calendars: schedule.calendars().cloned().collect(),
        }
    }

    fn into_schedule(self) -> PersistenceResult<ServiceSchedule> {
        let mut schedule = ServiceSchedule::new();
        for calendar in self.calendars {
            let id = calendar.service_id().to_string();
            if !schedule.add_calendar(calendar, &mut IgnoreProblems) {
                return Err(PersistenceError::InvalidData(format!(
                    "snapshot contains service_id '{id}' more than once"
                )));
            }
        }
        Ok(schedule)
    }
}

pub fn save_schedule_to_json<P: AsRef<Path>>(schedule: &ServiceSchedule, path: P) -> PersistenceResult<()> {
    let snapshot = ScheduleSnapshot::from_schedule(schedule);
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ServiceSchedule> {
    let file = File::open(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    snapshot.into_schedule()
}

/// Position of each required column in the header row.
fn column_indices<const N: usize>(
    headers: &StringRecord,
    required: [&str; N],
    file: &str,
) -> PersistenceResult<[usize; N]> {
    let mut indices = [0usize; N];
    for (slot, name) in indices.iter_mut().zip(required) {
        *slot = headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| {
                PersistenceError::InvalidData(format!("{file} is missing required column '{name}'"))
            })?;
    }
    Ok(indices)
}

/// Parse `calendar.txt`. Values are kept as written; validation happens
/// later on the calendars.
pub fn read_calendar_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<ServiceCalendar>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let indices = column_indices(reader.headers()?, CALENDAR_FIELD_NAMES, "calendar.txt")?;

    let mut calendars = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: Vec<&str> = indices
            .iter()
            .map(|&idx| record.get(idx).unwrap_or_default())
            .collect();
        calendars.push(ServiceCalendar::from_fields(&fields)?);
    }
    debug!(path = %path.display(), rows = calendars.len(), "read calendar rows");
    Ok(calendars)
}

/// Apply `calendar_dates.txt` to `schedule`. Services not yet known get an
/// empty calendar. Rows with an unknown `exception_type` are reported and
/// skipped. Returns the number of exceptions applied.
pub fn read_calendar_dates_csv<P: AsRef<Path>>(
    path: P,
    schedule: &mut ServiceSchedule,
    problems: &mut dyn ProblemSink,
) -> PersistenceResult<usize> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let [id_idx, date_idx, type_idx] = column_indices(
        reader.headers()?,
        CALENDAR_DATES_FIELD_NAMES,
        "calendar_dates.txt",
    )?;

    let mut applied = 0;
    for record in reader.records() {
        let record = record?;
        let service_id = record.get(id_idx).unwrap_or_default();
        let date = record.get(date_idx).unwrap_or_default();
        let raw_type = record.get(type_idx).unwrap_or_default().trim();

        if service_id.trim().is_empty() {
            problems.missing_value("service_id");
            continue;
        }
        let kind = match raw_type.parse::<i64>().ok().and_then(ExceptionKind::from_code) {
            Some(kind) => kind,
            None if raw_type.is_empty() => {
                problems.missing_value("exception_type");
                continue;
            }
            None => {
                problems.invalid_value("exception_type", raw_type, None);
                continue;
            }
        };
        schedule
            .calendar_or_insert(service_id)
            .set_date_exception(date, kind.adds_service(), problems);
        applied += 1;
    }
    debug!(path = %path.display(), applied, "read calendar date exceptions");
    Ok(applied)
}

/// Write `calendar.txt`. Calendars without a full range are left out.
pub fn write_calendar_csv<P: AsRef<Path>>(schedule: &ServiceSchedule, path: P) -> PersistenceResult<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CALENDAR_FIELD_NAMES)?;
    let mut written = 0;
    for fields in schedule.calendars().filter_map(ServiceCalendar::calendar_fields_tuple) {
        writer.write_record(&fields)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

pub fn write_calendar_dates_csv<P: AsRef<Path>>(
    schedule: &ServiceSchedule,
    path: P,
) -> PersistenceResult<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CALENDAR_DATES_FIELD_NAMES)?;
    let mut written = 0;
    for calendar in schedule.calendars() {
        for (service_id, date, kind) in calendar.exception_field_tuples() {
            writer.write_record([service_id, date, kind])?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Load the calendar files of a feed directory. Either file may be absent,
/// but not both. Duplicate service ids in `calendar.txt` are reported and
/// the first row wins.
pub fn load_feed_dir<P: AsRef<Path>>(
    dir: P,
    config: &FeedConfig,
    problems: &mut dyn ProblemSink,
) -> PersistenceResult<ServiceSchedule> {
    let dir = dir.as_ref();
    let calendar_path = dir.join(&config.calendar_file);
    let dates_path = dir.join(&config.calendar_dates_file);
    if !calendar_path.is_file() && !dates_path.is_file() {
        return Err(PersistenceError::InvalidData(format!(
            "{} contains neither {} nor {}",
            dir.display(),
            config.calendar_file,
            config.calendar_dates_file
        )));
    }

    let mut schedule = ServiceSchedule::new();
    if calendar_path.is_file() {
        for calendar in read_calendar_csv(&calendar_path)? {
            schedule.add_calendar(calendar, problems);
        }
    } else {
        debug!(path = %calendar_path.display(), "no calendar file; using exceptions only");
    }
    let exceptions = if dates_path.is_file() {
        read_calendar_dates_csv(&dates_path, &mut schedule, problems)?
    } else {
        0
    };
    info!(
        dir = %dir.display(),
        services = schedule.len(),
        exceptions,
        "loaded feed calendars"
    );
    Ok(schedule)
}

pub fn save_feed_dir<P: AsRef<Path>>(
    schedule: &ServiceSchedule,
    dir: P,
    config: &FeedConfig,
) -> PersistenceResult<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let calendars = write_calendar_csv(schedule, dir.join(&config.calendar_file))?;
    let exceptions = write_calendar_dates_csv(schedule, dir.join(&config.calendar_dates_file))?;
    info!(dir = %dir.display(), calendars, exceptions, "saved feed calendars");
    Ok(())
}
