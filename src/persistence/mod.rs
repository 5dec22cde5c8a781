use crate::calendar::ServiceCalendar;
use crate::date::DayOfWeek;
use crate::error::CalendarError;
use crate::exception::ExceptionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no calendar stored under row {0}")]
    NotFound(RowId),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Stable identifier a store assigns to a calendar row on first save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single updatable column of the calendar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarField {
    ServiceId,
    StartDate,
    EndDate,
    Day(DayOfWeek),
}

impl CalendarField {
    pub fn column_name(self) -> &'static str {
        match self {
            CalendarField::ServiceId => "service_id",
            CalendarField::StartDate => "start_date",
            CalendarField::EndDate => "end_date",
            CalendarField::Day(day) => day.column_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(Option<String>),
    Flag(bool),
}

/// Calendar row as a store keeps it; weekdays as flags, no raw tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRow {
    pub service_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days: [bool; 7],
}

impl CalendarRow {
    pub fn apply(&mut self, field: CalendarField, value: FieldValue) -> PersistenceResult<()> {
        match (field, value) {
            (CalendarField::ServiceId, FieldValue::Text(Some(id))) => self.service_id = id,
            (CalendarField::StartDate, FieldValue::Text(date)) => self.start_date = date,
            (CalendarField::EndDate, FieldValue::Text(date)) => self.end_date = date,
            (CalendarField::Day(day), FieldValue::Flag(active)) => self.days[day.index()] = active,
            (field, value) => {
                return Err(PersistenceError::InvalidData(format!(
                    "value {value:?} does not fit column {}",
                    field.column_name()
                )));
            }
        }
        Ok(())
    }

    /// Rebuild a calendar, without exceptions.
    pub fn into_calendar(self) -> ServiceCalendar {
        let mut calendar = ServiceCalendar::new(self.service_id);
        calendar.set_start_date(self.start_date);
        calendar.set_end_date(self.end_date);
        for day in DayOfWeek::ALL {
            calendar.set_day_of_week(day, self.days[day.index()]);
        }
        calendar
    }
}

impl From<&ServiceCalendar> for CalendarRow {
    fn from(calendar: &ServiceCalendar) -> Self {
        Self {
            service_id: calendar.service_id().to_string(),
            start_date: calendar.start_date().map(str::to_string),
            end_date: calendar.end_date().map(str::to_string),
            days: calendar.weekly_pattern(),
        }
    }
}

/// Durable storage for calendars and their per-date exceptions, keyed by
/// the [`RowId`] returned from [`insert`](Self::insert).
pub trait CalendarStore {
    fn insert(&self, row: &CalendarRow) -> PersistenceResult<RowId>;
    fn update_field(&self, row_id: RowId, field: CalendarField, value: FieldValue) -> PersistenceResult<()>;
    /// One exception per `(row_id, date)`; a second write replaces the first.
    fn upsert_exception(
        &self,
        row_id: RowId,
        service_id: &str,
        date: &str,
        kind: ExceptionKind,
    ) -> PersistenceResult<()>;
    /// Delete exceptions of `row_id`, only those on `date` when given.
    /// Returns the number removed; zero matches is not an error.
    fn delete_exceptions(&self, row_id: RowId, date: Option<&str>) -> PersistenceResult<usize>;
    fn count_exceptions(&self, row_id: RowId) -> PersistenceResult<usize>;
    /// Earliest and latest date over the row's own range and every added
    /// exception date.
    fn range_query(&self, row_id: RowId) -> PersistenceResult<(Option<String>, Option<String>)>;
}

impl<S: CalendarStore + ?Sized> CalendarStore for &S {
    fn insert(&self, row: &CalendarRow) -> PersistenceResult<RowId> {
        (**self).insert(row)
    }

    fn update_field(&self, row_id: RowId, field: CalendarField, value: FieldValue) -> PersistenceResult<()> {
        (**self).update_field(row_id, field, value)
    }

    fn upsert_exception(
        &self,
        row_id: RowId,
        service_id: &str,
        date: &str,
        kind: ExceptionKind,
    ) -> PersistenceResult<()> {
        (**self).upsert_exception(row_id, service_id, date, kind)
    }

    fn delete_exceptions(&self, row_id: RowId, date: Option<&str>) -> PersistenceResult<usize> {
        (**self).delete_exceptions(row_id, date)
    }

    fn count_exceptions(&self, row_id: RowId) -> PersistenceResult<usize> {
        (**self).count_exceptions(row_id)
    }

    fn range_query(&self, row_id: RowId) -> PersistenceResult<(Option<String>, Option<String>)> {
        (**self).range_query(row_id)
    }
}

impl<S: CalendarStore + ?Sized> CalendarStore for Arc<S> {
    fn insert(&self, row: &CalendarRow) -> PersistenceResult<RowId> {
        (**self).insert(row)
    }

    fn update_field(&self, row_id: RowId, field: CalendarField, value: FieldValue) -> PersistenceResult<()> {
        (**self).update_field(row_id, field, value)
    }

    fn upsert_exception(
        &self,
        row_id: RowId,
        service_id: &str,
        date: &str,
        kind: ExceptionKind,
    ) -> PersistenceResult<()> {
        (**self).upsert_exception(row_id, service_id, date, kind)
    }

    fn delete_exceptions(&self, row_id: RowId, date: Option<&str>) -> PersistenceResult<usize> {
        (**self).delete_exceptions(row_id, date)
    }

    fn count_exceptions(&self, row_id: RowId) -> PersistenceResult<usize> {
        (**self).count_exceptions(row_id)
    }

    fn range_query(&self, row_id: RowId) -> PersistenceResult<(Option<String>, Option<String>)> {
        (**self).range_query(row_id)
    }
}

pub mod file;
pub mod memory;
pub mod sqlite;
pub mod tracked;

pub use file::{
    load_feed_dir, load_schedule_from_json, read_calendar_csv, read_calendar_dates_csv,
    save_feed_dir, save_schedule_to_json, write_calendar_csv, write_calendar_dates_csv,
};
pub use memory::{MemoryCalendarStore, StoreOperation};
pub use sqlite::SqliteCalendarStore;
pub use tracked::PersistedCalendar;
