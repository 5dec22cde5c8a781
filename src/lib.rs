pub mod calendar;
mod calendar_validation;
pub mod config;
pub mod date;
pub mod error;
pub mod exception;
#[cfg(feature = "cli")]
pub mod logging;
pub mod persistence;
pub mod problems;
pub mod schedule;

pub use calendar::{CALENDAR_FIELD_NAMES, CalendarRecord, ServiceCalendar};
pub use config::FeedConfig;
pub use date::{DayOfWeek, format_date, is_valid_date, parse_date};
pub use error::CalendarError;
pub use exception::ExceptionKind;
pub use persistence::{
    CalendarField, CalendarRow, CalendarStore, FieldValue, MemoryCalendarStore, PersistedCalendar,
    PersistenceError, PersistenceResult, RowId, SqliteCalendarStore, StoreOperation,
    load_feed_dir, load_schedule_from_json, read_calendar_csv, read_calendar_dates_csv,
    save_feed_dir, save_schedule_to_json, write_calendar_csv, write_calendar_dates_csv,
};
pub use problems::{IgnoreProblems, Problem, ProblemCollector, ProblemSink, Severity};
pub use schedule::ServiceSchedule;
