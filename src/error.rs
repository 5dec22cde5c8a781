//! Errors raised by calendar operations.
//!
//! Malformed feed data never produces one of these; it is reported through a
//! [`ProblemSink`](crate::problems::ProblemSink) instead. These errors cover
//! contract violations by the caller and ingestion of rows with the wrong
//! shape.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// Weekday index outside `0..=6` (Monday = 0).
    #[error("invalid weekday index {0} (must be 0..=6)")]
    InvalidWeekdayIndex(usize),

    /// A calendar row did not carry the expected number of fields.
    #[error("calendar row has {found} fields, expected {expected}")]
    FieldCount { expected: usize, found: usize },

    /// A string could not be parsed as a `YYYYMMDD` calendar date.
    #[error("invalid date '{0}' (expected YYYYMMDD)")]
    InvalidDate(String),
}
