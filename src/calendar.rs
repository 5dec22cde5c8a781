use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::date::{DayOfWeek, format_date, is_valid_date, parse_date};
use crate::error::CalendarError;
use crate::exception::ExceptionKind;
use crate::problems::{ProblemSink, Severity};

/// Column order of a `calendar.txt` row.
pub const CALENDAR_FIELD_NAMES: [&str; 10] = [
    "service_id",
    "start_date",
    "end_date",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Dates on which one service operates: a weekly pattern bounded by a
/// start/end range, overridden by per-date exceptions.
///
/// This type never touches storage. Wrap it in
/// [`PersistedCalendar`](crate::persistence::PersistedCalendar) to have
/// mutations saved as they happen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCalendar {
    pub(crate) service_id: String,
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) weekly_pattern: [bool; 7],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) raw_weekly_tokens: Option<[String; 7]>,
    #[serde(default)]
    pub(crate) exceptions: BTreeMap<String, ExceptionKind>,
}

/// Pre-parsed `calendar.txt` row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub service_id: String,
    pub start_date: String,
    pub end_date: String,
    pub days: [String; 7],
}

macro_rules! day_accessors {
    ($($name:ident => $day:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> bool {
                self.runs_on(DayOfWeek::$day)
            }
        )*
    };
}

impl ServiceCalendar {
    /// Empty calendar: no range, no weekly service, no exceptions.
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            start_date: None,
            end_date: None,
            weekly_pattern: [false; 7],
            raw_weekly_tokens: None,
            exceptions: BTreeMap::new(),
        }
    }

    /// Hydrate from a pre-parsed row.
    ///
    /// A weekday runs only when its token is exactly `"1"`; a padded `" 1"`
    /// does not. The trimmed tokens are kept for validation, which accepts
    /// the padded form.
    pub fn from_record(record: CalendarRecord) -> Self {
        let weekly_pattern = std::array::from_fn(|i| record.days[i] == "1");
        let tokens = record.days.map(|token| token.trim().to_string());
        Self {
            service_id: record.service_id,
            start_date: Some(record.start_date),
            end_date: Some(record.end_date),
            weekly_pattern,
            raw_weekly_tokens: Some(tokens),
            exceptions: BTreeMap::new(),
        }
    }

    /// Hydrate from fields in `calendar.txt` column order.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, CalendarError> {
        if fields.len() != CALENDAR_FIELD_NAMES.len() {
            return Err(CalendarError::FieldCount {
                expected: CALENDAR_FIELD_NAMES.len(),
                found: fields.len(),
            });
        }
        let field = |idx: usize| fields[idx].as_ref().to_string();
        Ok(Self::from_record(CalendarRecord {
            service_id: field(0),
            start_date: field(1),
            end_date: field(2),
            days: std::array::from_fn(|i| field(3 + i)),
        }))
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }

    pub fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }

    pub fn weekly_pattern(&self) -> [bool; 7] {
        self.weekly_pattern
    }

    pub fn raw_weekly_tokens(&self) -> Option<&[String; 7]> {
        self.raw_weekly_tokens.as_ref()
    }

    pub fn exceptions(&self) -> &BTreeMap<String, ExceptionKind> {
        &self.exceptions
    }

    pub fn exception_on(&self, date: &str) -> Option<ExceptionKind> {
        self.exceptions.get(date).copied()
    }

    pub fn runs_on(&self, day: DayOfWeek) -> bool {
        self.weekly_pattern[day.index()]
    }

    day_accessors! {
        monday => Monday,
        tuesday => Tuesday,
        wednesday => Wednesday,
        thursday => Thursday,
        friday => Friday,
        saturday => Saturday,
        sunday => Sunday,
    }

    pub fn set_service_id(&mut self, service_id: impl Into<String>) {
        self.service_id = service_id.into();
    }

    pub fn set_start_date(&mut self, date: Option<String>) {
        self.start_date = date;
    }

    pub fn set_end_date(&mut self, date: Option<String>) {
        self.end_date = date;
    }

    pub fn set_range(&mut self, start: impl Into<String>, end: impl Into<String>) {
        self.set_start_date(Some(start.into()));
        self.set_end_date(Some(end.into()));
    }

    pub fn set_day_of_week(&mut self, day: DayOfWeek, active: bool) {
        self.weekly_pattern[day.index()] = active;
    }

    /// Index-based variant of [`set_day_of_week`](Self::set_day_of_week)
    /// for callers holding a raw column index (Monday = 0).
    pub fn set_day_of_week_index(&mut self, index: usize, active: bool) -> Result<(), CalendarError> {
        let day = DayOfWeek::from_index(index)?;
        self.set_day_of_week(day, active);
        Ok(())
    }

    pub fn set_weekday_service(&mut self, active: bool) {
        for day in DayOfWeek::WEEKDAYS {
            self.set_day_of_week(day, active);
        }
    }

    pub fn set_weekend_service(&mut self, active: bool) {
        for day in DayOfWeek::WEEKEND {
            self.set_day_of_week(day, active);
        }
    }

    /// Record an override for `date`. A second override for the same date is
    /// reported as a duplicate and replaces the first.
    pub fn set_date_exception(
        &mut self,
        date: impl Into<String>,
        adds_service: bool,
        problems: &mut dyn ProblemSink,
    ) {
        let date = date.into();
        if self.exceptions.contains_key(&date) {
            problems.duplicate_id(
                &["service_id", "date"],
                &[&self.service_id, &date],
                Severity::Warning,
            );
        }
        self.exceptions
            .insert(date, ExceptionKind::from_has_service(adds_service));
    }

    /// Drop the override for `date`, if any. Returns whether one existed.
    pub fn clear_date_exception(&mut self, date: &str) -> bool {
        self.exceptions.remove(date).is_some()
    }

    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }

    /// Whether service runs on `date` (`YYYYMMDD`).
    ///
    /// An exception always wins. Otherwise the weekly pattern applies inside
    /// `[start_date, end_date]`, and nothing runs outside it. `weekday` may
    /// be supplied when the caller already knows it, to skip parsing.
    pub fn is_active_on(&self, date: &str, weekday: Option<DayOfWeek>) -> bool {
        if let Some(kind) = self.exceptions.get(date) {
            return kind.adds_service();
        }
        match self.usable_bounds() {
            (Some(start), Some(end)) if start <= date && date <= end => {
                let day = match weekday {
                    Some(day) => day,
                    None => match parse_date(date) {
                        Ok(parsed) => DayOfWeek::of(parsed),
                        Err(_) => return false,
                    },
                };
                self.runs_on(day)
            }
            _ => false,
        }
    }

    /// Smallest window holding every date this calendar could report active.
    ///
    /// `[start_date, end_date]` widened to take in dates with an added
    /// exception. Removed exceptions never narrow it.
    pub fn effective_date_range(&self) -> (Option<String>, Option<String>) {
        let added = self
            .exceptions
            .iter()
            .filter(|(_, kind)| kind.adds_service())
            .map(|(date, _)| date.as_str());

        let (start, end) = self.usable_bounds();
        let start = start.into_iter().chain(added.clone()).min();
        let end = end.into_iter().chain(added).max();
        (start.map(str::to_string), end.map(str::to_string))
    }

    /// Range bounds that parse as dates. An empty or malformed bound is
    /// treated as unset until validation clears it.
    fn usable_bounds(&self) -> (Option<&str>, Option<&str>) {
        (usable_bound(&self.start_date), usable_bound(&self.end_date))
    }

    /// Every active date in ascending order.
    pub fn active_dates(&self) -> Vec<String> {
        let (start, end) = self.effective_date_range();
        self.active_dates_between(start.as_deref(), end.as_deref())
    }

    pub fn active_naive_dates(&self) -> Vec<NaiveDate> {
        let (start, end) = self.effective_date_range();
        self.walk_active(start.as_deref(), end.as_deref())
            .into_iter()
            .map(|(date, _)| date)
            .collect()
    }

    /// Active dates inside an externally computed window, e.g. one from a
    /// store's range query.
    pub fn active_dates_between(&self, start: Option<&str>, end: Option<&str>) -> Vec<String> {
        self.walk_active(start, end)
            .into_iter()
            .map(|(_, formatted)| formatted)
            .collect()
    }

    fn walk_active(&self, start: Option<&str>, end: Option<&str>) -> Vec<(NaiveDate, String)> {
        let (Some(start), Some(end)) = (start, end) else {
            return Vec::new();
        };
        let (Ok(mut current), Ok(last)) = (parse_date(start), parse_date(end)) else {
            return Vec::new();
        };

        let mut dates = Vec::new();
        while current <= last {
            let formatted = format_date(current);
            if self.is_active_on(&formatted, Some(DayOfWeek::of(current))) {
                dates.push((current, formatted));
            }
            match current.checked_add_days(Days::new(1)) {
                Some(next) => current = next,
                None => break,
            }
        }
        dates
    }

    /// Field values for a `calendar.txt` row, or `None` without a full range.
    pub fn calendar_fields_tuple(&self) -> Option<[String; 10]> {
        let start = self.start_date.as_deref().filter(|s| !s.is_empty())?;
        let end = self.end_date.as_deref().filter(|s| !s.is_empty())?;
        let mut fields: [String; 10] = Default::default();
        fields[0] = self.service_id.clone();
        fields[1] = start.to_string();
        fields[2] = end.to_string();
        for day in DayOfWeek::ALL {
            fields[3 + day.index()] = if self.runs_on(day) { "1" } else { "0" }.to_string();
        }
        Some(fields)
    }

    /// `(service_id, date, exception_type)` rows for `calendar_dates.txt`,
    /// sorted.
    pub fn exception_field_tuples(&self) -> Vec<(String, String, String)> {
        let mut rows: Vec<_> = self
            .exceptions
            .iter()
            .map(|(date, kind)| {
                (
                    self.service_id.clone(),
                    date.clone(),
                    kind.as_field().to_string(),
                )
            })
            .collect();
        rows.sort();
        rows
    }
}

fn usable_bound(bound: &Option<String>) -> Option<&str> {
    bound.as_deref().filter(|date| is_valid_date(date))
}

impl PartialEq for ServiceCalendar {
    fn eq(&self, other: &Self) -> bool {
        self.calendar_fields_tuple() == other.calendar_fields_tuple()
            && self.exception_field_tuples() == other.exception_field_tuples()
    }
}

impl Eq for ServiceCalendar {}
