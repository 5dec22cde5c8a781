//! Save-on-mutation wrapper around [`ServiceCalendar`].

use tracing::debug;

use super::{CalendarField, CalendarRow, CalendarStore, FieldValue, PersistenceResult, RowId};
use crate::calendar::ServiceCalendar;
use crate::date::DayOfWeek;
use crate::exception::ExceptionKind;
use crate::problems::ProblemSink;

/// A calendar bound to a [`CalendarStore`].
///
/// Every mutation is pushed to the store as it happens. The first mutation of
/// an unsaved calendar inserts its row; later ones update single columns.
/// Weekday changes are only pushed once a row exists.
pub struct PersistedCalendar<S: CalendarStore> {
    calendar: ServiceCalendar,
    store: S,
    row_id: Option<RowId>,
}

impl<S: CalendarStore> PersistedCalendar<S> {
    /// Wrap a calendar that has not been stored yet.
    pub fn new(calendar: ServiceCalendar, store: S) -> Self {
        Self {
            calendar,
            store,
            row_id: None,
        }
    }

    /// Wrap a calendar whose row already exists under `row_id`.
    pub fn attach(calendar: ServiceCalendar, store: S, row_id: RowId) -> Self {
        Self {
            calendar,
            store,
            row_id: Some(row_id),
        }
    }

    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn row_id(&self) -> Option<RowId> {
        self.row_id
    }

    pub fn into_inner(self) -> ServiceCalendar {
        self.calendar
    }

    /// Insert the row if it does not exist yet, then write every exception
    /// already held in memory.
    pub fn save(&mut self) -> PersistenceResult<RowId> {
        if let Some(row_id) = self.row_id {
            return Ok(row_id);
        }
        let row_id = self.store.insert(&CalendarRow::from(&self.calendar))?;
        debug!(service_id = self.calendar.service_id(), %row_id, "inserted calendar row");
        self.row_id = Some(row_id);
        for (date, kind) in self.calendar.exceptions() {
            self.store
                .upsert_exception(row_id, self.calendar.service_id(), date, *kind)?;
        }
        Ok(row_id)
    }

    /// Make the stored row match memory: every column is rewritten and the
    /// stored exceptions are replaced. Inserts when unsaved.
    pub fn sync(&mut self) -> PersistenceResult<RowId> {
        let Some(row_id) = self.row_id else {
            return self.save();
        };
        let fields = [
            CalendarField::ServiceId,
            CalendarField::StartDate,
            CalendarField::EndDate,
        ]
        .into_iter()
        .chain(DayOfWeek::ALL.map(CalendarField::Day));
        for field in fields {
            self.store.update_field(row_id, field, self.field_value(field))?;
        }
        let removed = self.store.delete_exceptions(row_id, None)?;
        for (date, kind) in self.calendar.exceptions() {
            self.store
                .upsert_exception(row_id, self.calendar.service_id(), date, *kind)?;
        }
        debug!(%row_id, removed, "synced calendar row");
        Ok(row_id)
    }

    fn field_value(&self, field: CalendarField) -> FieldValue {
        match field {
            CalendarField::ServiceId => FieldValue::Text(Some(self.calendar.service_id().to_string())),
            CalendarField::StartDate => FieldValue::Text(self.calendar.start_date().map(str::to_string)),
            CalendarField::EndDate => FieldValue::Text(self.calendar.end_date().map(str::to_string)),
            CalendarField::Day(day) => FieldValue::Flag(self.calendar.runs_on(day)),
        }
    }

    /// Insert the row when unsaved, otherwise update the one column.
    fn persist_field(&mut self, field: CalendarField) -> PersistenceResult<()> {
        match self.row_id {
            None => {
                self.save()?;
            }
            Some(row_id) => {
                let value = self.field_value(field);
                debug!(%row_id, column = field.column_name(), ?value, "updating calendar field");
                self.store.update_field(row_id, field, value)?;
            }
        }
        Ok(())
    }

    pub fn set_service_id(&mut self, service_id: impl Into<String>) -> PersistenceResult<()> {
        self.calendar.set_service_id(service_id);
        self.persist_field(CalendarField::ServiceId)
    }

    pub fn set_start_date(&mut self, date: Option<String>) -> PersistenceResult<()> {
        self.calendar.set_start_date(date);
        self.persist_field(CalendarField::StartDate)
    }

    pub fn set_end_date(&mut self, date: Option<String>) -> PersistenceResult<()> {
        self.calendar.set_end_date(date);
        self.persist_field(CalendarField::EndDate)
    }

    /// Two separate store operations: one for each bound.
    pub fn set_range(&mut self, start: impl Into<String>, end: impl Into<String>) -> PersistenceResult<()> {
        self.set_start_date(Some(start.into()))?;
        self.set_end_date(Some(end.into()))
    }

    pub fn set_day_of_week(&mut self, day: DayOfWeek, active: bool) -> PersistenceResult<()> {
        if let Some(row_id) = self.row_id {
            self.store
                .update_field(row_id, CalendarField::Day(day), FieldValue::Flag(active))?;
        }
        self.calendar.set_day_of_week(day, active);
        Ok(())
    }

    pub fn set_day_of_week_index(&mut self, index: usize, active: bool) -> PersistenceResult<()> {
        let day = DayOfWeek::from_index(index)?;
        self.set_day_of_week(day, active)
    }

    pub fn set_weekday_service(&mut self, active: bool) -> PersistenceResult<()> {
        for day in DayOfWeek::WEEKDAYS {
            self.set_day_of_week(day, active)?;
        }
        Ok(())
    }

    pub fn set_weekend_service(&mut self, active: bool) -> PersistenceResult<()> {
        for day in DayOfWeek::WEEKEND {
            self.set_day_of_week(day, active)?;
        }
        Ok(())
    }

    /// Store the override before recording it in memory; the exception row
    /// is keyed by this calendar's row id, so the row is created first.
    pub fn set_date_exception(
        &mut self,
        date: impl Into<String>,
        adds_service: bool,
        problems: &mut dyn ProblemSink,
    ) -> PersistenceResult<()> {
        let date = date.into();
        let row_id = self.save()?;
        let kind = ExceptionKind::from_has_service(adds_service);
        self.store
            .upsert_exception(row_id, self.calendar.service_id(), &date, kind)?;
        debug!(%row_id, %date, %kind, "stored date exception");
        self.calendar.set_date_exception(date, adds_service, problems);
        Ok(())
    }

    pub fn clear_date_exception(&mut self, date: &str) -> PersistenceResult<bool> {
        if let Some(row_id) = self.row_id {
            let removed = self.store.delete_exceptions(row_id, Some(date))?;
            debug!(%row_id, date, removed, "cleared date exception");
        }
        Ok(self.calendar.clear_date_exception(date))
    }

    /// Whether any exception has been stored for this calendar's row.
    pub fn has_exceptions(&self) -> PersistenceResult<bool> {
        match self.row_id {
            None => Ok(false),
            Some(row_id) => Ok(self.store.count_exceptions(row_id)? > 0),
        }
    }

    pub fn is_active_on(&self, date: &str, weekday: Option<DayOfWeek>) -> bool {
        self.calendar.is_active_on(date, weekday)
    }

    /// The store's range query once a row exists, the in-memory range before.
    pub fn effective_date_range(&self) -> PersistenceResult<(Option<String>, Option<String>)> {
        match self.row_id {
            None => Ok(self.calendar.effective_date_range()),
            Some(row_id) => self.store.range_query(row_id),
        }
    }

    pub fn active_dates(&self) -> PersistenceResult<Vec<String>> {
        let (start, end) = self.effective_date_range()?;
        Ok(self
            .calendar
            .active_dates_between(start.as_deref(), end.as_deref()))
    }

    /// Validate the calendar and push any bound that validation cleared.
    pub fn validate(&mut self, problems: &mut dyn ProblemSink) -> PersistenceResult<()> {
        let start_before = self.calendar.start_date().map(str::to_string);
        let end_before = self.calendar.end_date().map(str::to_string);
        self.calendar.validate(problems);

        if self.row_id.is_none() {
            return Ok(());
        }
        if self.calendar.start_date() != start_before.as_deref() {
            self.persist_field(CalendarField::StartDate)?;
        }
        if self.calendar.end_date() != end_before.as_deref() {
            self.persist_field(CalendarField::EndDate)?;
        }
        Ok(())
    }
}
