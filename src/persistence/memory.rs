//! In-process [`CalendarStore`] with an inspectable operation log.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::{
    CalendarField, CalendarRow, CalendarStore, FieldValue, PersistenceError, PersistenceResult,
    RowId,
};
use crate::exception::ExceptionKind;

/// One call that reached the store, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Insert(RowId),
    UpdateField(RowId, CalendarField),
    UpsertException(RowId, String, ExceptionKind),
    DeleteExceptions(RowId, Option<String>),
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<RowId, CalendarRow>,
    exceptions: BTreeMap<(RowId, String), (String, ExceptionKind)>,
    operations: Vec<StoreOperation>,
    next_id: i64,
}

impl MemoryState {
    fn row_mut(&mut self, row_id: RowId) -> PersistenceResult<&mut CalendarRow> {
        self.rows
            .get_mut(&row_id)
            .ok_or(PersistenceError::NotFound(row_id))
    }

    fn exceptions_of(&self, row_id: RowId) -> impl Iterator<Item = (&str, ExceptionKind)> {
        self.exceptions
            .range((row_id, String::new())..)
            .take_while(move |((id, _), _)| *id == row_id)
            .map(|((_, date), (_, kind))| (date.as_str(), *kind))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCalendarStore {
    state: Mutex<MemoryState>,
}

impl MemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, row_id: RowId) -> Option<CalendarRow> {
        self.state.lock().rows.get(&row_id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().rows.len()
    }

    /// Stored `(date, kind)` pairs for `row_id`, ordered by date.
    pub fn exceptions(&self, row_id: RowId) -> Vec<(String, ExceptionKind)> {
        let state = self.state.lock();
        state
            .exceptions_of(row_id)
            .map(|(date, kind)| (date.to_string(), kind))
            .collect()
    }

    pub fn operations(&self) -> Vec<StoreOperation> {
        self.state.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.state.lock().operations.clear();
    }
}

impl CalendarStore for MemoryCalendarStore {
    fn insert(&self, row: &CalendarRow) -> PersistenceResult<RowId> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let row_id = RowId(state.next_id);
        state.rows.insert(row_id, row.clone());
        state.operations.push(StoreOperation::Insert(row_id));
        Ok(row_id)
    }

    fn update_field(&self, row_id: RowId, field: CalendarField, value: FieldValue) -> PersistenceResult<()> {
        let mut state = self.state.lock();
        state.row_mut(row_id)?.apply(field, value)?;
        state.operations.push(StoreOperation::UpdateField(row_id, field));
        Ok(())
    }

    fn upsert_exception(
        &self,
        row_id: RowId,
        service_id: &str,
        date: &str,
        kind: ExceptionKind,
    ) -> PersistenceResult<()> {
        let mut state = self.state.lock();
        state.row_mut(row_id)?;
        state
            .exceptions
            .insert((row_id, date.to_string()), (service_id.to_string(), kind));
        state
            .operations
            .push(StoreOperation::UpsertException(row_id, date.to_string(), kind));
        Ok(())
    }

    fn delete_exceptions(&self, row_id: RowId, date: Option<&str>) -> PersistenceResult<usize> {
        let mut state = self.state.lock();
        let before = state.exceptions.len();
        state
            .exceptions
            .retain(|(id, stored), _| *id != row_id || date.is_some_and(|d| d != stored.as_str()));
        let removed = before - state.exceptions.len();
        state
            .operations
            .push(StoreOperation::DeleteExceptions(row_id, date.map(str::to_string)));
        Ok(removed)
    }

    fn count_exceptions(&self, row_id: RowId) -> PersistenceResult<usize> {
        Ok(self.state.lock().exceptions_of(row_id).count())
    }

    fn range_query(&self, row_id: RowId) -> PersistenceResult<(Option<String>, Option<String>)> {
        let state = self.state.lock();
        let row = state
            .rows
            .get(&row_id)
            .ok_or(PersistenceError::NotFound(row_id))?;
        let added: Vec<&str> = state
            .exceptions_of(row_id)
            .filter(|(_, kind)| kind.adds_service())
            .map(|(date, _)| date)
            .collect();

        let low = row
            .start_date
            .as_deref()
            .into_iter()
            .chain(added.iter().copied())
            .min();
        let high = row
            .end_date
            .as_deref()
            .into_iter()
            .chain(added.iter().copied())
            .max();
        Ok((low.map(str::to_string), high.map(str::to_string)))
    }
}
