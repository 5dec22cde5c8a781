use super::{
    CalendarField, CalendarRow, CalendarStore, FieldValue, PersistenceError, PersistenceResult,
    RowId,
};
use crate::calendar::ServiceCalendar;
use crate::exception::ExceptionKind;
use crate::problems::IgnoreProblems;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

/// [`CalendarStore`] backed by a SQLite database with `calendar` and
/// `calendar_dates` tables.
pub struct SqliteCalendarStore {
    connection: Mutex<Connection>,
}

impl SqliteCalendarStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS calendar (
                id INTEGER PRIMARY KEY,
                service_id CHAR(50) NOT NULL,
                start_date CHAR(8),
                end_date CHAR(8),
                monday INTEGER NOT NULL DEFAULT 0,
                tuesday INTEGER NOT NULL DEFAULT 0,
                wednesday INTEGER NOT NULL DEFAULT 0,
                thursday INTEGER NOT NULL DEFAULT 0,
                friday INTEGER NOT NULL DEFAULT 0,
                saturday INTEGER NOT NULL DEFAULT 0,
                sunday INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS calendar_dates (
                service_period_rowid INTEGER NOT NULL REFERENCES calendar(id),
                service_id CHAR(50) NOT NULL,
                date CHAR(8) NOT NULL,
                exception_type INTEGER NOT NULL,
                UNIQUE (service_period_rowid, date)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Row id of the first calendar stored under `service_id`.
    pub fn row_id_for(&self, service_id: &str) -> PersistenceResult<Option<RowId>> {
        let conn = self.connection.lock();
        let id: Option<i64> = conn
            .query_row(
                "SELECT rowid FROM calendar WHERE service_id = ?1 ORDER BY rowid LIMIT 1",
                params![service_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(RowId))
    }

    pub fn load_row(&self, row_id: RowId) -> PersistenceResult<CalendarRow> {
        let conn = self.connection.lock();
        conn.query_row(
            "SELECT service_id, start_date, end_date, monday, tuesday, wednesday, thursday,
                    friday, saturday, sunday
               FROM calendar WHERE rowid = ?1",
            params![row_id.0],
            |row| {
                let mut days = [false; 7];
                for (idx, day) in days.iter_mut().enumerate() {
                    *day = row.get::<_, i64>(3 + idx)? != 0;
                }
                Ok(CalendarRow {
                    service_id: row.get(0)?,
                    start_date: row.get(1)?,
                    end_date: row.get(2)?,
                    days,
                })
            },
        )
        .optional()?
        .ok_or(PersistenceError::NotFound(row_id))
    }

    /// Rebuild the calendar stored under `row_id`, exceptions included.
    pub fn load_calendar(&self, row_id: RowId) -> PersistenceResult<ServiceCalendar> {
        let mut calendar = self.load_row(row_id)?.into_calendar();

        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT date, exception_type FROM calendar_dates
              WHERE service_period_rowid = ?1 ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(params![row_id.0], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (date, code) = row?;
            let kind = ExceptionKind::from_code(code).ok_or_else(|| {
                PersistenceError::InvalidData(format!(
                    "exception_type {code} stored for {date} is not 1 or 2"
                ))
            })?;
            calendar.set_date_exception(date, kind.adds_service(), &mut IgnoreProblems);
        }
        Ok(calendar)
    }
}

impl CalendarStore for SqliteCalendarStore {
    fn insert(&self, row: &CalendarRow) -> PersistenceResult<RowId> {
        let conn = self.connection.lock();
        let d = row.days.map(i64::from);
        conn.execute(
            "INSERT INTO calendar (service_id, start_date, end_date, monday, tuesday, wednesday,
                                   thursday, friday, saturday, sunday)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.service_id,
                row.start_date,
                row.end_date,
                d[0],
                d[1],
                d[2],
                d[3],
                d[4],
                d[5],
                d[6]
            ],
        )?;
        Ok(RowId(conn.last_insert_rowid()))
    }

    fn update_field(&self, row_id: RowId, field: CalendarField, value: FieldValue) -> PersistenceResult<()> {
        let conn = self.connection.lock();
        // Column names come from the closed CalendarField set.
        let sql = format!(
            "UPDATE calendar SET {} = ?1 WHERE rowid = ?2",
            field.column_name()
        );
        let changed = match (field, value) {
            (CalendarField::Day(_), FieldValue::Flag(active)) => {
                conn.execute(&sql, params![i64::from(active), row_id.0])?
            }
            (
                CalendarField::ServiceId | CalendarField::StartDate | CalendarField::EndDate,
                FieldValue::Text(Some(text)),
            ) => {
                conn.execute(&sql, params![text, row_id.0])?
            }
            (CalendarField::StartDate | CalendarField::EndDate, FieldValue::Text(None)) => {
                conn.execute(&sql, params![Option::<String>::None, row_id.0])?
            }
            (field, value) => {
                return Err(PersistenceError::InvalidData(format!(
                    "value {value:?} does not fit column {}",
                    field.column_name()
                )));
            }
        };
        if changed == 0 {
            return Err(PersistenceError::NotFound(row_id));
        }
        Ok(())
    }

    fn upsert_exception(
        &self,
        row_id: RowId,
        service_id: &str,
        date: &str,
        kind: ExceptionKind,
    ) -> PersistenceResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO calendar_dates (service_period_rowid, service_id, date, exception_type)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (service_period_rowid, date)
             DO UPDATE SET service_id = excluded.service_id,
                           exception_type = excluded.exception_type",
            params![row_id.0, service_id, date, i64::from(kind.code())],
        )?;
        Ok(())
    }

    fn delete_exceptions(&self, row_id: RowId, date: Option<&str>) -> PersistenceResult<usize> {
        let conn = self.connection.lock();
        let removed = match date {
            Some(date) => conn.execute(
                "DELETE FROM calendar_dates WHERE service_period_rowid = ?1 AND date = ?2",
                params![row_id.0, date],
            )?,
            None => conn.execute(
                "DELETE FROM calendar_dates WHERE service_period_rowid = ?1",
                params![row_id.0],
            )?,
        };
        Ok(removed)
    }

    fn count_exceptions(&self, row_id: RowId) -> PersistenceResult<usize> {
        let conn = self.connection.lock();
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM calendar_dates WHERE service_period_rowid = ?1",
            params![row_id.0],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn range_query(&self, row_id: RowId) -> PersistenceResult<(Option<String>, Option<String>)> {
        let conn = self.connection.lock();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT rowid FROM calendar WHERE rowid = ?1",
                params![row_id.0],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(PersistenceError::NotFound(row_id));
        }
        let range = conn.query_row(
            "SELECT min(low), max(high)
               FROM (
                 SELECT start_date AS low, end_date AS high
                   FROM calendar
                  WHERE rowid = ?1
                 UNION
                 SELECT date AS low, date AS high
                   FROM calendar_dates
                  WHERE service_period_rowid = ?1
                    AND exception_type = 1)",
            params![row_id.0],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
        )?;
        Ok(range)
    }
}
