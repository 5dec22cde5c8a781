use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::calendar::ServiceCalendar;
use crate::date::{DayOfWeek, parse_date};
use crate::problems::{ProblemSink, Severity};

/// Every service calendar of one feed, keyed by service id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSchedule {
    calendars: BTreeMap<String, ServiceCalendar>,
}

impl ServiceSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a calendar unless its service id is already taken. A clash is
    /// reported as a duplicate error and the first calendar is kept.
    pub fn add_calendar(&mut self, calendar: ServiceCalendar, problems: &mut dyn ProblemSink) -> bool {
        let id = calendar.service_id().to_string();
        if self.calendars.contains_key(&id) {
            problems.duplicate_id(&["service_id"], &[&id], Severity::Error);
            return false;
        }
        self.calendars.insert(id, calendar);
        true
    }

    pub fn calendar(&self, service_id: &str) -> Option<&ServiceCalendar> {
        self.calendars.get(service_id)
    }

    /// Calendar for `service_id`, created empty if the feed only mentions it
    /// through exceptions.
    pub fn calendar_or_insert(&mut self, service_id: &str) -> &mut ServiceCalendar {
        self.calendars
            .entry(service_id.to_string())
            .or_insert_with(|| ServiceCalendar::new(service_id))
    }

    pub fn calendars(&self) -> impl Iterator<Item = &ServiceCalendar> {
        self.calendars.values()
    }

    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.calendars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }

    pub fn validate(&mut self, problems: &mut dyn ProblemSink) {
        for calendar in self.calendars.values_mut() {
            calendar.validate(problems);
        }
        info!(services = self.calendars.len(), "validated service calendars");
    }

    /// Ids of the services running on `date`, in id order.
    pub fn services_active_on(&self, date: &str) -> Vec<&str> {
        let weekday = parse_date(date).ok().map(DayOfWeek::of);
        self.calendars
            .values()
            .filter(|calendar| calendar.is_active_on(date, weekday))
            .map(ServiceCalendar::service_id)
            .collect()
    }

    /// Union of every calendar's effective range.
    pub fn date_range(&self) -> (Option<String>, Option<String>) {
        let mut start: Option<String> = None;
        let mut end: Option<String> = None;
        for calendar in self.calendars.values() {
            let (low, high) = calendar.effective_date_range();
            if let Some(low) = low {
                if start.as_ref().is_none_or(|current| low < *current) {
                    start = Some(low);
                }
            }
            if let Some(high) = high {
                if end.as_ref().is_none_or(|current| high > *current) {
                    end = Some(high);
                }
            }
        }
        (start, end)
    }
}
