use crate::calendar::ServiceCalendar;
use crate::date::{DayOfWeek, is_valid_date};
use crate::exception::ExceptionKind;
use crate::problems::{ProblemSink, Severity};

/// Which range bound a check applies to.
#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

impl Bound {
    fn field_name(self) -> &'static str {
        match self {
            Bound::Start => "start_date",
            Bound::End => "end_date",
        }
    }
}

impl ServiceCalendar {
    /// Run every check in order. Invalid range bounds are cleared so later
    /// consumers see a consistent calendar.
    pub fn validate(&mut self, problems: &mut dyn ProblemSink) {
        self.validate_service_id(problems);
        self.validate_start_date(problems);
        self.validate_end_date(problems);
        self.validate_end_after_start(problems);
        self.validate_days_of_week(problems);
        self.validate_has_service_at_least_once_a_week(problems);
        self.validate_exception_dates(problems);
    }

    pub fn validate_service_id(&self, problems: &mut dyn ProblemSink) {
        if self.service_id.trim().is_empty() {
            problems.missing_value("service_id");
        }
    }

    pub fn validate_start_date(&mut self, problems: &mut dyn ProblemSink) {
        self.validate_bound(Bound::Start, problems);
    }

    pub fn validate_end_date(&mut self, problems: &mut dyn ProblemSink) {
        self.validate_bound(Bound::End, problems);
    }

    fn validate_bound(&mut self, bound: Bound, problems: &mut dyn ProblemSink) {
        let slot = match bound {
            Bound::Start => &mut self.start_date,
            Bound::End => &mut self.end_date,
        };
        let Some(value) = slot.as_deref() else {
            return;
        };
        if value.trim().is_empty() {
            problems.missing_value(bound.field_name());
            *slot = None;
        } else if !is_valid_date(value) {
            problems.invalid_value(bound.field_name(), value, None);
            *slot = None;
        }
    }

    pub fn validate_end_after_start(&self, problems: &mut dyn ProblemSink) {
        if let (Some(start), Some(end)) = (self.start_date.as_deref(), self.end_date.as_deref()) {
            if !start.is_empty() && !end.is_empty() && end < start {
                let detail =
                    format!("end_date of {end} is earlier than start_date of \"{start}\"");
                problems.invalid_value("end_date", end, Some(&detail));
            }
        }
    }

    /// Checks the tokens as they appeared in the feed; skipped for calendars
    /// built in code.
    pub fn validate_days_of_week(&self, problems: &mut dyn ProblemSink) {
        let Some(tokens) = &self.raw_weekly_tokens else {
            return;
        };
        for (day, token) in DayOfWeek::ALL.iter().zip(tokens.iter()) {
            if token.trim().is_empty() {
                problems.missing_value(day.column_name());
            } else if token != "0" && token != "1" {
                problems.invalid_value(day.column_name(), token, None);
            }
        }
    }

    pub fn validate_has_service_at_least_once_a_week(&self, problems: &mut dyn ProblemSink) {
        let any_weekday = self.weekly_pattern.iter().any(|active| *active);
        let any_added = self
            .exceptions
            .values()
            .any(|kind| *kind == ExceptionKind::Added);
        if !any_weekday && !any_added {
            problems.other_problem(
                &format!(
                    "Service period with service_id \"{}\" doesn't have service on any days of the week.",
                    self.service_id
                ),
                Severity::Warning,
            );
        }
    }

    pub fn validate_exception_dates(&self, problems: &mut dyn ProblemSink) {
        for date in self.exceptions.keys() {
            if !is_valid_date(date) {
                problems.invalid_value("date", date, None);
            }
        }
    }
}
