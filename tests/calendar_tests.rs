use service_calendar::{
    CalendarError, CalendarRecord, DayOfWeek, ExceptionKind, IgnoreProblems, Problem,
    ProblemCollector, ServiceCalendar, Severity,
};

fn ranged(id: &str, start: &str, end: &str) -> ServiceCalendar {
    let mut calendar = ServiceCalendar::new(id);
    calendar.set_range(start, end);
    calendar
}

#[test]
fn weekly_pattern_applies_inside_range_only() {
    let mut cal = ranged("WEEK", "20230102", "20230115");
    cal.set_weekday_service(true);

    // 2023-01-02 is a Monday, 2023-01-07 a Saturday
    assert!(cal.is_active_on("20230102", None));
    assert!(!cal.is_active_on("20230107", None));
    // Monday outside the range
    assert!(!cal.is_active_on("20230116", None));
    assert!(!cal.is_active_on("20221226", None));
}

#[test]
fn precomputed_weekday_is_trusted() {
    let mut cal = ranged("WEEK", "20230101", "20230131");
    cal.set_day_of_week(DayOfWeek::Sunday, true);
    // 2023-01-02 is a Monday, but the caller claims Sunday
    assert!(cal.is_active_on("20230102", Some(DayOfWeek::Sunday)));
    assert!(!cal.is_active_on("20230102", None));
}

#[test]
fn added_exception_is_the_only_active_date_with_empty_pattern() {
    let mut cal = ranged("HOLIDAY", "20230101", "20230131");
    cal.set_date_exception("20230115", true, &mut IgnoreProblems);

    assert!(cal.is_active_on("20230115", None));
    assert_eq!(cal.active_dates(), vec!["20230115".to_string()]);
}

#[test]
fn added_exception_widens_effective_range() {
    let mut cal = ranged("EXTRA", "20230101", "20230107");
    cal.set_date_exception("20230201", true, &mut IgnoreProblems);

    assert_eq!(
        cal.effective_date_range(),
        (Some("20230101".to_string()), Some("20230201".to_string()))
    );
    assert_eq!(cal.active_dates(), vec!["20230201".to_string()]);
}

#[test]
fn added_exception_before_start_widens_range_downwards() {
    let mut cal = ranged("EARLY", "20230110", "20230120");
    cal.set_date_exception("20221231", true, &mut IgnoreProblems);
    let (start, end) = cal.effective_date_range();
    assert_eq!(start.as_deref(), Some("20221231"));
    assert_eq!(end.as_deref(), Some("20230120"));
}

#[test]
fn removed_exception_never_shrinks_range() {
    let mut cal = ranged("MON", "20230102", "20230108");
    cal.set_day_of_week(DayOfWeek::Monday, true);
    cal.set_date_exception("20230102", false, &mut IgnoreProblems);

    assert_eq!(
        cal.effective_date_range(),
        (Some("20230102".to_string()), Some("20230108".to_string()))
    );
    assert!(cal.active_dates().is_empty());
}

#[test]
fn removed_exception_outside_range_is_ignored_for_range() {
    let mut cal = ranged("MON", "20230102", "20230108");
    cal.set_date_exception("20230301", false, &mut IgnoreProblems);
    assert_eq!(
        cal.effective_date_range(),
        (Some("20230102".to_string()), Some("20230108".to_string()))
    );
}

#[test]
fn empty_calendar_has_no_range_and_no_dates() {
    let cal = ServiceCalendar::new("EMPTY");
    assert_eq!(cal.effective_date_range(), (None, None));
    assert!(cal.active_dates().is_empty());
    assert!(!cal.has_exceptions());
    assert!(!cal.is_active_on("20230101", None));
}

#[test]
fn exceptions_alone_define_range_without_base_range() {
    let mut cal = ServiceCalendar::new("DATES_ONLY");
    cal.set_date_exception("20230305", true, &mut IgnoreProblems);
    cal.set_date_exception("20230301", true, &mut IgnoreProblems);
    cal.set_date_exception("20230310", false, &mut IgnoreProblems);

    assert_eq!(
        cal.effective_date_range(),
        (Some("20230301".to_string()), Some("20230305".to_string()))
    );
    assert_eq!(
        cal.active_dates(),
        vec!["20230301".to_string(), "20230305".to_string()]
    );
}

#[test]
fn active_dates_walk_across_month_and_leap_day() {
    let mut cal = ranged("DAILY", "20240227", "20240302");
    cal.set_weekday_service(true);
    cal.set_weekend_service(true);
    assert_eq!(
        cal.active_dates(),
        vec!["20240227", "20240228", "20240229", "20240301", "20240302"]
    );
    assert_eq!(cal.active_naive_dates().len(), 5);
}

#[test]
fn duplicate_exception_warns_and_last_write_wins() {
    let mut cal = ranged("DUP", "20230101", "20230131");
    let mut problems = ProblemCollector::new();

    cal.set_date_exception("20230110", true, &mut problems);
    assert!(problems.is_empty());

    cal.set_date_exception("20230110", false, &mut problems);
    assert_eq!(
        problems.problems(),
        &[Problem::DuplicateId {
            key_fields: vec!["service_id".into(), "date".into()],
            key_values: vec!["DUP".into(), "20230110".into()],
            severity: Severity::Warning,
        }]
    );
    assert_eq!(cal.exception_on("20230110"), Some(ExceptionKind::Removed));
    assert!(!cal.is_active_on("20230110", None));
}

#[test]
fn repeating_the_same_exception_is_idempotent() {
    let mut once = ranged("IDEM", "20230101", "20230131");
    let mut twice = once.clone();
    let mut problems = ProblemCollector::new();

    once.set_date_exception("20230105", true, &mut problems);
    twice.set_date_exception("20230105", true, &mut problems);
    twice.set_date_exception("20230105", true, &mut problems);

    assert_eq!(once, twice);
    assert_eq!(once.exceptions(), twice.exceptions());
    assert_eq!(problems.len(), 1);
}

#[test]
fn clear_date_exception_restores_pattern() {
    let mut cal = ranged("CLR", "20230102", "20230108");
    cal.set_day_of_week(DayOfWeek::Monday, true);
    cal.set_date_exception("20230102", false, &mut IgnoreProblems);
    assert!(!cal.is_active_on("20230102", None));

    assert!(cal.clear_date_exception("20230102"));
    assert!(cal.is_active_on("20230102", None));
    // Clearing again is harmless
    assert!(!cal.clear_date_exception("20230102"));
}

#[test]
fn weekday_index_out_of_range_is_rejected() {
    let mut cal = ServiceCalendar::new("IDX");
    assert_eq!(
        cal.set_day_of_week_index(7, true),
        Err(CalendarError::InvalidWeekdayIndex(7))
    );
    cal.set_day_of_week_index(6, true).unwrap();
    assert!(cal.sunday());
    assert!(!cal.saturday());
}

#[test]
fn weekday_and_weekend_helpers_set_expected_slots() {
    let mut cal = ServiceCalendar::new("HELP");
    cal.set_weekday_service(true);
    assert_eq!(
        cal.weekly_pattern(),
        [true, true, true, true, true, false, false]
    );
    cal.set_weekend_service(true);
    cal.set_weekday_service(false);
    assert_eq!(
        cal.weekly_pattern(),
        [false, false, false, false, false, true, true]
    );
    assert!(cal.saturday() && cal.sunday() && !cal.monday() && !cal.friday());
}

#[test]
fn from_fields_parses_weekday_tokens() {
    let cal = ServiceCalendar::from_fields(&[
        "WE", "20230101", "20231231", "0", "0", "0", "0", "0", " 1 ", "1",
    ])
    .unwrap();
    assert_eq!(cal.service_id(), "WE");
    assert_eq!(cal.start_date(), Some("20230101"));
    // Only an exact "1" means service; the padded token is kept trimmed
    assert!(!cal.saturday());
    assert!(cal.sunday());
    assert!(!cal.monday());
    assert_eq!(cal.raw_weekly_tokens().unwrap()[5], "1");
}

#[test]
fn padded_weekday_token_passes_validation_without_service() {
    let mut cal = ServiceCalendar::from_fields(&[
        "PAD", "20230101", "20231231", " 1", "1", "1", "1", "1", "0", "0",
    ])
    .unwrap();
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert!(problems.is_empty(), "{:?}", problems.problems());
    // 2023-01-02 is a Monday, 2023-01-03 a Tuesday
    assert!(!cal.is_active_on("20230102", None));
    assert!(cal.is_active_on("20230103", None));
}

#[test]
fn empty_start_bound_is_unset_before_validation() {
    let mut cal = ServiceCalendar::from_fields(&[
        "S", "", "20230110", "0", "0", "0", "0", "0", "0", "0",
    ])
    .unwrap();
    cal.set_date_exception("20230105", true, &mut IgnoreProblems);

    assert_eq!(
        cal.effective_date_range(),
        (Some("20230105".to_string()), Some("20230110".to_string()))
    );
    assert!(cal.is_active_on("20230105", None));
    assert_eq!(cal.active_dates(), vec!["20230105".to_string()]);
}

#[test]
fn malformed_end_bound_cannot_enable_weekly_pattern() {
    let mut cal = ServiceCalendar::from_fields(&[
        "S", "20230101", "2023131", "1", "1", "1", "1", "1", "1", "1",
    ])
    .unwrap();
    cal.set_date_exception("20230105", true, &mut IgnoreProblems);

    assert_eq!(
        cal.effective_date_range(),
        (Some("20230101".to_string()), Some("20230105".to_string()))
    );
    // "20230104" sorts below "2023131" but the bound is not a date
    assert!(!cal.is_active_on("20230104", None));
    assert!(cal.is_active_on("20230105", None));
    assert_eq!(cal.active_dates(), vec!["20230105".to_string()]);
}

#[test]
fn from_fields_rejects_short_rows() {
    let err = ServiceCalendar::from_fields(&["WE", "20230101"]).unwrap_err();
    assert_eq!(
        err,
        CalendarError::FieldCount {
            expected: 10,
            found: 2
        }
    );
}

#[test]
fn calendar_fields_tuple_requires_full_range() {
    let mut cal = ServiceCalendar::new("TUP");
    assert!(cal.calendar_fields_tuple().is_none());
    cal.set_start_date(Some("20230101".into()));
    assert!(cal.calendar_fields_tuple().is_none());
    cal.set_end_date(Some("20230131".into()));
    cal.set_day_of_week(DayOfWeek::Wednesday, true);

    let fields = cal.calendar_fields_tuple().unwrap();
    assert_eq!(
        fields,
        ["TUP", "20230101", "20230131", "0", "0", "1", "0", "0", "0", "0"].map(String::from)
    );
}

#[test]
fn exception_field_tuples_are_sorted_with_codes() {
    let mut cal = ServiceCalendar::new("EXC");
    cal.set_date_exception("20230310", false, &mut IgnoreProblems);
    cal.set_date_exception("20230301", true, &mut IgnoreProblems);
    assert_eq!(
        cal.exception_field_tuples(),
        vec![
            ("EXC".to_string(), "20230301".to_string(), "1".to_string()),
            ("EXC".to_string(), "20230310".to_string(), "2".to_string()),
        ]
    );
}

#[test]
fn equality_ignores_raw_tokens() {
    let from_feed = ServiceCalendar::from_record(CalendarRecord {
        service_id: "EQ".into(),
        start_date: "20230101".into(),
        end_date: "20230131".into(),
        days: ["1", "1", "1", "1", "1", "0", "0"].map(String::from),
    });
    let mut built = ranged("EQ", "20230101", "20230131");
    built.set_weekday_service(true);
    assert_eq!(from_feed, built);

    built.set_date_exception("20230107", true, &mut IgnoreProblems);
    assert_ne!(from_feed, built);
}
