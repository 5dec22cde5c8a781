use service_calendar::{
    DayOfWeek, IgnoreProblems, Problem, ProblemCollector, ServiceCalendar, Severity,
};

fn feed_calendar(fields: [&str; 10]) -> ServiceCalendar {
    ServiceCalendar::from_fields(&fields).unwrap()
}

fn no_service_warning(id: &str) -> Problem {
    Problem::Other {
        message: format!(
            "Service period with service_id \"{id}\" doesn't have service on any days of the week."
        ),
        severity: Severity::Warning,
    }
}

#[test]
fn well_formed_calendar_reports_nothing() {
    let mut cal = feed_calendar([
        "WK", "20230101", "20231231", "1", "1", "1", "1", "1", "0", "0",
    ]);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert!(problems.is_empty(), "{:?}", problems.problems());
    assert_eq!(cal.start_date(), Some("20230101"));
}

#[test]
fn seven_digit_start_date_is_invalid_and_cleared() {
    let mut cal = feed_calendar([
        "WK", "2023131", "20231231", "1", "1", "1", "1", "1", "0", "0",
    ]);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);

    assert_eq!(
        problems.problems(),
        &[Problem::InvalidValue {
            field: "start_date".into(),
            value: "2023131".into(),
            detail: None,
        }]
    );
    assert_eq!(cal.start_date(), None);
    assert_eq!(cal.end_date(), Some("20231231"));
}

#[test]
fn impossible_calendar_date_is_invalid() {
    let mut cal = feed_calendar([
        "WK", "20230101", "20230230", "1", "1", "1", "1", "1", "0", "0",
    ]);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert_eq!(problems.len(), 1);
    assert!(matches!(
        &problems.problems()[0],
        Problem::InvalidValue { field, .. } if field == "end_date"
    ));
    assert_eq!(cal.end_date(), None);
}

#[test]
fn empty_dates_are_missing_and_cleared() {
    let mut cal = feed_calendar(["WK", "", " ", "1", "1", "1", "1", "1", "0", "0"]);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert_eq!(
        problems.problems(),
        &[
            Problem::MissingValue {
                field: "start_date".into()
            },
            Problem::MissingValue {
                field: "end_date".into()
            },
        ]
    );
    assert_eq!(cal.start_date(), None);
    assert_eq!(cal.end_date(), None);
}

#[test]
fn end_before_start_is_reported_without_clearing() {
    let mut cal = feed_calendar([
        "WK", "20230201", "20230101", "1", "1", "1", "1", "1", "0", "0",
    ]);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);

    assert_eq!(
        problems.problems(),
        &[Problem::InvalidValue {
            field: "end_date".into(),
            value: "20230101".into(),
            detail: Some(
                "end_date of 20230101 is earlier than start_date of \"20230201\"".into()
            ),
        }]
    );
    assert_eq!(cal.start_date(), Some("20230201"));
    assert_eq!(cal.end_date(), Some("20230101"));
}

#[test]
fn bad_weekday_tokens_are_reported_per_column() {
    let mut cal = feed_calendar([
        "WK", "20230101", "20231231", "1", "2", "", "1", "yes", "0", "0",
    ]);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);

    assert_eq!(
        problems.problems(),
        &[
            Problem::InvalidValue {
                field: "tuesday".into(),
                value: "2".into(),
                detail: None,
            },
            Problem::MissingValue {
                field: "wednesday".into()
            },
            Problem::InvalidValue {
                field: "friday".into(),
                value: "yes".into(),
                detail: None,
            },
        ]
    );
    // Malformed tokens parse as no service
    assert!(!cal.runs_on(DayOfWeek::Tuesday));
    assert!(cal.runs_on(DayOfWeek::Thursday));
}

#[test]
fn weekday_tokens_are_not_checked_for_calendars_built_in_code() {
    let mut cal = ServiceCalendar::new("CODE");
    cal.set_range("20230101", "20230131");
    cal.set_weekday_service(true);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert!(problems.is_empty());
}

#[test]
fn missing_service_id_is_reported() {
    let mut cal = ServiceCalendar::new("");
    cal.set_weekday_service(true);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert_eq!(
        problems.problems(),
        &[Problem::MissingValue {
            field: "service_id".into()
        }]
    );
}

#[test]
fn no_active_days_warns_until_service_is_added() {
    let mut cal = ServiceCalendar::new("NONE");
    cal.set_range("20230101", "20230131");

    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert_eq!(problems.problems(), &[no_service_warning("NONE")]);
    assert!(!problems.has_errors());

    // A removed exception does not count as service
    cal.set_date_exception("20230110", false, &mut IgnoreProblems);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert_eq!(problems.problems(), &[no_service_warning("NONE")]);

    let mut with_added = cal.clone();
    with_added.set_date_exception("20230111", true, &mut IgnoreProblems);
    let mut problems = ProblemCollector::new();
    with_added.validate(&mut problems);
    assert!(problems.is_empty());

    let mut with_weekday = cal.clone();
    with_weekday.set_day_of_week(DayOfWeek::Friday, true);
    let mut problems = ProblemCollector::new();
    with_weekday.validate(&mut problems);
    assert!(problems.is_empty());
}

#[test]
fn malformed_exception_dates_are_reported() {
    let mut cal = ServiceCalendar::new("EXC");
    cal.set_weekday_service(true);
    cal.set_date_exception("2023-01-01", true, &mut IgnoreProblems);
    cal.set_date_exception("20230101", true, &mut IgnoreProblems);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);
    assert_eq!(
        problems.problems(),
        &[Problem::InvalidValue {
            field: "date".into(),
            value: "2023-01-01".into(),
            detail: None,
        }]
    );
}

#[test]
fn checks_report_in_fixed_order() {
    let mut cal = feed_calendar(["", "bad", "20230101", "0", "0", "0", "0", "0", "0", "x"]);
    cal.set_date_exception("nope", false, &mut IgnoreProblems);
    let mut problems = ProblemCollector::new();
    cal.validate(&mut problems);

    let fields: Vec<String> = problems
        .problems()
        .iter()
        .map(|problem| match problem {
            Problem::MissingValue { field } | Problem::InvalidValue { field, .. } => field.clone(),
            Problem::Other { .. } => "no_service".to_string(),
            Problem::DuplicateId { .. } => "duplicate".to_string(),
        })
        .collect();
    assert_eq!(
        fields,
        vec!["service_id", "start_date", "sunday", "no_service", "date"]
    );
}
