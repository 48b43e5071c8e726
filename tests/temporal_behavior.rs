//! Calendar arithmetic and interval parsing against the documented
//! examples.

use statx_core::{Duration, TimeInterval, TimeUnit};
use time::macros::datetime;

#[test]
fn full_duration_added_to_a_timestamp() {
    let duration = Duration::parse("P3Y6M4DT12H30M5S").expect("must parse");
    let shifted = duration
        .add_to(datetime!(2010-01-01 00:00))
        .expect("in range");
    assert_eq!(shifted, datetime!(2013-07-05 12:30:05));
}

#[test]
fn twelve_months_normalize_to_one_year() {
    let month = Duration::parse("P1M").expect("must parse");
    let year = month.checked_mul(12).expect("no overflow").normalized();
    assert_eq!(year, Duration::parse("P1Y").expect("must parse"));
    assert_eq!(year.get(TimeUnit::Years), 1);
    assert_eq!(year.get(TimeUnit::Months), 0);
}

#[test]
fn interval_defaults_start_fields_to_calendar_start() {
    let interval = TimeInterval::parse("2010/P2M").expect("must parse");
    assert_eq!(interval.start(), datetime!(2010-01-01 00:00));
    assert_eq!(interval.duration(), Duration::parse("P2M").expect("must parse"));
}

#[test]
fn interval_short_form_follows_duration_precision() {
    let monthly = TimeInterval::parse("2010-04/P1M").expect("must parse");
    assert_eq!(monthly.to_short_string(), "2010-04/P1M");

    let yearly = TimeInterval::parse("2010-01-01/P1Y").expect("must parse");
    assert_eq!(yearly.to_short_string(), "2010/P1Y");

    let hourly = TimeInterval::parse("2010-01-01T09/PT1H").expect("must parse");
    assert_eq!(hourly.to_short_string(), "2010-01-01T09/PT1H");
}

#[test]
fn malformed_temporal_text_is_rejected_synchronously() {
    assert!(Duration::parse("P").is_err());
    assert!(Duration::parse("PT").is_err());
    assert!(Duration::parse("P1H").is_err());
    assert!(TimeInterval::parse("2010").is_err());
    assert!(TimeInterval::parse("2010/").is_err());
}

#[test]
fn calendar_arithmetic_respects_month_lengths() {
    let month = Duration::parse("P1M").expect("must parse");
    let end_of_january = datetime!(2011-01-31 00:00);
    assert_eq!(
        month.add_to(end_of_january).expect("in range"),
        datetime!(2011-02-28 00:00)
    );

    let hours = Duration::parse("PT25H").expect("must parse");
    assert_eq!(
        hours.add_to(datetime!(2011-03-01 00:00)).expect("in range"),
        datetime!(2011-03-02 01:00)
    );
}
