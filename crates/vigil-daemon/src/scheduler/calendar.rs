//! Time-of-day triggers for periodic reports

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};

/// The first trigger strictly after `after`, or `None` if no trigger can fire.
///
/// `times` are UTC times of day; only dates falling on one of `weekdays`
/// qualify.
pub fn next_periodic(
    after: DateTime<Utc>,
    times: &[NaiveTime],
    weekdays: &[Weekday],
) -> Option<DateTime<Utc>> {
    if times.is_empty() || weekdays.is_empty() {
        return None;
    }

    let start = after.date_naive();
    (0..=7)
        .map(|offset| start + Duration::days(offset))
        .filter(|date| weekdays.contains(&date.weekday()))
        .flat_map(|date| {
            times
                .iter()
                .map(move |time| Utc.from_utc_datetime(&date.and_time(*time)))
        })
        .filter(|candidate| *candidate > after)
        .min()
}
