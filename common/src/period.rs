//! Reporting period boundaries.
//!
//! A reporting week starts at local midnight of an anchor weekday. Every consumer
//! (the ranking, the summary and the legacy staff rankings list) goes through
//! [`week_boundary`] with its own configured anchor.

use chrono::{
    DateTime, Datelike, Days, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc, Weekday,
};

/// Number of days between `day` and the most recent `anchor` on or before it (0..=6).
#[must_use]
pub fn days_since_anchor(day: Weekday, anchor: Weekday) -> u32 {
    (day.num_days_from_monday() + 7 - anchor.num_days_from_monday()) % 7
}

/// Local midnight of the most recent `anchor` weekday, never later than `reference`.
///
/// An ambiguous midnight (DST fold) resolves to the earlier instant; a missing one
/// (DST gap) to the first valid local time after it.
pub fn week_boundary<Tz: TimeZone>(reference: &DateTime<Tz>, anchor: Weekday) -> DateTime<Tz> {
    let today = reference.date_naive();
    let back = days_since_anchor(today.weekday(), anchor);
    let anchor_day = today
        .checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(today);
    let midnight = anchor_day.and_time(NaiveTime::MIN);

    let tz = reference.timezone();
    match tz.from_local_datetime(&midnight).earliest() {
        Some(start) => start,
        None => first_valid_after(&tz, midnight)
            .map_or_else(|| reference.clone(), |start| start.min(reference.clone())),
    }
}

fn first_valid_after<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    (1..=12).find_map(|step| {
        tz.from_local_datetime(&(local + TimeDelta::minutes(15 * step)))
            .earliest()
    })
}

/// Boundary of the current reporting week in server-local time, as UTC for querying.
#[must_use]
pub fn current_boundary(anchor: Weekday) -> DateTime<Utc> {
    week_boundary(&Local::now(), anchor).with_timezone(&Utc)
}
