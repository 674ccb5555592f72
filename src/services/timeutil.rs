use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Fallback spacing when no service duration is known. Production call
/// sites pass the selected service's duration so consecutive slots never
/// overlap.
pub const DEFAULT_SLOT_INTERVAL_MINUTES: i64 = 30;

/// Current civil date in the business timezone. All "is this date in the
/// past" decisions go through this, never through the host's local zone.
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Current wall-clock time in the business timezone.
pub fn now_time(tz: Tz) -> NaiveTime {
    Utc::now().with_timezone(&tz).time()
}

/// Weekday as 0=Sunday..6=Saturday, matching the `work_days` arrays stored
/// in configuration and on professionals.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Candidate booking times from `start` (inclusive) up to but excluding
/// `end`, spaced `interval_minutes` apart. Empty when `start >= end` or the
/// interval is not positive.
pub fn generate_slots(start: NaiveTime, end: NaiveTime, interval_minutes: i64) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    if interval_minutes <= 0 {
        return slots;
    }

    let step = Duration::minutes(interval_minutes);
    let mut current = start;
    while current < end {
        slots.push(current);
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            // Stepped past midnight.
            break;
        }
        current = next;
    }
    slots
}

/// Combine a civil date and local time-of-day in the business timezone into
/// an absolute UTC instant. Used when persisting, never for display.
///
/// A local time made ambiguous or skipped by a DST transition resolves to
/// the earliest valid instant.
pub fn to_utc_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    let local = date.and_time(time);
    let zoned = tz
        .from_local_datetime(&local)
        .earliest()
        .with_context(|| format!("no valid instant for {local} in {tz}"))?;
    Ok(zoned.with_timezone(&Utc))
}

/// Render a `YYYY-MM-DD` date string as `DD/MM/YYYY` for user-facing text.
/// Operates on the string components directly; no timezone math.
pub fn format_display(date_str: &str) -> String {
    let mut parts = date_str.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day)) => format!("{day}/{month}/{year}"),
        _ => date_str.to_string(),
    }
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date: {s}"))
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").with_context(|| format!("invalid time: {s}"))
}
