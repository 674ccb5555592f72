use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::models::{BookedInterval, BusinessHours, Professional};
use crate::services::timeutil;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("that date has already passed")]
    DateInPast,
    #[error("the salon is closed on that day")]
    OutsideWorkingDays,
    #[error("that date is not open for bookings")]
    DateBlocked,
    #[error("that time is outside the professional's working hours")]
    OutsideWorkHours,
    #[error("that time slot is no longer available, please pick another")]
    SlotTaken,
}

/// The business-wide rules that gate which calendar dates are selectable,
/// independent of any professional.
pub struct DayRules<'a> {
    pub today: NaiveDate,
    pub hours: &'a BusinessHours,
    pub blocked_dates: &'a [NaiveDate],
}

impl DayRules<'_> {
    /// A date is selectable when it is not in the past, falls on a business
    /// work day, is not explicitly blocked, and the professional works that
    /// weekday (their empty `work_days` defers to the business schedule).
    pub fn eligible(&self, date: NaiveDate, professional: &Professional) -> bool {
        self.check(date, professional).is_ok()
    }

    pub fn check(
        &self,
        date: NaiveDate,
        professional: &Professional,
    ) -> Result<(), AvailabilityError> {
        if date < self.today {
            return Err(AvailabilityError::DateInPast);
        }
        let weekday = timeutil::day_of_week(date);
        if !self.hours.work_days.contains(&weekday) {
            return Err(AvailabilityError::OutsideWorkingDays);
        }
        if !professional.works_on(weekday) {
            return Err(AvailabilityError::OutsideWorkingDays);
        }
        if self.blocked_dates.contains(&date) {
            return Err(AvailabilityError::DateBlocked);
        }
        Ok(())
    }

    /// Eligible dates of one calendar month, for graying out calendar cells.
    /// An empty result (salon closed all month) is a valid state.
    pub fn eligible_dates_in_month(
        &self,
        year: i32,
        month: u32,
        professional: &Professional,
    ) -> Vec<NaiveDate> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        let mut dates = Vec::new();
        let mut date = first;
        while date.month() == month {
            if self.eligible(date, professional) {
                dates.push(date);
            }
            let Some(next) = date.succ_opt() else { break };
            date = next;
        }
        dates
    }
}

/// Open slots for a professional on a date: candidates spaced by the
/// service duration across their work hours, minus anything overlapping an
/// existing booking, minus times already gone by when the date is today.
/// A slot is only offered when the whole `[slot, slot + duration)` interval
/// fits inside the work hours, so every offered slot also passes
/// [`check_bookable`]. Ascending order by construction.
pub fn available_slots(
    professional: &Professional,
    service_duration: i64,
    date: NaiveDate,
    today: NaiveDate,
    now: NaiveTime,
    booked: &[BookedInterval],
) -> anyhow::Result<Vec<NaiveTime>> {
    let start = timeutil::parse_time(&professional.work_hours_start)?;
    let end = timeutil::parse_time(&professional.work_hours_end)?;

    let slots = timeutil::generate_slots(start, end, service_duration)
        .into_iter()
        .filter(|slot| minutes_of(*slot) + service_duration <= minutes_of(end))
        .filter(|slot| !(date == today && *slot <= now))
        .filter(|slot| !overlaps_any(*slot, service_duration, booked))
        .collect();

    Ok(slots)
}

/// Full server-side check used at appointment creation. The calendar and
/// time picker already enforce these client-side; re-checking here is what
/// actually prevents a double booking.
pub fn check_bookable(
    rules: &DayRules<'_>,
    professional: &Professional,
    service_duration: i64,
    date: NaiveDate,
    time: NaiveTime,
    now: NaiveTime,
    booked: &[BookedInterval],
) -> Result<(), AvailabilityError> {
    rules.check(date, professional)?;

    let start = timeutil::parse_time(&professional.work_hours_start)
        .map_err(|_| AvailabilityError::OutsideWorkHours)?;
    let end = timeutil::parse_time(&professional.work_hours_end)
        .map_err(|_| AvailabilityError::OutsideWorkHours)?;

    if time < start || minutes_of(time) + service_duration > minutes_of(end) {
        return Err(AvailabilityError::OutsideWorkHours);
    }
    if date == rules.today && time <= now {
        return Err(AvailabilityError::DateInPast);
    }
    if overlaps_any(time, service_duration, booked) {
        return Err(AvailabilityError::SlotTaken);
    }
    Ok(())
}

// Interval math happens in minutes since midnight: NaiveTime addition
// wraps at midnight, which would let a late booking's end sort before its
// start.
fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

fn overlaps_any(slot: NaiveTime, duration_minutes: i64, booked: &[BookedInterval]) -> bool {
    let slot_start = minutes_of(slot);
    let slot_end = slot_start + duration_minutes;
    booked.iter().any(|b| {
        let booked_start = minutes_of(b.start);
        let booked_end = booked_start + b.duration_minutes;
        booked_start < slot_end && booked_end > slot_start
    })
}
