use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub client_phone: String,
    pub professional_id: String,
    pub service_id: String,
    /// Civil date in the business timezone, no time component.
    pub date: NaiveDate,
    /// Local time-of-day in the business timezone.
    pub time: NaiveTime,
    /// `date` + `time` resolved through the business timezone; persisted for
    /// backend consumers, never used for display.
    pub timestamp_utc: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => AppointmentStatus::Confirmed,
            "cancelled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Pending,
        }
    }
}

/// A taken interval on a professional's day, used when filtering candidate
/// slots. Carries the duration of the booked service.
#[derive(Debug, Clone, Copy)]
pub struct BookedInterval {
    pub start: NaiveTime,
    pub duration_minutes: i64,
}
