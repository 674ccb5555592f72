use serde::{Deserialize, Serialize};

use crate::services::timeutil;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub photo_url: String,
    /// Ids of the services this professional performs.
    pub service_ids: Vec<String>,
    /// 0=Sunday..6=Saturday. Empty means the business-wide work days apply.
    pub work_days: Vec<u8>,
    /// Local time-of-day, "HH:MM".
    pub work_hours_start: String,
    pub work_hours_end: String,
    pub is_active: bool,
    pub description: Option<String>,
}

impl Professional {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("professional name must not be empty");
        }
        let start = timeutil::parse_time(&self.work_hours_start)?;
        let end = timeutil::parse_time(&self.work_hours_end)?;
        if start >= end {
            anyhow::bail!(
                "work hours start ({}) must be before end ({})",
                self.work_hours_start,
                self.work_hours_end
            );
        }
        for day in &self.work_days {
            if *day > 6 {
                anyhow::bail!("invalid weekday: {day}");
            }
        }
        Ok(())
    }

    /// Whether this professional works on the given weekday (0=Sunday). An
    /// empty `work_days` defers entirely to the business-wide schedule.
    pub fn works_on(&self, weekday: u8) -> bool {
        self.work_days.is_empty() || self.work_days.contains(&weekday)
    }

    pub fn offers(&self, service_id: &str) -> bool {
        self.service_ids.iter().any(|id| id == service_id)
    }
}
