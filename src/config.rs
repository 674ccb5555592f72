use std::env;

use chrono_tz::Tz;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Fixed IANA zone all scheduling math is anchored to, regardless of
    /// where the process runs.
    pub timezone: Tz,
    pub storage_url: String,
    pub storage_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let timezone = env::var("BUSINESS_TIMEZONE")
            .ok()
            .and_then(|v| match v.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    tracing::warn!("invalid BUSINESS_TIMEZONE '{v}', using America/Sao_Paulo");
                    None
                }
            })
            .unwrap_or(chrono_tz::America::Sao_Paulo);

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salonbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            timezone,
            storage_url: env::var("STORAGE_URL").unwrap_or_default(),
            storage_api_key: env::var("STORAGE_API_KEY").unwrap_or_default(),
        }
    }
}
