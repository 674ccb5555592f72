use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration_minutes: i64,
    pub price: f64,
    pub description: Option<String>,
    pub is_active: bool,
}

impl Service {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("service name must not be empty");
        }
        if self.duration_minutes <= 0 {
            anyhow::bail!("service duration must be positive");
        }
        if self.price < 0.0 {
            anyhow::bail!("service price must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Service {
        Service {
            id: "svc-1".to_string(),
            name: "Manicure".to_string(),
            duration_minutes: 45,
            price: 60.0,
            description: None,
            is_active: true,
        }
    }

    #[test]
    fn test_valid_service() {
        assert!(service().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_duration() {
        let mut s = service();
        s.duration_minutes = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_price() {
        let mut s = service();
        s.price = -1.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_name() {
        let mut s = service();
        s.name = "  ".to_string();
        assert!(s.validate().is_err());
    }
}
