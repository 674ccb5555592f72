use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Singleton business configuration, stored as one JSON blob (`id = 1`).
/// Loaded with [`StoreConfig::from_partial`] so a partial or stale record
/// from the store never leaves a field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub colors: Colors,
    pub contact: Contact,
    pub plan_active: bool,
    pub hours: BusinessHours,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Colors {
    pub background: String,
    pub card: String,
    pub text: String,
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub price: String,
    pub button_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Digits-only phone in international format, used for the WhatsApp
    /// deep link.
    pub phone: String,
    pub instagram: String,
    pub facebook: String,
    pub tiktok: String,
    pub address: String,
}

/// Business-wide operating hours. Distinct from a professional's individual
/// work hours; gates which calendar dates are selectable at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHours {
    pub open: String,
    pub close: String,
    /// 0=Sunday..6=Saturday.
    pub work_days: Vec<u8>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: "Studio Bella".to_string(),
            description: "Realce sua beleza natural com nossos tratamentos exclusivos.".to_string(),
            logo_url: None,
            colors: Colors {
                background: "#ffffff".to_string(),
                card: "#f9fafb".to_string(),
                text: "#111827".to_string(),
                primary: "#ec4899".to_string(),
                secondary: "#db2777".to_string(),
                accent: "#facc15".to_string(),
                price: "#eab308".to_string(),
                button_text: "#ffffff".to_string(),
            },
            contact: Contact {
                phone: "5511999999999".to_string(),
                instagram: "studiobella".to_string(),
                facebook: "studiobella".to_string(),
                tiktok: "studiobella".to_string(),
                address: "Rua das Flores, 123 - Centro".to_string(),
            },
            plan_active: true,
            hours: BusinessHours {
                open: "09:00".to_string(),
                close: "19:00".to_string(),
                work_days: vec![1, 2, 3, 4, 5, 6],
            },
        }
    }
}

impl StoreConfig {
    /// Merge a possibly partial JSON blob over the defaults, field by field.
    /// Unknown keys are dropped; missing keys keep their default.
    pub fn from_partial(partial: &Value) -> Self {
        let mut base = serde_json::to_value(StoreConfig::default())
            .unwrap_or(Value::Null);
        merge_value(&mut base, partial);
        serde_json::from_value(base).unwrap_or_default()
    }
}

/// Recursively lay `overlay` over `base`, object by object. Nulls and keys
/// absent from `base` are ignored.
pub fn merge_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(slot) => merge_value(slot, value),
                    None => {}
                }
            }
        }
        (slot, value) if !value.is_null() => *slot = value.clone(),
        _ => {}
    }
}
