use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::load_config;
use crate::models::{store_config, Professional, Service, StoreConfig};
use crate::services::storage::Bucket;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Administrative mutations are blocked while the subscription plan is
/// inactive. Viewing configuration and re-activating the plan stay open.
fn require_plan(config: &StoreConfig) -> Result<(), AppError> {
    if !config.plan_active {
        return Err(AppError::PlanInactive);
    }
    Ok(())
}

// ── Services ──

#[derive(Deserialize)]
pub struct ServicePayload {
    pub name: String,
    pub duration_minutes: i64,
    pub price: f64,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.db.lock().unwrap();
    Ok(Json(queries::list_services(&db, false)?))
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ServicePayload>,
) -> Result<Json<Service>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let service = Service {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        duration_minutes: payload.duration_minutes,
        price: payload.price,
        description: payload.description,
        is_active: payload.is_active,
    };
    service
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let db = state.db.lock().unwrap();
    queries::create_service(&db, &service)?;
    Ok(Json(service))
}

pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<ServicePayload>,
) -> Result<Json<Service>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let service = Service {
        id: id.clone(),
        name: payload.name,
        duration_minutes: payload.duration_minutes,
        price: payload.price,
        description: payload.description,
        is_active: payload.is_active,
    };
    service
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let db = state.db.lock().unwrap();
    if !queries::update_service(&db, &service)? {
        return Err(AppError::NotFound(format!("service {id}")));
    }
    Ok(Json(service))
}

pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let db = state.db.lock().unwrap();
    if !queries::delete_service(&db, &id)? {
        return Err(AppError::NotFound(format!("service {id}")));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ── Professionals ──

#[derive(Deserialize)]
pub struct ProfessionalPayload {
    pub name: String,
    pub specialty: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub service_ids: Vec<String>,
    #[serde(default)]
    pub work_days: Vec<u8>,
    pub work_hours_start: String,
    pub work_hours_end: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub description: Option<String>,
}

impl ProfessionalPayload {
    fn into_professional(self, id: String) -> Professional {
        Professional {
            id,
            name: self.name,
            specialty: self.specialty,
            photo_url: self.photo_url,
            service_ids: self.service_ids,
            work_days: self.work_days,
            work_hours_start: self.work_hours_start,
            work_hours_end: self.work_hours_end,
            is_active: self.is_active,
            description: self.description,
        }
    }
}

fn validate_professional(
    db: &rusqlite::Connection,
    professional: &Professional,
) -> Result<(), AppError> {
    professional
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    for service_id in &professional.service_ids {
        if queries::get_service(db, service_id)?.is_none() {
            return Err(AppError::Validation(format!(
                "unknown service: {service_id}"
            )));
        }
    }
    Ok(())
}

pub async fn list_professionals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Professional>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let db = state.db.lock().unwrap();
    Ok(Json(queries::list_professionals(&db, false)?))
}

pub async fn create_professional(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ProfessionalPayload>,
) -> Result<Json<Professional>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let professional = payload.into_professional(Uuid::new_v4().to_string());
    let db = state.db.lock().unwrap();
    validate_professional(&db, &professional)?;
    queries::create_professional(&db, &professional)?;
    Ok(Json(professional))
}

pub async fn update_professional(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<ProfessionalPayload>,
) -> Result<Json<Professional>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let professional = payload.into_professional(id.clone());
    let db = state.db.lock().unwrap();
    validate_professional(&db, &professional)?;
    if !queries::update_professional(&db, &professional)? {
        return Err(AppError::NotFound(format!("professional {id}")));
    }
    Ok(Json(professional))
}

pub async fn delete_professional(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let db = state.db.lock().unwrap();
    if !queries::delete_professional(&db, &id)? {
        return Err(AppError::NotFound(format!("professional {id}")));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ── Appointments ──

#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    id: String,
    client_name: String,
    client_phone: String,
    professional_id: String,
    service_id: String,
    date: String,
    time: String,
    status: String,
    created_at: String,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50);
    let appointments = {
        let db = state.db.lock().unwrap();
        queries::list_appointments(&db, query.status.as_deref(), limit)?
    };

    let response = appointments
        .into_iter()
        .map(|a| AppointmentResponse {
            id: a.id,
            client_name: a.client_name,
            client_phone: a.client_phone,
            professional_id: a.professional_id,
            service_id: a.service_id,
            date: a.date.format("%Y-%m-%d").to_string(),
            time: a.time.format("%H:%M").to_string(),
            status: a.status.as_str().to_string(),
            created_at: a.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(response))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let found = {
        let db = state.db.lock().unwrap();
        queries::cancel_appointment(&db, &id)?
    };
    if !found {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }

    tracing::info!(appointment_id = %id, "appointment cancelled");
    Ok(Json(serde_json::json!({ "id": id, "status": "cancelled" })))
}

// ── Store configuration ──

pub async fn get_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StoreConfig>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(load_config(&state)))
}

pub async fn update_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(partial): Json<Value>,
) -> Result<Json<StoreConfig>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let db = state.db.lock().unwrap();
    let mut blob = queries::load_config_blob(&db)?
        .unwrap_or_else(|| serde_json::to_value(StoreConfig::default()).unwrap_or(Value::Null));
    store_config::merge_value(&mut blob, &partial);

    let merged = StoreConfig::from_partial(&blob);
    let value = serde_json::to_value(&merged).map_err(anyhow::Error::from)?;
    queries::save_config_blob(&db, &value)?;
    Ok(Json(merged))
}

pub async fn activate_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StoreConfig>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let blob = queries::load_config_blob(&db)?.unwrap_or(Value::Null);
    let mut config = StoreConfig::from_partial(&blob);
    config.plan_active = true;
    let value = serde_json::to_value(&config).map_err(anyhow::Error::from)?;
    queries::save_config_blob(&db, &value)?;

    tracing::info!("subscription plan activated");
    Ok(Json(config))
}

// ── Image upload ──

#[derive(Serialize)]
pub struct UploadResponse {
    url: String,
}

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    require_plan(&load_config(&state))?;

    let mut bucket = Bucket::Images;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("bucket") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                bucket = Bucket::parse(&value)
                    .ok_or_else(|| AppError::Validation(format!("unknown bucket: {value}")))?;
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("missing file field".to_string()))?;
    let stored_name = format!("{}-{}", Uuid::new_v4(), filename);

    let url = state
        .images
        .upload(bucket, &stored_name, bytes, &content_type)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(Json(UploadResponse { url }))
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
