use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Datelike, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use salonbook::config::AppConfig;
use salonbook::db::{self, queries};
use salonbook::handlers;
use salonbook::models::{Professional, Service};
use salonbook::services::storage::{Bucket, ImageStore};
use salonbook::state::AppState;

// ── Mock providers ──

struct MockImageStore;

#[async_trait]
impl ImageStore for MockImageStore {
    async fn upload(
        &self,
        bucket: Bucket,
        filename: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        Ok(format!("https://cdn.test/{}/{}", bucket.as_str(), filename))
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        timezone: chrono_tz::America::Sao_Paulo,
        storage_url: String::new(),
        storage_api_key: String::new(),
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();

    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        images: Box::new(MockImageStore),
    })
}

fn seed(state: &AppState) {
    let db = state.db.lock().unwrap();
    queries::create_service(
        &db,
        &Service {
            id: "svc-1".to_string(),
            name: "Corte".to_string(),
            duration_minutes: 60,
            price: 80.0,
            description: None,
            is_active: true,
        },
    )
    .unwrap();
    queries::create_professional(
        &db,
        &Professional {
            id: "pro-1".to_string(),
            name: "Ana Souza".to_string(),
            specialty: "Cabeleireira".to_string(),
            photo_url: String::new(),
            service_ids: vec!["svc-1".to_string()],
            work_days: vec![],
            work_hours_start: "09:00".to_string(),
            work_hours_end: "18:00".to_string(),
            is_active: true,
            description: None,
        },
    )
    .unwrap();
}

/// A future date (at least a week out) landing on the given weekday,
/// 0=Sunday, computed in the business timezone.
fn future_date_on(weekday: u8) -> String {
    let today = Utc::now()
        .with_timezone(&chrono_tz::America::Sao_Paulo)
        .date_naive();
    let mut date = today + Duration::days(7);
    while date.weekday().num_days_from_sunday() as u8 != weekday {
        date = date.succ_opt().unwrap();
    }
    date.format("%Y-%m-%d").to_string()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking_body(date: &str, time: &str) -> Value {
    json!({
        "client_name": "Maria",
        "client_phone": "5511988887777",
        "professional_id": "pro-1",
        "service_id": "svc-1",
        "date": date,
        "time": time,
    })
}

// ── Tests ──

#[tokio::test]
async fn test_health() {
    let app = handlers::router(test_state());
    let response = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_booking_end_to_end() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state.clone());

    let date = future_date_on(1);
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "confirmed");
    let link = body["whatsapp_url"].as_str().unwrap();
    assert!(link.starts_with("https://wa.me/5511999999999?text="));
    assert!(link.contains("Maria"));

    let response = app
        .oneshot(request(
            "GET",
            "/api/admin/appointments?status=confirmed",
            Some("test-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["time"], "10:00");
}

#[tokio::test]
async fn test_double_booking_conflict() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    let date = future_date_on(1);
    let first = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body = body_json(second).await;
    assert!(body["error"].as_str().unwrap().contains("no longer available"));
}

#[tokio::test]
async fn test_overlapping_booking_conflict() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    let date = future_date_on(1);
    let first = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Different start, same professional, still overlaps 10:00-11:00
    let second = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:30")),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_booking_on_closed_day_rejected() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    // Default business days are Monday through Saturday
    let sunday = future_date_on(0);
    let response = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&sunday, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_in_past_rejected() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    let response = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body("2020-06-15", "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_service_not_offered_rejected() {
    let state = test_state();
    seed(&state);
    {
        let db = state.db.lock().unwrap();
        queries::create_service(
            &db,
            &Service {
                id: "svc-2".to_string(),
                name: "Manicure".to_string(),
                duration_minutes: 45,
                price: 60.0,
                description: None,
                is_active: true,
            },
        )
        .unwrap();
    }
    let app = handlers::router(state);

    let date = future_date_on(1);
    let mut body = booking_body(&date, "10:00");
    body["service_id"] = json!("svc-2");
    let response = app
        .oneshot(request("POST", "/api/bookings", None, Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_requires_client_name() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    let date = future_date_on(1);
    let mut body = booking_body(&date, "10:00");
    body["client_name"] = json!("  ");
    let response = app
        .oneshot(request("POST", "/api/bookings", None, Some(&body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slots_exclude_booked_times() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    let date = future_date_on(1);
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!(
        "/api/availability/slots?professional_id=pro-1&service_id=svc-1&date={date}"
    );
    let response = app
        .oneshot(request("GET", &uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let slots: Vec<&str> = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(!slots.contains(&"10:00"));
    assert!(slots.contains(&"09:00"));
    assert!(slots.contains(&"11:00"));
}

#[tokio::test]
async fn test_availability_dates_skip_sundays() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    // A full month two months out so no date is filtered as past
    let probe = Utc::now()
        .with_timezone(&chrono_tz::America::Sao_Paulo)
        .date_naive()
        + Duration::days(62);
    let uri = format!(
        "/api/availability/dates?professional_id=pro-1&year={}&month={}",
        probe.year(),
        probe.month()
    );
    let response = app
        .oneshot(request("GET", &uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let dates = body["dates"].as_array().unwrap();
    assert!(!dates.is_empty());
    for date in dates {
        let parsed =
            chrono::NaiveDate::parse_from_str(date.as_str().unwrap(), "%Y-%m-%d").unwrap();
        assert_ne!(parsed.weekday().num_days_from_sunday(), 0);
    }
}

#[tokio::test]
async fn test_cancel_is_idempotent_and_reopens_slot() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    let date = future_date_on(1);
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let cancel_uri = format!("/api/admin/appointments/{id}/cancel");
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(request("POST", &cancel_uri, Some("test-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "cancelled");
    }

    // The slot is bookable again
    let response = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_requires_token() {
    let state = test_state();
    let app = handlers::router(state);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/admin/appointments", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request(
            "GET",
            "/api/admin/appointments",
            Some("wrong-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_plan_gate_blocks_admin_mutations() {
    let state = test_state();
    {
        let db = state.db.lock().unwrap();
        queries::save_config_blob(&db, &json!({ "plan_active": false })).unwrap();
    }
    let app = handlers::router(state);

    let payload = json!({
        "name": "Corte",
        "duration_minutes": 60,
        "price": 80.0,
    });
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/services",
            Some("test-token"),
            Some(&payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    // Activation stays open and unblocks the mutation
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/plan/activate",
            Some("test-token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(
            "POST",
            "/api/admin/services",
            Some("test-token"),
            Some(&payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_plan_gate_never_blocks_public_booking() {
    let state = test_state();
    seed(&state);
    {
        let db = state.db.lock().unwrap();
        queries::save_config_blob(&db, &json!({ "plan_active": false })).unwrap();
    }
    let app = handlers::router(state);

    let date = future_date_on(1);
    let response = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_service_crud_and_public_filtering() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state.clone());

    // Deactivate the service through the admin API
    let payload = json!({
        "name": "Corte",
        "duration_minutes": 60,
        "price": 80.0,
        "is_active": false,
    });
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/admin/services/svc-1",
            Some("test-token"),
            Some(&payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Gone from the public listing for the professional
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/professionals/pro-1/services",
            None,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.as_array().unwrap().is_empty());

    // And no longer bookable
    let date = future_date_on(1);
    let response = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inactive_professional_hidden_and_unbookable() {
    let state = test_state();
    seed(&state);
    {
        let db = state.db.lock().unwrap();
        let mut pro = queries::get_professional(&db, "pro-1").unwrap().unwrap();
        pro.is_active = false;
        queries::update_professional(&db, &pro).unwrap();
    }
    let app = handlers::router(state);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/professionals", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.as_array().unwrap().is_empty());

    let date = future_date_on(1);
    let response = app
        .oneshot(request(
            "POST",
            "/api/bookings",
            None,
            Some(&booking_body(&date, "10:00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_update_merges_partial() {
    let state = test_state();
    let app = handlers::router(state);

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/admin/config",
            Some("test-token"),
            Some(&json!({ "hours": { "open": "08:00" } })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["hours"]["open"], "08:00");
    // Untouched fields keep their defaults
    assert_eq!(body["hours"]["close"], "19:00");
    assert_eq!(body["name"], "Studio Bella");

    // Public config endpoint reflects the change
    let response = app
        .oneshot(request("GET", "/api/config", None, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["hours"]["open"], "08:00");
}

#[tokio::test]
async fn test_professional_payload_rejects_unknown_service() {
    let state = test_state();
    seed(&state);
    let app = handlers::router(state);

    let payload = json!({
        "name": "Bia Lima",
        "specialty": "Manicure",
        "service_ids": ["no-such-service"],
        "work_hours_start": "09:00",
        "work_hours_end": "17:00",
    });
    let response = app
        .oneshot(request(
            "POST",
            "/api/admin/professionals",
            Some("test-token"),
            Some(&payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
