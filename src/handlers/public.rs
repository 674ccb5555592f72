use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::load_config;
use crate::models::{Appointment, AppointmentStatus, Professional, Service, StoreConfig};
use crate::services::availability::{self, AvailabilityError, DayRules};
use crate::services::booking::{self, BookingFlow, FlowError};
use crate::services::timeutil;
use crate::state::AppState;

// GET /api/config
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<StoreConfig> {
    Json(load_config(&state))
}

// GET /api/professionals
pub async fn list_professionals(State(state): State<Arc<AppState>>) -> Json<Vec<Professional>> {
    let professionals = {
        let db = state.db.lock().unwrap();
        queries::list_professionals(&db, true).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to list professionals, degrading to empty");
            vec![]
        })
    };
    Json(professionals)
}

// GET /api/professionals/:id/services
pub async fn professional_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db.lock().unwrap();
    let professional = queries::get_professional(&db, &id)?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("professional {id}")))?;

    let services = queries::list_services(&db, true).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to list services, degrading to empty");
        vec![]
    });

    // Empty here is fine; the booking flow lets the client go back and
    // pick someone else.
    Ok(Json(
        services
            .into_iter()
            .filter(|s| professional.offers(&s.id))
            .collect(),
    ))
}

// GET /api/availability/dates
#[derive(Deserialize)]
pub struct DatesQuery {
    pub professional_id: String,
    pub year: i32,
    pub month: u32,
}

#[derive(Serialize)]
pub struct DatesResponse {
    dates: Vec<String>,
}

pub async fn availability_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DatesQuery>,
) -> Result<Json<DatesResponse>, AppError> {
    if query.month < 1 || query.month > 12 {
        return Err(AppError::Validation(format!("invalid month: {}", query.month)));
    }

    let config = load_config(&state);
    let professional = {
        let db = state.db.lock().unwrap();
        queries::get_professional(&db, &query.professional_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound(format!("professional {}", query.professional_id)))?
    };

    let rules = DayRules {
        today: timeutil::today(state.config.timezone),
        hours: &config.hours,
        blocked_dates: &[],
    };

    let dates = rules
        .eligible_dates_in_month(query.year, query.month, &professional)
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();

    Ok(Json(DatesResponse { dates }))
}

// GET /api/availability/slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub professional_id: String,
    pub service_id: String,
    pub date: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    slots: Vec<String>,
}

pub async fn availability_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let date = timeutil::parse_date(&query.date)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (professional, service, booked) = {
        let db = state.db.lock().unwrap();
        let professional = queries::get_professional(&db, &query.professional_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound(format!("professional {}", query.professional_id)))?;
        let service = queries::get_service(&db, &query.service_id)?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::NotFound(format!("service {}", query.service_id)))?;
        let booked = queries::get_booked_intervals(&db, &professional.id, date)?;
        (professional, service, booked)
    };

    if !professional.offers(&service.id) {
        return Err(AppError::Validation(
            "professional does not offer that service".to_string(),
        ));
    }

    let slots = availability::available_slots(
        &professional,
        service.duration_minutes,
        date,
        timeutil::today(state.config.timezone),
        timeutil::now_time(state.config.timezone),
        &booked,
    )?
    .iter()
    .map(|t| t.format("%H:%M").to_string())
    .collect();

    Ok(Json(SlotsResponse { slots }))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub client_name: String,
    pub client_phone: String,
    pub professional_id: String,
    pub service_id: String,
    /// YYYY-MM-DD, business-timezone civil date.
    pub date: String,
    /// HH:MM local time-of-day.
    pub time: String,
}

#[derive(Serialize)]
pub struct CreateBookingResponse {
    pub id: String,
    pub status: String,
    pub date: String,
    pub time: String,
    pub whatsapp_url: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<CreateBookingResponse>, AppError> {
    let config = load_config(&state);
    let date = timeutil::parse_date(&req.date)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let time = timeutil::parse_time(&req.time)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (professional, service, booked) = {
        let db = state.db.lock().unwrap();
        let professional = queries::get_professional(&db, &req.professional_id)?
            .ok_or_else(|| AppError::NotFound(format!("professional {}", req.professional_id)))?;
        let service = queries::get_service(&db, &req.service_id)?
            .ok_or_else(|| AppError::NotFound(format!("service {}", req.service_id)))?;
        let booked = queries::get_booked_intervals(&db, &professional.id, date)?;
        (professional, service, booked)
    };

    let rules = DayRules {
        today: timeutil::today(state.config.timezone),
        hours: &config.hours,
        blocked_dates: &[],
    };
    let now = timeutil::now_time(state.config.timezone);

    // Replay the selection through the flow so every guard that protects
    // the interactive steps also protects direct API calls.
    let mut flow = BookingFlow::new();
    flow.select_professional(professional.clone()).map_err(flow_error)?;
    flow.select_service(service.clone()).map_err(flow_error)?;
    flow.select_date(date, &rules).map_err(flow_error)?;
    flow.select_time(time).map_err(flow_error)?;
    flow.continue_to_confirm().map_err(flow_error)?;
    flow.set_client_details(&req.client_name, &req.client_phone);
    let request = flow.submit().map_err(flow_error)?;

    availability::check_bookable(
        &rules,
        &professional,
        service.duration_minutes,
        date,
        time,
        now,
        &booked,
    )
    .map_err(|e| match e {
        AvailabilityError::SlotTaken => AppError::Conflict,
        other => AppError::Validation(other.to_string()),
    })?;

    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        client_id: "guest".to_string(),
        client_name: request.client_name,
        client_phone: request.client_phone,
        professional_id: request.professional_id,
        service_id: request.service_id,
        date,
        time,
        timestamp_utc: timeutil::to_utc_instant(date, time, state.config.timezone)?,
        status: AppointmentStatus::Confirmed,
        created_at: Utc::now(),
    };

    // A failed write keeps the flow at the confirmation step; the client
    // may retry. The unique index losing race surfaces as a conflict.
    {
        let db = state.db.lock().unwrap();
        queries::create_appointment(&db, &appointment).map_err(|e| {
            if queries::is_unique_violation(&e) {
                AppError::Conflict
            } else {
                AppError::Internal(e)
            }
        })?;
    }
    flow.complete();

    let message = booking::confirmation_message(
        &config.name,
        &appointment.client_name,
        &service.name,
        &professional.name,
        date,
        time,
    );
    let whatsapp_url = booking::whatsapp_link(&config.contact.phone, &message);

    tracing::info!(
        appointment_id = %appointment.id,
        professional_id = %professional.id,
        date = %req.date,
        time = %req.time,
        "appointment created"
    );

    Ok(Json(CreateBookingResponse {
        id: appointment.id,
        status: appointment.status.as_str().to_string(),
        date: req.date,
        time: req.time,
        whatsapp_url,
    }))
}

fn flow_error(err: FlowError) -> AppError {
    AppError::Validation(err.to_string())
}
