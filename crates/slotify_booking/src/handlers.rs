// --- File: crates/slotify_booking/src/handlers.rs ---
use crate::logic::{BookingManager, CreateBookingRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use slotify_common::{invalid_input, SlotifyError};
use slotify_db::repositories::{Appointment, AppointmentFilter, AppointmentStatus};
use slotify_reminders::ReminderEngine;
use std::sync::Arc;

// Shared state for the appointment handlers
#[derive(Clone)]
pub struct AppointmentsState {
    pub manager: Arc<BookingManager>,
    pub reminders: Arc<ReminderEngine>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ListAppointmentsQuery {
    pub business_id: String,
    pub customer_phone: Option<String>,
    pub status: Option<String>,
    /// YYYY-MM-DD, inclusive lower bound on the start time
    pub start_date: Option<String>,
    /// YYYY-MM-DD, inclusive upper bound on the start time
    pub end_date: Option<String>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateAppointmentPayload {
    pub business_id: String,
    pub service_id: String,
    pub customer_phone: String,
    pub customer_name: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "2026-02-10-1000"))]
    pub slot_id: String,
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct CancelAppointmentQuery {
    pub business_id: String,
}

fn parse_bound(raw: &Option<String>, field: &str, end_of_day: bool) -> Result<Option<chrono::DateTime<Utc>>, SlotifyError> {
    let Some(raw) = raw else { return Ok(None) };
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| invalid_input(format!("Invalid {} format (YYYY-MM-DD)", field)))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .expect("hard-coded wall clock is valid");
    Ok(Some(Utc.from_utc_datetime(&time)))
}

/// Handler to list appointments for a business.
#[axum::debug_handler]
pub async fn list_appointments_handler(
    State(state): State<AppointmentsState>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, SlotifyError> {
    let status = match &query.status {
        Some(raw) => Some(
            AppointmentStatus::parse(raw)
                .ok_or_else(|| invalid_input(format!("unknown status '{}'", raw)))?,
        ),
        None => None,
    };

    let filter = AppointmentFilter {
        phone: query.customer_phone,
        status,
        starting_after: parse_bound(&query.start_date, "start_date", false)?,
        starting_before: parse_bound(&query.end_date, "end_date", true)?,
    };

    let appointments = state.manager.list_appointments(&query.business_id, filter).await?;
    Ok(Json(appointments))
}

/// Handler to create an appointment and schedule its reminders.
#[axum::debug_handler]
pub async fn create_appointment_handler(
    State(state): State<AppointmentsState>,
    Json(payload): Json<CreateAppointmentPayload>,
) -> Result<(StatusCode, Json<Appointment>), SlotifyError> {
    let mut missing = Vec::new();
    for (value, field) in [
        (&payload.business_id, "business_id"),
        (&payload.service_id, "service_id"),
        (&payload.customer_phone, "customer_phone"),
        (&payload.slot_id, "slot_id"),
    ] {
        if value.trim().is_empty() {
            missing.push(field);
        }
    }
    if !missing.is_empty() {
        return Err(invalid_input(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let appointment = state
        .manager
        .create_booking(CreateBookingRequest {
            business_id: payload.business_id,
            service_id: payload.service_id,
            customer_phone: payload.customer_phone,
            customer_name: payload.customer_name,
            slot_id: payload.slot_id,
            notes: payload.notes,
        })
        .await?;

    state.reminders.schedule_reminders(&appointment.id).await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Handler to cancel an appointment, scoped by business ownership.
#[axum::debug_handler]
pub async fn cancel_appointment_handler(
    State(state): State<AppointmentsState>,
    Path(appointment_id): Path<String>,
    Query(query): Query<CancelAppointmentQuery>,
) -> Result<Json<Appointment>, SlotifyError> {
    let appointment = state
        .manager
        .cancel_booking(&appointment_id, &query.business_id)
        .await?;
    Ok(Json(appointment))
}
