// --- File: crates/slotify_availability/src/handlers.rs ---
use crate::logic::{Availability, SlotComputation, SlotRequest, TimePreferences};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use slotify_common::{invalid_input, SlotifyError};
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AvailabilityQuery {
    pub business_id: String,

    pub service_id: Option<String>,

    /// Start date in YYYY-MM-DD format; defaults to now
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2026-02-10"))]
    pub start_date: Option<String>,

    /// End date in YYYY-MM-DD format; defaults to start + 14 days
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2026-02-24"))]
    pub end_date: Option<String>,

    /// Duration in minutes; defaults to the service duration
    #[cfg_attr(feature = "openapi", schema(example = 60))]
    pub duration_minutes: Option<i64>,

    pub morning: Option<bool>,
    pub afternoon: Option<bool>,
}

fn parse_date(
    raw: &Option<String>,
    field: &str,
    end_of_day: bool,
) -> Result<Option<chrono::DateTime<Utc>>, SlotifyError> {
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

/// Handler to get available time slots.
#[axum::debug_handler]
pub async fn get_availability_handler(
    State(availability): State<Arc<Availability>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<SlotComputation>, SlotifyError> {
    let start = parse_date(&query.start_date, "start_date", false)?;
    let end = parse_date(&query.end_date, "end_date", true)?;
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(invalid_input("end_date must be after start_date"));
        }
    }

    let request = SlotRequest {
        business_id: query.business_id,
        service_id: query.service_id,
        start,
        end,
        duration_min: query.duration_minutes,
        preferences: TimePreferences {
            morning: query.morning.unwrap_or(false),
            afternoon: query.afternoon.unwrap_or(false),
        },
    };

    let computation = availability.get_available_slots(&request).await?;
    if computation.degraded {
        warn!(
            "Returning degraded availability for business {}",
            request.business_id
        );
    }
    Ok(Json(computation))
}
