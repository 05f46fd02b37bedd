// --- File: crates/slotify_availability/src/logic.rs ---
use crate::hours::{OperatingHours, TimeRange};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use slotify_common::services::{BoxedError, BusyInterval, CalendarService};
use slotify_db::repositories::{Business, BusinessRepository, ServiceOfferingRepository};
use slotify_db::DbError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Successive slot starts are always this far apart, independent of the
/// service duration. Offered slots may therefore overlap when the duration
/// exceeds the step; that maximizes availability visibility and is a policy
/// choice, not a bug.
pub const SLOT_STEP_MINUTES: i64 = 30;
/// Hard cap on a generated slot list.
pub const MAX_SLOTS: usize = 20;
/// Default search window when no bounds are supplied.
pub const DEFAULT_WINDOW_DAYS: i64 = 14;
/// Duration assumed when neither the request nor a service supplies one.
pub const DEFAULT_DURATION_MIN: i64 = 60;

// --- Error Handling ---
#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<AvailabilityError> for slotify_common::SlotifyError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::NotFound(msg) => slotify_common::SlotifyError::NotFound(msg),
            AvailabilityError::Database(e) => e.into(),
        }
    }
}

// --- Data Structures ---

/// Morning/afternoon filter supplied per customer. Either flag, both or
/// neither may be set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimePreferences {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub afternoon: bool,
}

/// Inputs for one slot computation.
#[derive(Debug, Clone, Default)]
pub struct SlotRequest {
    pub business_id: String,
    pub service_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_min: Option<i64>,
    pub preferences: TimePreferences,
}

/// A derived, ephemeral candidate appointment window. Never persisted;
/// regenerated on every query. The id (`YYYY-MM-DD-HHMM`, business-local
/// wall clock) is the only handle that survives a conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Slot {
    #[cfg_attr(feature = "openapi", schema(example = "2026-02-10-1000"))]
    pub id: String,
    #[cfg_attr(feature = "openapi", schema(example = "2026-02-10"))]
    pub date: String,
    #[cfg_attr(feature = "openapi", schema(example = "Tuesday"))]
    pub day: String,
    #[cfg_attr(feature = "openapi", schema(example = "10:00 AM"))]
    pub time: String,
    pub start_at: DateTime<Utc>,
    #[cfg_attr(feature = "openapi", schema(example = 60))]
    pub duration_min: i64,
}

/// A computed slot list plus whether the busy-interval source was
/// unavailable. A degraded result is computed as if the calendar were open;
/// callers log or surface the flag so sustained outages stay observable.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SlotComputation {
    pub slots: Vec<Slot>,
    pub degraded: bool,
}

// --- Slot identity ---

/// Compact slot identifier from a business-local start time.
fn slot_id(start_local: &DateTime<Tz>) -> String {
    start_local.format("%Y-%m-%d-%H%M").to_string()
}

/// Reconstructs a UTC start instant from a `YYYY-MM-DD-HHMM` slot id in the
/// given business timezone. Returns `None` for malformed ids.
pub fn parse_slot_id(id: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let (date_part, time_part) = id.rsplit_once('-')?;
    if time_part.len() != 4 || !time_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let hour: u32 = time_part[..2].parse().ok()?;
    let minute: u32 = time_part[2..].parse().ok()?;
    let time = chrono::NaiveTime::from_hms_opt(hour, minute, 0)?;
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// The timezone a business computes wall-clock slots in.
pub fn business_timezone(business: &Business, default: Tz) -> Tz {
    business
        .timezone
        .as_deref()
        .and_then(|name| name.parse().ok())
        .unwrap_or(default)
}

// --- Availability Logic ---

/// Calculates bookable slots for a date window.
///
/// Pure and deterministic: two calls with identical inputs (including `now`)
/// yield identical ordered lists, which is what lets a numeric reply resolve
/// against a regenerated list. Days and times are walked in increasing
/// order, so the output is chronological by construction.
#[allow(clippy::too_many_arguments)]
pub fn compute_slots(
    hours: &OperatingHours,
    tz: Tz,
    now: DateTime<Utc>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    duration_min: i64,
    busy: &[BusyInterval],
    prefs: &TimePreferences,
) -> Vec<Slot> {
    let duration = Duration::minutes(duration_min);
    if duration <= Duration::zero() {
        return Vec::new();
    }

    let window_end_local = window_end.with_timezone(&tz).naive_local();
    let mut day = window_start.with_timezone(&tz).date_naive();
    let mut slots = Vec::new();

    // Walk whole calendar days while the day's local midnight is inside the
    // window.
    while day.and_hms_opt(0, 0, 0).expect("midnight is always valid") < window_end_local {
        let ranges = hours.ranges_for(day.weekday());
        if ranges.is_empty() {
            // Closed day
            day += Duration::days(1);
            continue;
        }

        for raw_range in ranges {
            let Some(TimeRange { open, close }) = TimeRange::parse(raw_range) else {
                debug!("Skipping malformed operating-hours range '{}'", raw_range);
                continue;
            };
            let close = day.and_time(close);
            let mut cursor = day.and_time(open);

            // A candidate must fit entirely before the range closes; a
            // duration spanning the whole range yields exactly the opening
            // slot.
            while cursor + duration <= close {
                if let Some(start_local) = tz.from_local_datetime(&cursor).earliest() {
                    let start = start_local.with_timezone(&Utc);
                    let end = start + duration;

                    // Three independent busy checks: start inside a busy
                    // block, end inside a busy block, or candidate containing
                    // a busy block. Exact boundary touches pass all three.
                    let conflicts = busy.iter().any(|block| {
                        (start > block.start && start < block.end)
                            || (end > block.start && end < block.end)
                            || (start < block.start && end > block.end)
                    });

                    let is_past = start < now;

                    let hour = start_local.hour();
                    let matches_preference =
                        (!prefs.morning || hour < 12) && (!prefs.afternoon || hour >= 12);

                    if !conflicts && !is_past && matches_preference {
                        slots.push(Slot {
                            id: slot_id(&start_local),
                            date: day.format("%Y-%m-%d").to_string(),
                            day: day.format("%A").to_string(),
                            time: start_local.format("%-I:%M %p").to_string(),
                            start_at: start,
                            duration_min,
                        });
                    }
                }
                cursor += Duration::minutes(SLOT_STEP_MINUTES);
            }
        }

        day += Duration::days(1);
    }

    slots.truncate(MAX_SLOTS);
    slots
}

/// Slot computation wired to its collaborators: the business record for
/// hours/timezone/calendar-id, the service catalog for durations, and the
/// external calendar for busy intervals.
pub struct Availability {
    businesses: Arc<dyn BusinessRepository>,
    services: Arc<dyn ServiceOfferingRepository>,
    calendar: Option<Arc<dyn CalendarService<Error = BoxedError>>>,
    default_timezone: Tz,
}

impl Availability {
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        services: Arc<dyn ServiceOfferingRepository>,
        calendar: Option<Arc<dyn CalendarService<Error = BoxedError>>>,
        default_timezone: Tz,
    ) -> Self {
        Self {
            businesses,
            services,
            calendar,
            default_timezone,
        }
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    /// Computes the ordered, capped slot list for a request.
    ///
    /// Fails with `NotFound` when the business record is absent. A failing
    /// busy-interval lookup is swallowed: generation proceeds as if no busy
    /// intervals existed and the result is flagged degraded.
    pub async fn get_available_slots(
        &self,
        request: &SlotRequest,
    ) -> Result<SlotComputation, AvailabilityError> {
        let business = self
            .businesses
            .find_by_id(&request.business_id)
            .await?
            .ok_or_else(|| {
                AvailabilityError::NotFound(format!("business {}", request.business_id))
            })?;

        let hours = business
            .operating_hours
            .as_ref()
            .and_then(OperatingHours::parse)
            .unwrap_or_else(OperatingHours::default_schedule);
        let tz = business_timezone(&business, self.default_timezone);

        let now = Utc::now();
        let start = request.start.unwrap_or(now);
        let end = request
            .end
            .unwrap_or(start + Duration::days(DEFAULT_WINDOW_DAYS));

        let duration_min = match request.duration_min {
            Some(duration) => duration,
            None => match &request.service_id {
                Some(service_id) => self
                    .services
                    .find_by_id(service_id)
                    .await?
                    .map(|service| service.duration_min)
                    .unwrap_or(DEFAULT_DURATION_MIN),
                None => DEFAULT_DURATION_MIN,
            },
        };

        let mut degraded = false;
        let busy = match (&self.calendar, &business.calendar_id) {
            (Some(calendar), Some(calendar_id)) => {
                match calendar.busy_intervals(calendar_id, start, end).await {
                    Ok(intervals) => intervals,
                    Err(err) => {
                        warn!(
                            "Busy-interval lookup failed for business {}: {}; \
                             continuing with an open calendar",
                            business.id, err
                        );
                        degraded = true;
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };

        let slots = compute_slots(
            &hours,
            tz,
            now,
            start,
            end,
            duration_min,
            &busy,
            &request.preferences,
        );

        Ok(SlotComputation { slots, degraded })
    }
}
