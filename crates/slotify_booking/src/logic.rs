// --- File: crates/slotify_booking/src/logic.rs ---
//! Booking lifecycle: create, cancel, query.
//!
//! Creation decodes the ephemeral slot id back into a start instant and
//! snapshots the service's canonical duration and price. There is NO
//! re-validation that the slot is still free at creation time: availability
//! is derived, not reserved, so two customers confirming the same computed
//! slot both succeed. Closing that race needs a uniqueness constraint on
//! (business, start) plus a fresh busy-interval check mapped to
//! `ConflictRisk`.

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use slotify_availability::{business_timezone, parse_slot_id};
use slotify_db::repositories::{
    Appointment, AppointmentRepository, AppointmentStatus, BusinessRepository, CustomerRepository,
    ReminderRepository, ServiceOfferingRepository,
};
use slotify_db::DbError;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

// --- Error Handling ---
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<BookingError> for slotify_common::SlotifyError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(msg) => slotify_common::SlotifyError::NotFound(msg),
            BookingError::InvalidInput(msg) => slotify_common::SlotifyError::InvalidInput(msg),
            BookingError::Database(e) => e.into(),
        }
    }
}

// --- Data Structures ---
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub business_id: String,
    pub service_id: String,
    pub customer_phone: String,
    pub customer_name: Option<String>,
    /// Slot id as offered: `YYYY-MM-DD-HHMM` in the business timezone.
    pub slot_id: String,
    pub notes: Option<String>,
}

/// Appointment lifecycle operations wired to the persistence collaborators.
pub struct BookingManager {
    businesses: Arc<dyn BusinessRepository>,
    services: Arc<dyn ServiceOfferingRepository>,
    customers: Arc<dyn CustomerRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    reminders: Arc<dyn ReminderRepository>,
    default_timezone: Tz,
}

impl BookingManager {
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        services: Arc<dyn ServiceOfferingRepository>,
        customers: Arc<dyn CustomerRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        reminders: Arc<dyn ReminderRepository>,
        default_timezone: Tz,
    ) -> Self {
        Self {
            businesses,
            services,
            customers,
            appointments,
            reminders,
            default_timezone,
        }
    }

    /// Creates a `pending` appointment from an offered slot.
    ///
    /// Upserts the customer (incrementing the lifetime booking counter) and
    /// denormalizes customer and service names onto the row. Fails with
    /// `NotFound` when the service does not exist and `InvalidInput` when
    /// the slot id does not decode.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<Appointment, BookingError> {
        let business = self
            .businesses
            .find_by_id(&request.business_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("business {}", request.business_id)))?;
        let tz = business_timezone(&business, self.default_timezone);

        let start_at = parse_slot_id(&request.slot_id, tz).ok_or_else(|| {
            BookingError::InvalidInput(format!("malformed slot id '{}'", request.slot_id))
        })?;

        let service = self
            .services
            .find_by_id(&request.service_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("service {}", request.service_id)))?;

        let customer = self
            .customers
            .record_booking(
                &request.business_id,
                &request.customer_phone,
                request.customer_name.as_deref(),
            )
            .await?;

        let customer_name = request
            .customer_name
            .or_else(|| customer.name.clone())
            .unwrap_or_else(|| "Customer".to_string());

        let appointment = self
            .appointments
            .insert(Appointment {
                id: uuid::Uuid::new_v4().to_string(),
                business_id: request.business_id,
                customer_id: customer.id,
                service_id: service.id.clone(),
                customer_name,
                customer_phone: request.customer_phone,
                service_name: service.name.clone(),
                start_at,
                end_at: start_at + Duration::minutes(service.duration_min),
                price_cents: service.price_cents,
                status: AppointmentStatus::Pending,
                notes: request.notes,
            })
            .await?;

        info!(
            "Created appointment {} for {} at {}",
            appointment.id, appointment.customer_phone, appointment.start_at
        );
        Ok(appointment)
    }

    /// Cancels an appointment, scoped by business ownership, and cascades
    /// the cancellation to its still-pending reminders.
    ///
    /// Fails with `NotFound` when the (id, business_id) pair matches no row,
    /// which is what prevents cross-tenant cancellation.
    pub async fn cancel_booking(
        &self,
        appointment_id: &str,
        business_id: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self
            .appointments
            .mark_cancelled(appointment_id, business_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("appointment {}", appointment_id)))?;

        let cancelled = self.reminders.cancel_pending(appointment_id).await?;
        info!(
            "Cancelled appointment {} ({} pending reminder(s) cancelled)",
            appointment_id, cancelled
        );
        Ok(appointment)
    }

    /// Filtered listing for the admin surface, ascending by start time.
    pub async fn list_appointments(
        &self,
        business_id: &str,
        filter: slotify_db::repositories::AppointmentFilter,
    ) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.appointments.list(business_id, filter).await?)
    }

    /// Future, non-terminal appointments for a customer, ascending by start
    /// time.
    pub async fn customer_appointments(
        &self,
        business_id: &str,
        phone: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        Ok(self
            .appointments
            .upcoming_for_phone(business_id, phone, Utc::now())
            .await?)
    }
}
