// --- File: crates/slotify_reminders/src/logic.rs ---
//! Reminder scheduling and delivery.
//!
//! Reminders fire 24 hours and 1 hour before an appointment starts. Each row
//! carries its rendered message so delivery needs no further joins; the
//! delayed wake-up itself is owned by the [`DelayScheduler`] collaborator,
//! which guarantees at-least-once delivery - the handler's status checks
//! make redelivery a no-op.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use slotify_common::services::{DelayScheduler, MessagingService, ScheduledEvent};
use slotify_db::repositories::{
    Appointment, AppointmentRepository, Business, BusinessRepository, Reminder, ReminderKind,
    ReminderRepository, ReminderStatus,
};
use slotify_db::DbError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Event name handed to the delayed-task scheduler.
pub const REMINDER_EVENT: &str = "appointment/reminder.send";

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<ReminderError> for slotify_common::SlotifyError {
    fn from(err: ReminderError) -> Self {
        match err {
            ReminderError::NotFound(msg) => slotify_common::SlotifyError::NotFound(msg),
            ReminderError::Database(e) => e.into(),
        }
    }
}

/// Reminder scheduling and delivery wired to its collaborators.
pub struct ReminderEngine {
    businesses: Arc<dyn BusinessRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    reminders: Arc<dyn ReminderRepository>,
    messenger: Arc<dyn MessagingService>,
    scheduler: Arc<dyn DelayScheduler>,
    default_timezone: Tz,
}

impl ReminderEngine {
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        reminders: Arc<dyn ReminderRepository>,
        messenger: Arc<dyn MessagingService>,
        scheduler: Arc<dyn DelayScheduler>,
        default_timezone: Tz,
    ) -> Self {
        Self {
            businesses,
            appointments,
            reminders,
            messenger,
            scheduler,
            default_timezone,
        }
    }

    /// Schedules the 24h and 1h reminders for an appointment.
    ///
    /// For each offset still in the future, a `pending` reminder row with a
    /// pre-rendered message is inserted and a delayed-delivery request is
    /// emitted. Offsets already in the past are silently skipped; a booking
    /// made less than an hour out gets no reminders at all.
    pub async fn schedule_reminders(
        &self,
        appointment_id: &str,
    ) -> Result<Vec<Reminder>, ReminderError> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| ReminderError::NotFound(format!("appointment {}", appointment_id)))?;
        let tz = self.timezone_for(&appointment).await;

        let now = Utc::now();
        let offsets = [
            (ReminderKind::DayBefore, Duration::hours(24)),
            (ReminderKind::HourBefore, Duration::hours(1)),
        ];

        let mut created = Vec::new();
        for (kind, offset) in offsets {
            let scheduled_at = appointment.start_at - offset;
            if scheduled_at <= now {
                debug!(
                    "Skipping {} reminder for appointment {}: offset already past",
                    kind.as_str(),
                    appointment_id
                );
                continue;
            }

            let reminder = self
                .reminders
                .insert(Reminder {
                    id: uuid::Uuid::new_v4().to_string(),
                    business_id: appointment.business_id.clone(),
                    appointment_id: appointment_id.to_string(),
                    kind,
                    scheduled_at,
                    message: stored_message(kind, &appointment, tz),
                    status: ReminderStatus::Pending,
                    sent_at: None,
                })
                .await?;

            self.scheduler
                .schedule(ScheduledEvent {
                    name: REMINDER_EVENT.to_string(),
                    reminder_id: reminder.id.clone(),
                    wake_at: scheduled_at,
                })
                .await;

            created.push(reminder);
        }

        info!(
            "Scheduled {} reminder(s) for appointment {}",
            created.len(),
            appointment_id
        );
        Ok(created)
    }

    /// Delivery handler, triggered at or after the scheduled instant.
    ///
    /// Aborts with no side effect when the reminder is no longer pending
    /// (redelivery) or the appointment has reached a terminal state.
    /// Delivery failure marks the reminder `failed` and is NOT retried.
    pub async fn deliver_reminder(&self, reminder_id: &str) -> Result<(), ReminderError> {
        let Some(reminder) = self.reminders.find_by_id(reminder_id).await? else {
            warn!("Reminder {} no longer exists, dropping delivery", reminder_id);
            return Ok(());
        };
        if reminder.status != ReminderStatus::Pending {
            debug!(
                "Reminder {} already {}, dropping delivery",
                reminder_id,
                reminder.status.as_str()
            );
            return Ok(());
        }

        let Some(appointment) = self.appointments.find_by_id(&reminder.appointment_id).await?
        else {
            warn!(
                "Appointment {} for reminder {} not found, dropping delivery",
                reminder.appointment_id, reminder_id
            );
            return Ok(());
        };
        if appointment.status.is_terminal() {
            debug!(
                "Appointment {} is {}, suppressing reminder {}",
                appointment.id,
                appointment.status.as_str(),
                reminder_id
            );
            return Ok(());
        }

        let message = if reminder.message.is_empty() {
            let tz = self.timezone_for(&appointment).await;
            default_message(reminder.kind, &appointment, tz)
        } else {
            reminder.message.clone()
        };

        let delivered = self
            .messenger
            .send_text(&appointment.customer_phone, &message)
            .await;

        let (status, sent_at) = if delivered {
            (ReminderStatus::Sent, Some(Utc::now()))
        } else {
            (ReminderStatus::Failed, None)
        };
        self.reminders
            .mark_status(&reminder.id, status, sent_at)
            .await?;

        info!(
            "Reminder {} for appointment {} marked {}",
            reminder_id,
            appointment.id,
            status.as_str()
        );
        Ok(())
    }

    /// Bulk-transitions all pending reminders for an appointment to
    /// cancelled. Idempotent.
    pub async fn cancel_reminders(&self, appointment_id: &str) -> Result<u64, ReminderError> {
        let cancelled = self.reminders.cancel_pending(appointment_id).await?;
        if cancelled > 0 {
            info!(
                "Cancelled {} pending reminder(s) for appointment {}",
                cancelled, appointment_id
            );
        }
        Ok(cancelled)
    }

    async fn timezone_for(&self, appointment: &Appointment) -> Tz {
        match self.businesses.find_by_id(&appointment.business_id).await {
            Ok(Some(business)) => timezone_of(&business, self.default_timezone),
            _ => self.default_timezone,
        }
    }
}

fn timezone_of(business: &Business, default: Tz) -> Tz {
    business
        .timezone
        .as_deref()
        .and_then(|name| name.parse().ok())
        .unwrap_or(default)
}

fn time_label(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%-I:%M %p").to_string()
}

/// The message stored on the reminder row at scheduling time.
fn stored_message(kind: ReminderKind, appointment: &Appointment, tz: Tz) -> String {
    let name = if appointment.customer_name.is_empty() {
        "there"
    } else {
        &appointment.customer_name
    };
    match kind {
        ReminderKind::DayBefore => format!(
            "Hi {}! Reminder: Your {} is tomorrow at {}. See you then!",
            name,
            appointment.service_name,
            time_label(appointment.start_at, tz)
        ),
        ReminderKind::HourBefore => format!(
            "See you in 1 hour! Your {} is at {}.",
            appointment.service_name,
            time_label(appointment.start_at, tz)
        ),
    }
}

/// Fallback message regenerated when a reminder row carries no text.
fn default_message(kind: ReminderKind, appointment: &Appointment, tz: Tz) -> String {
    match kind {
        ReminderKind::DayBefore => {
            let name = if appointment.customer_name.is_empty() {
                "there"
            } else {
                &appointment.customer_name
            };
            let when = appointment
                .start_at
                .with_timezone(&tz)
                .format("%A, %B %-d at %-I:%M %p");
            format!(
                "Hi {}!\n\nJust a friendly reminder: Your {} is tomorrow.\n\n{}\n\nSee you then!",
                name, appointment.service_name, when
            )
        }
        ReminderKind::HourBefore => format!(
            "See you in 1 hour!\n\nYour {} is at {}.\n\nReply if you need to reschedule.",
            appointment.service_name,
            time_label(appointment.start_at, tz)
        ),
    }
}
