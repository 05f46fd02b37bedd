// --- File: crates/slotify_reminders/src/scheduler.rs ---
//! In-process delayed-task scheduler.
//!
//! The durable host runner is a collaborator seam; this implementation
//! covers single-process deployments by parking a tokio task until the wake
//! instant. Wake intents do not survive a restart - rescheduling on boot is
//! the host runner's job.

use crate::logic::ReminderEngine;
use chrono::Utc;
use slotify_common::services::{DelayScheduler, InfallibleFuture, ScheduledEvent};
use std::sync::Arc;
use tracing::{debug, error};

/// Scheduler that sleeps in-process and invokes the delivery handler.
pub struct TokioDelayScheduler {
    engine: Arc<ReminderEngine>,
}

impl TokioDelayScheduler {
    /// `engine` is the delivery-side engine; it is constructed with a
    /// [`NoopScheduler`] since delivery never schedules further work.
    pub fn new(engine: Arc<ReminderEngine>) -> Self {
        Self { engine }
    }
}

impl DelayScheduler for TokioDelayScheduler {
    fn schedule(&self, event: ScheduledEvent) -> InfallibleFuture<'_, ()> {
        let engine = self.engine.clone();
        Box::pin(async move {
            let delay = (event.wake_at - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            debug!(
                "Parking {} for reminder {} ({:?} from now)",
                event.name, event.reminder_id, delay
            );
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(err) = engine.deliver_reminder(&event.reminder_id).await {
                    error!(
                        "Reminder delivery failed for {}: {}",
                        event.reminder_id, err
                    );
                }
            });
        })
    }
}

/// Scheduler that drops every request. Used on the delivery side of
/// [`TokioDelayScheduler`] and in tests that assert on rows alone.
#[derive(Debug, Default)]
pub struct NoopScheduler;

impl DelayScheduler for NoopScheduler {
    fn schedule(&self, _event: ScheduledEvent) -> InfallibleFuture<'_, ()> {
        Box::pin(async {})
    }
}
