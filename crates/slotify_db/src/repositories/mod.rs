//! Repository traits and SQL implementations
//!
//! One module per entity. Each module defines the entity struct, an
//! object-safe repository trait (BoxFuture returns, so the booking core can
//! hold `Arc<dyn ...Repository>`), and the SQL implementation over
//! `sqlx::Any`. Instants are stored as RFC3339 TEXT: the encoding is
//! portable across drivers and sorts chronologically.

pub mod appointment;
pub mod business;
pub mod conversation;
pub mod customer;
pub mod reminder;
pub mod service_offering;

pub use appointment::{
    Appointment, AppointmentFilter, AppointmentRepository, AppointmentStatus,
    SqlAppointmentRepository,
};
pub use business::{Business, BusinessRepository, SqlBusinessRepository};
pub use conversation::{Conversation, ConversationRepository, SqlConversationRepository};
pub use customer::{Customer, CustomerRepository, SqlCustomerRepository};
pub use reminder::{
    Reminder, ReminderKind, ReminderRepository, ReminderStatus, SqlReminderRepository,
};
pub use service_offering::{ServiceOffering, ServiceOfferingRepository, SqlServiceOfferingRepository};

use crate::error::DbError;
use chrono::{DateTime, Utc};

/// Mint a fresh entity id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Decode an RFC3339 TEXT column back into an instant.
pub(crate) fn parse_dt(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::DecodeError(format!("invalid timestamp '{}': {}", value, e)))
}
