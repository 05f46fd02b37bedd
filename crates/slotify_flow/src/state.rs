// --- File: crates/slotify_flow/src/state.rs ---
//! Persisted booking-flow state.
//!
//! The state machine holds nothing in memory: the current step and the
//! selections accumulated so far live on the Conversation row as JSON and are
//! read back at the start of every turn, so a flow survives process restarts
//! and horizontal scale-out.

use serde::{Deserialize, Serialize};
use slotify_availability::Slot;
use slotify_common::services::IntentKind;

/// The step a booking dialogue is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStep {
    /// Awaiting service selection
    Service,
    /// Awaiting slot selection by number
    Time,
    /// Awaiting a yes/no reply
    Confirm,
    /// Terminal
    Complete,
}

/// Selections accumulated during a multi-turn booking dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingState {
    pub step: BookingStep,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub selected_slot_id: Option<String>,
    #[serde(default)]
    pub slot_date: Option<String>,
    #[serde(default)]
    pub slot_time: Option<String>,
}

impl BookingState {
    /// Slots have been offered for a service; the next digit reply selects
    /// one.
    pub fn awaiting_time(service_id: &str, service_name: &str) -> Self {
        Self {
            step: BookingStep::Time,
            service_id: Some(service_id.to_string()),
            service_name: Some(service_name.to_string()),
            selected_slot_id: None,
            slot_date: None,
            slot_time: None,
        }
    }

    /// A slot was picked; the next yes/no reply settles the booking.
    pub fn with_selection(&self, slot: &Slot) -> Self {
        Self {
            step: BookingStep::Confirm,
            service_id: self.service_id.clone(),
            service_name: self.service_name.clone(),
            selected_slot_id: Some(slot.id.clone()),
            slot_date: Some(slot.date.clone()),
            slot_time: Some(slot.time.clone()),
        }
    }

    /// Reads the state back from its persisted JSON form. A record written
    /// by an older build that no longer decodes is treated as no state.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// The persisted JSON form.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("booking state always serializes")
    }
}

/// The intent label stored on the conversation record.
pub fn intent_label(intent: IntentKind) -> &'static str {
    match intent {
        IntentKind::Book => "book",
        IntentKind::Inquire => "inquire",
        IntentKind::Cancel => "cancel",
        IntentKind::Reschedule => "reschedule",
        IntentKind::Faq => "faq",
        IntentKind::Other => "other",
    }
}
