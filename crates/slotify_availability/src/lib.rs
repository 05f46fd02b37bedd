// --- File: crates/slotify_availability/src/lib.rs ---
// Declare modules within this crate
pub mod handlers;
pub mod hours;
pub mod logic;
#[cfg(test)]
mod logic_proptest;
pub mod routes;

pub use hours::{OperatingHours, TimeRange};
pub use logic::{
    business_timezone, compute_slots, parse_slot_id, Availability, AvailabilityError, Slot,
    SlotComputation, SlotRequest, TimePreferences,
};
