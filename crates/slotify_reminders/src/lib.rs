// --- File: crates/slotify_reminders/src/lib.rs ---
// Declare modules within this crate
pub mod logic;
#[cfg(test)]
mod logic_test;
pub mod scheduler;

pub use logic::{ReminderEngine, ReminderError, REMINDER_EVENT};
pub use scheduler::{NoopScheduler, TokioDelayScheduler};
