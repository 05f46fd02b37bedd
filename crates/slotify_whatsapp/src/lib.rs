// --- File: crates/slotify_whatsapp/src/lib.rs ---
// Declare modules within this crate
pub mod handlers;
pub mod models;
pub mod routes;
pub mod sender;

pub use models::{WebhookPayload, WhatsAppMessage};
pub use sender::WhatsAppSender;
