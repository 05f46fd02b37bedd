// --- File: crates/slotify_whatsapp/src/routes.rs ---

use crate::handlers::{health_handler, whatsapp_webhook_handler, WebhookState};
use axum::{
    routing::{get, post},
    Router,
};

/// Creates a router containing the WhatsApp webhook routes.
pub fn routes(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/whatsapp", post(whatsapp_webhook_handler))
        .route("/webhooks/whatsapp", get(health_handler))
        .with_state(state)
}
