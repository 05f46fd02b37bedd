// --- File: crates/slotify_whatsapp/src/handlers.rs ---
use crate::models::WebhookPayload;
use crate::sender::WhatsAppSender;
use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::json;
use slotify_common::{invalid_input, SlotifyError};
use slotify_db::repositories::BusinessRepository;
use slotify_flow::{templates, ConversationEngine};
use std::sync::Arc;
use tracing::{info, warn};

// Shared state for the webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    pub engine: Arc<ConversationEngine>,
    pub sender: Arc<WhatsAppSender>,
    pub businesses: Arc<dyn BusinessRepository>,
}

/// Webhook entry point: walks the payload's messages through the
/// conversation engine and sends each reply back out.
#[axum::debug_handler]
pub async fn whatsapp_webhook_handler(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<serde_json::Value>, SlotifyError> {
    if payload.messaging_product != "whatsapp" {
        return Err(invalid_input("Invalid product"));
    }
    let business_id = headers
        .get("x-business-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| invalid_input("Business ID required"))?;

    let webhook_override = state
        .businesses
        .find_by_id(business_id)
        .await
        .ok()
        .flatten()
        .and_then(|business| business.webhook_url);

    for message in &payload.messages {
        match message.kind.as_str() {
            "text" => {
                let Some(text) = &message.text else { continue };
                info!("Processing message from {}", message.from);
                let reply = state
                    .engine
                    .handle_inbound_message(business_id, &message.from, &text.body)
                    .await;
                let delivered = state
                    .sender
                    .send(&message.from, &reply, webhook_override.as_deref())
                    .await;
                if !delivered {
                    warn!("Reply to {} was not delivered", message.from);
                }
            }
            "image" => {
                state
                    .sender
                    .send(
                        &message.from,
                        &templates::image_fallback(),
                        webhook_override.as_deref(),
                    )
                    .await;
            }
            other => {
                warn!("Ignoring unsupported message type '{}'", other);
            }
        }
    }

    Ok(Json(json!({ "success": true })))
}

/// Health check
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "slotify-whatsapp" }))
}
