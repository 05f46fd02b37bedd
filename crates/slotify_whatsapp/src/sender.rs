// --- File: crates/slotify_whatsapp/src/sender.rs ---
//! Outbound WhatsApp delivery through the messaging relay webhook.

use serde::Serialize;
use slotify_common::services::{InfallibleFuture, MessagingService};
use slotify_config::AppConfig;
use tracing::{error, info};

#[derive(Serialize, Debug)]
struct OutboundText<'a> {
    body: &'a str,
}

#[derive(Serialize, Debug)]
struct OutboundMessage<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    to: &'a str,
    text: OutboundText<'a>,
}

/// Sends customer messages through the configured relay webhook; a business
/// record may carry its own override URL.
pub struct WhatsAppSender {
    default_url: Option<String>,
}

impl WhatsAppSender {
    pub fn new(config: &AppConfig) -> Self {
        let default_url = if config.use_whatsapp {
            config.whatsapp.as_ref().map(|w| w.webhook_url.clone())
        } else {
            None
        };
        Self { default_url }
    }

    /// Delivers one text message. Returns whether delivery succeeded;
    /// transport failures are logged and reported as `false`.
    pub async fn send(&self, to: &str, body: &str, override_url: Option<&str>) -> bool {
        let Some(url) = override_url.or(self.default_url.as_deref()) else {
            error!("No outbound webhook URL configured");
            return false;
        };

        let payload = OutboundMessage {
            kind: "text",
            // The relay expects bare digits
            to: to.trim_start_matches('+'),
            text: OutboundText { body },
        };

        match slotify_common::http::client::post(url, &payload).await {
            Ok(response) if response.status().is_success() => {
                info!("Sent WhatsApp message to {}", to);
                true
            }
            Ok(response) => {
                error!(
                    "WhatsApp relay returned {} for message to {}",
                    response.status(),
                    to
                );
                false
            }
            Err(err) => {
                error!("Failed to send WhatsApp message to {}: {}", to, err);
                false
            }
        }
    }
}

impl MessagingService for WhatsAppSender {
    fn send_text(&self, to: &str, body: &str) -> InfallibleFuture<'_, bool> {
        let to = to.to_string();
        let body = body.to_string();
        Box::pin(async move { self.send(&to, &body, None).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_payload_matches_relay_shape() {
        let payload = OutboundMessage {
            kind: "text",
            to: "+6512345678".trim_start_matches('+'),
            text: OutboundText {
                body: "See you then!",
            },
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["to"], "6512345678");
        assert_eq!(value["text"]["body"], "See you then!");
    }

    #[tokio::test]
    async fn missing_webhook_url_fails_delivery_quietly() {
        let sender = WhatsAppSender { default_url: None };
        assert!(!sender.send("+6512345678", "hello", None).await);
    }
}
