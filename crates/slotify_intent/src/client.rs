// --- File: crates/slotify_intent/src/client.rs ---
//! Intent classification through the LLM gateway.
//!
//! The gateway speaks the usual chat-completions shape; the classifier asks
//! for a JSON verdict and digs the first object literal out of the
//! completion. The contract is infallible: every failure mode (transport,
//! non-2xx, unparseable completion) collapses to the `other`/zero-confidence
//! fallback so a flaky provider never breaks the conversation.

use serde::{Deserialize, Serialize};
use slotify_common::services::{
    ChatMessage, ClassifiedIntent, InfallibleFuture, IntentClassifier,
};
use slotify_common::{integration_failure, SlotifyError};
use slotify_config::LlmConfig;
use tracing::{debug, warn};

const DEFAULT_MODEL: &str = "minimax/MiniMax-M2.1";
/// Only this many trailing history turns accompany the message.
const HISTORY_WINDOW: usize = 5;

const SYSTEM_PROMPT: &str = "You are a helpful booking assistant for local service businesses \
(salons, tutors, consultants).\n\n\
Your role:\n\
- Help customers book appointments naturally\n\
- Answer questions about services, hours, pricing\n\
- Be friendly, professional, concise\n\
- Always confirm details before booking\n\n\
If you need availability, ask the user what times work for them. Do not invent slots.";

fn classification_prompt(message: &str) -> String {
    format!(
        "{}\n\n\
         Analyze this message and extract:\n\
         1. Intent: book/inquire/cancel/reschedule/faq/other\n\
         2. Entities: service, date, time, duration, guests\n\
         3. Confidence: 0-1\n\n\
         Message: \"{}\"\n\n\
         Respond with JSON:\n\
         {{\n\
           \"intent\": \"...\",\n\
           \"confidence\": 0.0,\n\
           \"entities\": {{\n\
             \"service\": \"...\",\n\
             \"date\": \"...\",\n\
             \"time\": \"...\",\n\
             \"duration\": null,\n\
             \"guests\": null\n\
           }}\n\
         }}",
        SYSTEM_PROMPT, message
    )
}

#[derive(Serialize, Debug)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Pulls the classification out of a completion: everything from the first
/// `{` to the last `}`, parsed as [`ClassifiedIntent`].
pub(crate) fn extract_intent(content: &str) -> Option<ClassifiedIntent> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

/// Classifier backed by the configured LLM gateway.
pub struct GatewayIntentClassifier {
    gateway_url: String,
    model: String,
}

impl GatewayIntentClassifier {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn request(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> Result<ClassifiedIntent, SlotifyError> {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: classification_prompt(text),
        }];
        let tail = history.len().saturating_sub(HISTORY_WINDOW);
        messages.extend_from_slice(&history[tail..]);
        messages.push(ChatMessage::user(text));

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: 0.3,
            max_tokens: 500,
        };

        let url = format!("{}/api/chat", self.gateway_url);
        let response = slotify_common::http::client::post(&url, &body).await?;
        if !response.status().is_success() {
            return Err(integration_failure(
                "llm",
                format!("gateway returned {}", response.status()),
            ));
        }

        let data: ChatResponse = response.json().await?;
        let content = data
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .unwrap_or_default();
        debug!("Gateway completion: {}", content);

        extract_intent(content)
            .ok_or_else(|| integration_failure("llm", "no JSON object in completion"))
    }
}

impl IntentClassifier for GatewayIntentClassifier {
    fn classify(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> InfallibleFuture<'_, ClassifiedIntent> {
        let text = text.to_string();
        let history = history.to_vec();
        Box::pin(async move {
            match self.request(&text, &history).await {
                Ok(intent) => intent,
                Err(err) => {
                    warn!("Intent classification failed: {}", err);
                    ClassifiedIntent::fallback()
                }
            }
        })
    }
}
