// --- File: crates/slotify_common/src/services.rs ---
//! Service abstractions for external collaborators.
//!
//! This module provides trait definitions for the external services the
//! booking core depends on: the calendar busy-interval source, the LLM intent
//! classifier, outbound messaging and the delayed-task scheduler. These traits
//! allow for dependency injection and easier testing by decoupling the core
//! logic from specific implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Type alias for a boxed future used by contracts that cannot fail
/// (degradation is part of the returned value, not an error).
pub type InfallibleFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A wrapper error type that implements std::error::Error for Box<dyn std::error::Error + Send + Sync>
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

/// An externally sourced time span `[start, end)` during which the business
/// calendar is unavailable. The interval is opaque to this system; it is
/// never created or mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusyInterval {
    /// Identifier assigned by the external calendar.
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A trait for external calendar lookups.
///
/// Only the busy-interval query is part of the core's contract; event
/// creation and OAuth mechanics stay with the calendar provider integration.
pub trait CalendarService: Send + Sync {
    /// Error type returned by calendar operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get busy time intervals within a specified time range.
    fn busy_intervals(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyInterval>, Self::Error>;
}

/// One turn of rolling conversation history handed to the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user", "assistant" or "system"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Intent labels produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Book,
    Inquire,
    Cancel,
    Reschedule,
    Faq,
    Other,
}

/// Entities extracted from a customer message alongside the intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentEntities {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub guests: Option<i64>,
}

/// A typed classification result for one inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub intent: IntentKind,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub entities: IntentEntities,
}

impl ClassifiedIntent {
    /// The neutral result used when classification fails: `other` with zero
    /// confidence instead of a propagated error.
    pub fn fallback() -> Self {
        Self {
            intent: IntentKind::Other,
            confidence: 0.0,
            entities: IntentEntities::default(),
        }
    }
}

/// A trait for LLM intent classification.
///
/// The contract is infallible by design: implementations must swallow
/// transport and parse failures and return [`ClassifiedIntent::fallback`].
pub trait IntentClassifier: Send + Sync {
    fn classify(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> InfallibleFuture<'_, ClassifiedIntent>;
}

/// A trait for outbound customer messaging.
///
/// Returns whether the message was delivered; transport failures surface as
/// `false` rather than as errors so callers can degrade gracefully.
pub trait MessagingService: Send + Sync {
    fn send_text(&self, to: &str, body: &str) -> InfallibleFuture<'_, bool>;
}

/// A delayed-delivery request handed to the host task runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Event name, e.g. "appointment/reminder.send"
    pub name: String,
    /// The reminder row this event will deliver.
    pub reminder_id: String,
    /// The instant at or after which the event fires.
    pub wake_at: DateTime<Utc>,
}

/// A trait for the delayed-task scheduler collaborator.
///
/// At-least-once delivery is assumed; delivery handlers must make their own
/// idempotent status checks.
pub trait DelayScheduler: Send + Sync {
    fn schedule(&self, event: ScheduledEvent) -> InfallibleFuture<'_, ()>;
}
