//! Conversation repository
//!
//! One active conversation per (business_id, session_id). The rolling message
//! history and the booking state are stored as JSON: the state machine is
//! stateless in memory, every turn reads the persisted record and writes the
//! transition back.

use crate::error::DbError;
use crate::repositories::new_id;
use crate::DbClient;
use serde::{Deserialize, Serialize};
use slotify_common::services::{BoxFuture, ChatMessage};
use sqlx::Row;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub business_id: String,
    pub session_id: String,
    pub phone: String,
    /// Rolling history of user/assistant turns.
    pub messages: Vec<ChatMessage>,
    /// Last classified intent label ("book_pending" while mid-flow).
    pub intent: Option<String>,
    /// Opaque booking-state JSON owned by the flow crate; None when no
    /// booking is in progress.
    pub booking_state: Option<serde_json::Value>,
}

impl Conversation {
    /// A fresh conversation for a session's first inbound message.
    pub fn new(business_id: &str, session_id: &str, phone: &str) -> Self {
        Self {
            id: new_id(),
            business_id: business_id.to_string(),
            session_id: session_id.to_string(),
            phone: phone.to_string(),
            messages: Vec::new(),
            intent: None,
            booking_state: None,
        }
    }
}

pub trait ConversationRepository: Send + Sync {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError>;
    fn find_by_session(
        &self,
        business_id: &str,
        session_id: &str,
    ) -> BoxFuture<'_, Option<Conversation>, DbError>;
    /// Insert or replace by the (business_id, session_id) composite key.
    fn upsert(&self, conversation: Conversation) -> BoxFuture<'_, Conversation, DbError>;
}

/// SQL implementation of the conversation repository
#[derive(Debug, Clone)]
pub struct SqlConversationRepository {
    db_client: DbClient,
}

impl SqlConversationRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn row_to_conversation(row: sqlx::any::AnyRow) -> Result<Conversation, DbError> {
    let messages_raw: String = row.try_get("messages").unwrap_or_else(|_| "[]".to_string());
    let messages = serde_json::from_str(&messages_raw)
        .map_err(|e| DbError::DecodeError(format!("messages: {}", e)))?;

    let booking_state = match row.try_get::<Option<String>, _>("booking_state") {
        Ok(Some(raw)) => Some(
            serde_json::from_str(&raw)
                .map_err(|e| DbError::DecodeError(format!("booking_state: {}", e)))?,
        ),
        _ => None,
    };

    Ok(Conversation {
        id: row
            .try_get("id")
            .map_err(|e| DbError::QueryError(e.to_string()))?,
        business_id: row.try_get("business_id").unwrap_or_default(),
        session_id: row.try_get("session_id").unwrap_or_default(),
        phone: row.try_get("phone").unwrap_or_default(),
        messages,
        intent: row.try_get("intent").ok(),
        booking_state,
    })
}

impl ConversationRepository for SqlConversationRepository {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async move {
            debug!("Initializing conversation schema");
            let query = r#"
                CREATE TABLE IF NOT EXISTS conversations (
                    id TEXT PRIMARY KEY,
                    business_id TEXT NOT NULL,
                    session_id TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    messages TEXT NOT NULL,
                    intent TEXT,
                    booking_state TEXT,
                    UNIQUE(business_id, session_id)
                )
            "#;
            self.db_client.execute(query).await?;
            Ok(())
        })
    }

    fn find_by_session(
        &self,
        business_id: &str,
        session_id: &str,
    ) -> BoxFuture<'_, Option<Conversation>, DbError> {
        let business_id = business_id.to_string();
        let session_id = session_id.to_string();
        Box::pin(async move {
            let row = sqlx::query(
                r#"
                SELECT id, business_id, session_id, phone, messages, intent, booking_state
                FROM conversations
                WHERE business_id = $1 AND session_id = $2
                "#,
            )
            .bind(&business_id)
            .bind(&session_id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            row.map(row_to_conversation).transpose()
        })
    }

    fn upsert(&self, conversation: Conversation) -> BoxFuture<'_, Conversation, DbError> {
        Box::pin(async move {
            let messages = serde_json::to_string(&conversation.messages)
                .map_err(|e| DbError::DecodeError(format!("messages: {}", e)))?;
            let booking_state = conversation
                .booking_state
                .as_ref()
                .map(|v| v.to_string());

            let existing = self
                .find_by_session(&conversation.business_id, &conversation.session_id)
                .await?;

            if existing.is_some() {
                sqlx::query(
                    r#"
                    UPDATE conversations
                    SET phone = $1, messages = $2, intent = $3, booking_state = $4
                    WHERE business_id = $5 AND session_id = $6
                    "#,
                )
                .bind(&conversation.phone)
                .bind(&messages)
                .bind(&conversation.intent)
                .bind(&booking_state)
                .bind(&conversation.business_id)
                .bind(&conversation.session_id)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;
            } else {
                sqlx::query(
                    r#"
                    INSERT INTO conversations
                        (id, business_id, session_id, phone, messages, intent, booking_state)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(&conversation.id)
                .bind(&conversation.business_id)
                .bind(&conversation.session_id)
                .bind(&conversation.phone)
                .bind(&messages)
                .bind(&conversation.intent)
                .bind(&booking_state)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;
            }

            Ok(conversation)
        })
    }
}
