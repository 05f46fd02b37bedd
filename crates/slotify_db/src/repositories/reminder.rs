//! Reminder repository

use crate::error::DbError;
use crate::repositories::parse_dt;
use crate::DbClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotify_common::services::BoxFuture;
use sqlx::Row;
use tracing::debug;

/// Which approach window a reminder covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderKind {
    #[serde(rename = "24h")]
    DayBefore,
    #[serde(rename = "1h")]
    HourBefore,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::DayBefore => "24h",
            ReminderKind::HourBefore => "1h",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "24h" => Some(ReminderKind::DayBefore),
            "1h" => Some(ReminderKind::HourBefore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Failed => "failed",
            ReminderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ReminderStatus::Pending),
            "sent" => Some(ReminderStatus::Sent),
            "failed" => Some(ReminderStatus::Failed),
            "cancelled" => Some(ReminderStatus::Cancelled),
            _ => None,
        }
    }
}

/// A scheduled, pre-rendered outbound message tied to an appointment's
/// approach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub business_id: String,
    pub appointment_id: String,
    pub kind: ReminderKind,
    pub scheduled_at: DateTime<Utc>,
    pub message: String,
    pub status: ReminderStatus,
    pub sent_at: Option<DateTime<Utc>>,
}

pub trait ReminderRepository: Send + Sync {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError>;
    fn insert(&self, reminder: Reminder) -> BoxFuture<'_, Reminder, DbError>;
    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Reminder>, DbError>;
    fn for_appointment(&self, appointment_id: &str) -> BoxFuture<'_, Vec<Reminder>, DbError>;
    fn mark_status(
        &self,
        id: &str,
        status: ReminderStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'_, (), DbError>;
    /// Bulk-transition all pending reminders for an appointment to
    /// cancelled. Idempotent; returns the number of rows transitioned.
    fn cancel_pending(&self, appointment_id: &str) -> BoxFuture<'_, u64, DbError>;
}

/// SQL implementation of the reminder repository
#[derive(Debug, Clone)]
pub struct SqlReminderRepository {
    db_client: DbClient,
}

impl SqlReminderRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn row_to_reminder(row: sqlx::any::AnyRow) -> Result<Reminder, DbError> {
    let kind_raw: String = row.try_get("kind").unwrap_or_default();
    let kind = ReminderKind::parse(&kind_raw)
        .ok_or_else(|| DbError::DecodeError(format!("unknown reminder kind '{}'", kind_raw)))?;
    let status_raw: String = row.try_get("status").unwrap_or_default();
    let status = ReminderStatus::parse(&status_raw)
        .ok_or_else(|| DbError::DecodeError(format!("unknown reminder status '{}'", status_raw)))?;
    let scheduled_raw: String = row
        .try_get("scheduled_at")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let sent_at = match row.try_get::<Option<String>, _>("sent_at") {
        Ok(Some(raw)) => Some(parse_dt(&raw)?),
        _ => None,
    };

    Ok(Reminder {
        id: row
            .try_get("id")
            .map_err(|e| DbError::QueryError(e.to_string()))?,
        business_id: row.try_get("business_id").unwrap_or_default(),
        appointment_id: row.try_get("appointment_id").unwrap_or_default(),
        kind,
        scheduled_at: parse_dt(&scheduled_raw)?,
        message: row.try_get("message").unwrap_or_default(),
        status,
        sent_at,
    })
}

impl ReminderRepository for SqlReminderRepository {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async move {
            debug!("Initializing reminder schema");
            let query = r#"
                CREATE TABLE IF NOT EXISTS reminders (
                    id TEXT PRIMARY KEY,
                    business_id TEXT NOT NULL,
                    appointment_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    scheduled_at TEXT NOT NULL,
                    message TEXT NOT NULL,
                    status TEXT NOT NULL,
                    sent_at TEXT
                )
            "#;
            self.db_client.execute(query).await?;
            Ok(())
        })
    }

    fn insert(&self, reminder: Reminder) -> BoxFuture<'_, Reminder, DbError> {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO reminders
                    (id, business_id, appointment_id, kind, scheduled_at, message, status, sent_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&reminder.id)
            .bind(&reminder.business_id)
            .bind(&reminder.appointment_id)
            .bind(reminder.kind.as_str())
            .bind(reminder.scheduled_at.to_rfc3339())
            .bind(&reminder.message)
            .bind(reminder.status.as_str())
            .bind(reminder.sent_at.map(|dt| dt.to_rfc3339()))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            Ok(reminder)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Reminder>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let row = sqlx::query(
                r#"
                SELECT id, business_id, appointment_id, kind, scheduled_at, message, status, sent_at
                FROM reminders
                WHERE id = $1
                "#,
            )
            .bind(&id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            row.map(row_to_reminder).transpose()
        })
    }

    fn for_appointment(&self, appointment_id: &str) -> BoxFuture<'_, Vec<Reminder>, DbError> {
        let appointment_id = appointment_id.to_string();
        Box::pin(async move {
            let rows = sqlx::query(
                r#"
                SELECT id, business_id, appointment_id, kind, scheduled_at, message, status, sent_at
                FROM reminders
                WHERE appointment_id = $1
                ORDER BY scheduled_at ASC
                "#,
            )
            .bind(&appointment_id)
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            rows.into_iter().map(row_to_reminder).collect()
        })
    }

    fn mark_status(
        &self,
        id: &str,
        status: ReminderStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'_, (), DbError> {
        let id = id.to_string();
        Box::pin(async move {
            sqlx::query("UPDATE reminders SET status = $1, sent_at = $2 WHERE id = $3")
                .bind(status.as_str())
                .bind(sent_at.map(|dt| dt.to_rfc3339()))
                .bind(&id)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;
            Ok(())
        })
    }

    fn cancel_pending(&self, appointment_id: &str) -> BoxFuture<'_, u64, DbError> {
        let appointment_id = appointment_id.to_string();
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE reminders SET status = 'cancelled' \
                 WHERE appointment_id = $1 AND status = 'pending'",
            )
            .bind(&appointment_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            Ok(result.rows_affected())
        })
    }
}
