//! Business repository

use crate::error::DbError;
use crate::DbClient;
use serde::{Deserialize, Serialize};
use slotify_common::services::BoxFuture;
use sqlx::Row;
use tracing::debug;

/// A tenant of the booking assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    /// IANA timezone name; the configured default applies when absent.
    pub timezone: Option<String>,
    /// Raw operating-hours value as configured, weekday name -> ["HH:MM-HH:MM", ...].
    pub operating_hours: Option<serde_json::Value>,
    /// External calendar to reconcile availability against, if connected.
    pub calendar_id: Option<String>,
    pub address: Option<String>,
    /// Per-business override of the outbound messaging webhook.
    pub webhook_url: Option<String>,
}

pub trait BusinessRepository: Send + Sync {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError>;
    fn insert(&self, business: Business) -> BoxFuture<'_, Business, DbError>;
    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Business>, DbError>;
}

/// SQL implementation of the business repository
#[derive(Debug, Clone)]
pub struct SqlBusinessRepository {
    db_client: DbClient,
}

impl SqlBusinessRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn row_to_business(row: sqlx::any::AnyRow) -> Result<Business, DbError> {
    let operating_hours: Option<String> = row.try_get("operating_hours").ok();
    let operating_hours = match operating_hours {
        Some(raw) => Some(
            serde_json::from_str(&raw)
                .map_err(|e| DbError::DecodeError(format!("operating_hours: {}", e)))?,
        ),
        None => None,
    };

    Ok(Business {
        id: row
            .try_get("id")
            .map_err(|e| DbError::QueryError(e.to_string()))?,
        name: row.try_get("name").unwrap_or_default(),
        timezone: row.try_get("timezone").ok(),
        operating_hours,
        calendar_id: row.try_get("calendar_id").ok(),
        address: row.try_get("address").ok(),
        webhook_url: row.try_get("webhook_url").ok(),
    })
}

impl BusinessRepository for SqlBusinessRepository {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async move {
            debug!("Initializing business schema");
            let query = r#"
                CREATE TABLE IF NOT EXISTS businesses (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    timezone TEXT,
                    operating_hours TEXT,
                    calendar_id TEXT,
                    address TEXT,
                    webhook_url TEXT
                )
            "#;
            self.db_client.execute(query).await?;
            Ok(())
        })
    }

    fn insert(&self, business: Business) -> BoxFuture<'_, Business, DbError> {
        Box::pin(async move {
            debug!("Inserting business: {}", business.name);
            let operating_hours = business
                .operating_hours
                .as_ref()
                .map(|v| v.to_string());

            sqlx::query(
                r#"
                INSERT INTO businesses (id, name, timezone, operating_hours, calendar_id, address, webhook_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&business.id)
            .bind(&business.name)
            .bind(&business.timezone)
            .bind(&operating_hours)
            .bind(&business.calendar_id)
            .bind(&business.address)
            .bind(&business.webhook_url)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            Ok(business)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Business>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let row = sqlx::query(
                r#"
                SELECT id, name, timezone, operating_hours, calendar_id, address, webhook_url
                FROM businesses
                WHERE id = $1
                "#,
            )
            .bind(&id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            row.map(row_to_business).transpose()
        })
    }
}
