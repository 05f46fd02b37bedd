//! Service-offering repository

use crate::error::DbError;
use crate::DbClient;
use serde::{Deserialize, Serialize};
use slotify_common::services::BoxFuture;
use sqlx::Row;
use tracing::debug;

/// A bookable service offered by a business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub duration_min: i64,
    pub price_cents: Option<i64>,
    pub description: Option<String>,
    pub is_active: bool,
}

pub trait ServiceOfferingRepository: Send + Sync {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError>;
    fn insert(&self, offering: ServiceOffering) -> BoxFuture<'_, ServiceOffering, DbError>;
    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<ServiceOffering>, DbError>;
    /// Active offerings for a business, in insertion order.
    fn find_active(&self, business_id: &str) -> BoxFuture<'_, Vec<ServiceOffering>, DbError>;
}

/// SQL implementation of the service-offering repository
#[derive(Debug, Clone)]
pub struct SqlServiceOfferingRepository {
    db_client: DbClient,
}

impl SqlServiceOfferingRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn row_to_offering(row: sqlx::any::AnyRow) -> Result<ServiceOffering, DbError> {
    Ok(ServiceOffering {
        id: row
            .try_get("id")
            .map_err(|e| DbError::QueryError(e.to_string()))?,
        business_id: row.try_get("business_id").unwrap_or_default(),
        name: row.try_get("name").unwrap_or_default(),
        duration_min: row.try_get("duration_min").unwrap_or(60),
        price_cents: row.try_get("price_cents").ok(),
        description: row.try_get("description").ok(),
        is_active: row.try_get::<i64, _>("is_active").unwrap_or(0) != 0,
    })
}

impl ServiceOfferingRepository for SqlServiceOfferingRepository {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async move {
            debug!("Initializing service offering schema");
            let query = r#"
                CREATE TABLE IF NOT EXISTS service_offerings (
                    id TEXT PRIMARY KEY,
                    business_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    duration_min INTEGER NOT NULL,
                    price_cents INTEGER,
                    description TEXT,
                    is_active INTEGER NOT NULL DEFAULT 1
                )
            "#;
            self.db_client.execute(query).await?;
            Ok(())
        })
    }

    fn insert(&self, offering: ServiceOffering) -> BoxFuture<'_, ServiceOffering, DbError> {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO service_offerings (id, business_id, name, duration_min, price_cents, description, is_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&offering.id)
            .bind(&offering.business_id)
            .bind(&offering.name)
            .bind(offering.duration_min)
            .bind(offering.price_cents)
            .bind(&offering.description)
            .bind(if offering.is_active { 1i64 } else { 0i64 })
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            Ok(offering)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<ServiceOffering>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let row = sqlx::query(
                r#"
                SELECT id, business_id, name, duration_min, price_cents, description, is_active
                FROM service_offerings
                WHERE id = $1
                "#,
            )
            .bind(&id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            row.map(row_to_offering).transpose()
        })
    }

    fn find_active(&self, business_id: &str) -> BoxFuture<'_, Vec<ServiceOffering>, DbError> {
        let business_id = business_id.to_string();
        Box::pin(async move {
            let rows = sqlx::query(
                r#"
                SELECT id, business_id, name, duration_min, price_cents, description, is_active
                FROM service_offerings
                WHERE business_id = $1 AND is_active = 1
                "#,
            )
            .bind(&business_id)
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            rows.into_iter().map(row_to_offering).collect()
        })
    }
}
