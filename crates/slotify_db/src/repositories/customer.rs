//! Customer repository
//!
//! Customers are keyed by (business_id, phone): the composite pair is unique
//! and both upsert flavours resolve against it.

use crate::error::DbError;
use crate::repositories::{new_id, parse_dt};
use crate::DbClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotify_common::services::BoxFuture;
use sqlx::Row;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub business_id: String,
    pub phone: String,
    pub name: Option<String>,
    /// Lifetime booking counter, incremented on every created appointment.
    pub total_bookings: i64,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

pub trait CustomerRepository: Send + Sync {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError>;
    fn find_by_phone(
        &self,
        business_id: &str,
        phone: &str,
    ) -> BoxFuture<'_, Option<Customer>, DbError>;
    /// Upsert on inbound contact: refreshes `last_contacted_at`, creates the
    /// customer on first message.
    fn record_contact(
        &self,
        business_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> BoxFuture<'_, Customer, DbError>;
    /// Upsert on booking creation: increments the lifetime booking counter
    /// and fills in the name when newly supplied.
    fn record_booking(
        &self,
        business_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> BoxFuture<'_, Customer, DbError>;
}

/// SQL implementation of the customer repository
#[derive(Debug, Clone)]
pub struct SqlCustomerRepository {
    db_client: DbClient,
}

impl SqlCustomerRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    async fn fetch(
        &self,
        business_id: &str,
        phone: &str,
    ) -> Result<Option<Customer>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT id, business_id, phone, name, total_bookings, last_contacted_at
            FROM customers
            WHERE business_id = $1 AND phone = $2
            "#,
        )
        .bind(business_id)
        .bind(phone)
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;

        row.map(row_to_customer).transpose()
    }
}

fn row_to_customer(row: sqlx::any::AnyRow) -> Result<Customer, DbError> {
    let last_contacted_at = match row.try_get::<Option<String>, _>("last_contacted_at") {
        Ok(Some(raw)) => Some(parse_dt(&raw)?),
        _ => None,
    };
    Ok(Customer {
        id: row
            .try_get("id")
            .map_err(|e| DbError::QueryError(e.to_string()))?,
        business_id: row.try_get("business_id").unwrap_or_default(),
        phone: row.try_get("phone").unwrap_or_default(),
        name: row.try_get("name").ok(),
        total_bookings: row.try_get("total_bookings").unwrap_or(0),
        last_contacted_at,
    })
}

impl CustomerRepository for SqlCustomerRepository {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async move {
            debug!("Initializing customer schema");
            let query = r#"
                CREATE TABLE IF NOT EXISTS customers (
                    id TEXT PRIMARY KEY,
                    business_id TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    name TEXT,
                    total_bookings INTEGER NOT NULL DEFAULT 0,
                    last_contacted_at TEXT,
                    UNIQUE(business_id, phone)
                )
            "#;
            self.db_client.execute(query).await?;
            Ok(())
        })
    }

    fn find_by_phone(
        &self,
        business_id: &str,
        phone: &str,
    ) -> BoxFuture<'_, Option<Customer>, DbError> {
        let business_id = business_id.to_string();
        let phone = phone.to_string();
        Box::pin(async move { self.fetch(&business_id, &phone).await })
    }

    fn record_contact(
        &self,
        business_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> BoxFuture<'_, Customer, DbError> {
        let business_id = business_id.to_string();
        let phone = phone.to_string();
        let name = name.map(|n| n.to_string());
        Box::pin(async move {
            let now = Utc::now().to_rfc3339();
            if let Some(existing) = self.fetch(&business_id, &phone).await? {
                sqlx::query(
                    r#"
                    UPDATE customers
                    SET last_contacted_at = $1, name = COALESCE($2, name)
                    WHERE business_id = $3 AND phone = $4
                    "#,
                )
                .bind(&now)
                .bind(&name)
                .bind(&business_id)
                .bind(&phone)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;

                Ok(Customer {
                    name: name.or(existing.name),
                    last_contacted_at: Some(parse_dt(&now)?),
                    ..existing
                })
            } else {
                let customer = Customer {
                    id: new_id(),
                    business_id: business_id.clone(),
                    phone: phone.clone(),
                    name,
                    total_bookings: 0,
                    last_contacted_at: Some(parse_dt(&now)?),
                };
                sqlx::query(
                    r#"
                    INSERT INTO customers (id, business_id, phone, name, total_bookings, last_contacted_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(&customer.id)
                .bind(&customer.business_id)
                .bind(&customer.phone)
                .bind(&customer.name)
                .bind(customer.total_bookings)
                .bind(&now)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;

                Ok(customer)
            }
        })
    }

    fn record_booking(
        &self,
        business_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> BoxFuture<'_, Customer, DbError> {
        let business_id = business_id.to_string();
        let phone = phone.to_string();
        let name = name.map(|n| n.to_string());
        Box::pin(async move {
            if let Some(existing) = self.fetch(&business_id, &phone).await? {
                sqlx::query(
                    r#"
                    UPDATE customers
                    SET total_bookings = total_bookings + 1, name = COALESCE($1, name)
                    WHERE business_id = $2 AND phone = $3
                    "#,
                )
                .bind(&name)
                .bind(&business_id)
                .bind(&phone)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;

                Ok(Customer {
                    name: name.or(existing.name),
                    total_bookings: existing.total_bookings + 1,
                    ..existing
                })
            } else {
                let customer = Customer {
                    id: new_id(),
                    business_id: business_id.clone(),
                    phone: phone.clone(),
                    name,
                    total_bookings: 1,
                    last_contacted_at: None,
                };
                sqlx::query(
                    r#"
                    INSERT INTO customers (id, business_id, phone, name, total_bookings)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(&customer.id)
                .bind(&customer.business_id)
                .bind(&customer.phone)
                .bind(&customer.name)
                .bind(customer.total_bookings)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;

                Ok(customer)
            }
        })
    }
}
