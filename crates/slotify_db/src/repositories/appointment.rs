//! Appointment repository

use crate::error::DbError;
use crate::repositories::parse_dt;
use crate::DbClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotify_common::services::BoxFuture;
use sqlx::Row;
use tracing::debug;

/// Appointment lifecycle status.
///
/// `pending -> confirmed -> completed`, or `cancelled` from any non-terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// A terminal appointment never fires reminders.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

/// A persisted appointment. Customer and service names are denormalized at
/// creation time so conversational surfaces never need a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub business_id: String,
    pub customer_id: String,
    pub service_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Price snapshot taken from the service at booking time.
    pub price_cents: Option<i64>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

/// Filters for the admin listing surface.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub phone: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub starting_after: Option<DateTime<Utc>>,
    pub starting_before: Option<DateTime<Utc>>,
}

pub trait AppointmentRepository: Send + Sync {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError>;
    fn insert(&self, appointment: Appointment) -> BoxFuture<'_, Appointment, DbError>;
    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Appointment>, DbError>;
    /// Transition to cancelled, scoped by business ownership. Returns `None`
    /// when the (id, business_id) pair matches no row.
    fn mark_cancelled(
        &self,
        id: &str,
        business_id: &str,
    ) -> BoxFuture<'_, Option<Appointment>, DbError>;
    /// Future, non-terminal appointments for a phone number, ascending by
    /// start time.
    fn upcoming_for_phone(
        &self,
        business_id: &str,
        phone: &str,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Appointment>, DbError>;
    fn list(
        &self,
        business_id: &str,
        filter: AppointmentFilter,
    ) -> BoxFuture<'_, Vec<Appointment>, DbError>;
}

/// SQL implementation of the appointment repository
#[derive(Debug, Clone)]
pub struct SqlAppointmentRepository {
    db_client: DbClient,
}

impl SqlAppointmentRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

const SELECT_COLUMNS: &str = "id, business_id, customer_id, service_id, customer_name, \
     customer_phone, service_name, start_at, end_at, price_cents, status, notes";

fn row_to_appointment(row: sqlx::any::AnyRow) -> Result<Appointment, DbError> {
    let start_raw: String = row
        .try_get("start_at")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let end_raw: String = row
        .try_get("end_at")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let status_raw: String = row.try_get("status").unwrap_or_default();
    let status = AppointmentStatus::parse(&status_raw)
        .ok_or_else(|| DbError::DecodeError(format!("unknown appointment status '{}'", status_raw)))?;

    Ok(Appointment {
        id: row
            .try_get("id")
            .map_err(|e| DbError::QueryError(e.to_string()))?,
        business_id: row.try_get("business_id").unwrap_or_default(),
        customer_id: row.try_get("customer_id").unwrap_or_default(),
        service_id: row.try_get("service_id").unwrap_or_default(),
        customer_name: row.try_get("customer_name").unwrap_or_default(),
        customer_phone: row.try_get("customer_phone").unwrap_or_default(),
        service_name: row.try_get("service_name").unwrap_or_default(),
        start_at: parse_dt(&start_raw)?,
        end_at: parse_dt(&end_raw)?,
        price_cents: row.try_get("price_cents").ok(),
        status,
        notes: row.try_get("notes").ok(),
    })
}

impl AppointmentRepository for SqlAppointmentRepository {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async move {
            debug!("Initializing appointment schema");
            let query = r#"
                CREATE TABLE IF NOT EXISTS appointments (
                    id TEXT PRIMARY KEY,
                    business_id TEXT NOT NULL,
                    customer_id TEXT NOT NULL,
                    service_id TEXT NOT NULL,
                    customer_name TEXT NOT NULL,
                    customer_phone TEXT NOT NULL,
                    service_name TEXT NOT NULL,
                    start_at TEXT NOT NULL,
                    end_at TEXT NOT NULL,
                    price_cents INTEGER,
                    status TEXT NOT NULL,
                    notes TEXT
                )
            "#;
            self.db_client.execute(query).await?;
            Ok(())
        })
    }

    fn insert(&self, appointment: Appointment) -> BoxFuture<'_, Appointment, DbError> {
        Box::pin(async move {
            debug!(
                "Inserting appointment for {} at {}",
                appointment.customer_phone, appointment.start_at
            );
            sqlx::query(
                r#"
                INSERT INTO appointments
                    (id, business_id, customer_id, service_id, customer_name, customer_phone,
                     service_name, start_at, end_at, price_cents, status, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(&appointment.id)
            .bind(&appointment.business_id)
            .bind(&appointment.customer_id)
            .bind(&appointment.service_id)
            .bind(&appointment.customer_name)
            .bind(&appointment.customer_phone)
            .bind(&appointment.service_name)
            .bind(appointment.start_at.to_rfc3339())
            .bind(appointment.end_at.to_rfc3339())
            .bind(appointment.price_cents)
            .bind(appointment.status.as_str())
            .bind(&appointment.notes)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            Ok(appointment)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Appointment>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {} FROM appointments WHERE id = $1",
                SELECT_COLUMNS
            ))
            .bind(&id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            row.map(row_to_appointment).transpose()
        })
    }

    fn mark_cancelled(
        &self,
        id: &str,
        business_id: &str,
    ) -> BoxFuture<'_, Option<Appointment>, DbError> {
        let id = id.to_string();
        let business_id = business_id.to_string();
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE appointments SET status = 'cancelled' WHERE id = $1 AND business_id = $2",
            )
            .bind(&id)
            .bind(&business_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Ok(None);
            }
            self.find_by_id(&id).await
        })
    }

    fn upcoming_for_phone(
        &self,
        business_id: &str,
        phone: &str,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Appointment>, DbError> {
        let business_id = business_id.to_string();
        let phone = phone.to_string();
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {} FROM appointments \
                 WHERE business_id = $1 AND customer_phone = $2 \
                   AND start_at >= $3 AND status IN ('pending', 'confirmed') \
                 ORDER BY start_at ASC",
                SELECT_COLUMNS
            ))
            .bind(&business_id)
            .bind(&phone)
            .bind(now.to_rfc3339())
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

            rows.into_iter().map(row_to_appointment).collect()
        })
    }

    fn list(
        &self,
        business_id: &str,
        filter: AppointmentFilter,
    ) -> BoxFuture<'_, Vec<Appointment>, DbError> {
        let business_id = business_id.to_string();
        Box::pin(async move {
            // Assemble the WHERE clause from the optional filters; binds are
            // positional so the clause and bind order must stay in sync.
            let mut clauses = vec!["business_id = $1".to_string()];
            let mut binds: Vec<String> = vec![business_id];

            if let Some(phone) = filter.phone {
                binds.push(phone);
                clauses.push(format!("customer_phone = ${}", binds.len()));
            }
            if let Some(status) = filter.status {
                binds.push(status.as_str().to_string());
                clauses.push(format!("status = ${}", binds.len()));
            }
            if let Some(after) = filter.starting_after {
                binds.push(after.to_rfc3339());
                clauses.push(format!("start_at >= ${}", binds.len()));
            }
            if let Some(before) = filter.starting_before {
                binds.push(before.to_rfc3339());
                clauses.push(format!("start_at <= ${}", binds.len()));
            }

            let sql = format!(
                "SELECT {} FROM appointments WHERE {} ORDER BY start_at ASC",
                SELECT_COLUMNS,
                clauses.join(" AND ")
            );

            let mut query = sqlx::query(&sql);
            for value in binds {
                query = query.bind(value);
            }

            let rows = query
                .fetch_all(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;

            rows.into_iter().map(row_to_appointment).collect()
        })
    }
}
