//! In-memory persistence
//!
//! A single [`MemoryStore`] implements every repository trait over a shared
//! `Mutex`-guarded state. Tests run against it without a database, and a
//! backend started without a `database` config section falls back to it.

use crate::error::DbError;
use crate::repositories::{
    Appointment, AppointmentFilter, AppointmentRepository, AppointmentStatus, Business,
    BusinessRepository, Conversation, ConversationRepository, Customer, CustomerRepository,
    Reminder, ReminderRepository, ReminderStatus, ServiceOffering, ServiceOfferingRepository,
};
use chrono::{DateTime, Utc};
use slotify_common::services::BoxFuture;
use std::sync::Mutex;

use crate::repositories::new_id;

#[derive(Debug, Default)]
struct Inner {
    businesses: Vec<Business>,
    offerings: Vec<ServiceOffering>,
    customers: Vec<Customer>,
    appointments: Vec<Appointment>,
    conversations: Vec<Conversation>,
    reminders: Vec<Reminder>,
}

/// In-memory store implementing all repository traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BusinessRepository for MemoryStore {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async { Ok(()) })
    }

    fn insert(&self, business: Business) -> BoxFuture<'_, Business, DbError> {
        Box::pin(async move {
            self.inner.lock().unwrap().businesses.push(business.clone());
            Ok(business)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Business>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner.businesses.iter().find(|b| b.id == id).cloned())
        })
    }
}

impl ServiceOfferingRepository for MemoryStore {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async { Ok(()) })
    }

    fn insert(&self, offering: ServiceOffering) -> BoxFuture<'_, ServiceOffering, DbError> {
        Box::pin(async move {
            self.inner.lock().unwrap().offerings.push(offering.clone());
            Ok(offering)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<ServiceOffering>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner.offerings.iter().find(|o| o.id == id).cloned())
        })
    }

    fn find_active(&self, business_id: &str) -> BoxFuture<'_, Vec<ServiceOffering>, DbError> {
        let business_id = business_id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .offerings
                .iter()
                .filter(|o| o.business_id == business_id && o.is_active)
                .cloned()
                .collect())
        })
    }
}

impl CustomerRepository for MemoryStore {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async { Ok(()) })
    }

    fn find_by_phone(
        &self,
        business_id: &str,
        phone: &str,
    ) -> BoxFuture<'_, Option<Customer>, DbError> {
        let business_id = business_id.to_string();
        let phone = phone.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .customers
                .iter()
                .find(|c| c.business_id == business_id && c.phone == phone)
                .cloned())
        })
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
            let mut inner = self.inner.lock().unwrap();
            let now = Utc::now();
            if let Some(customer) = inner
                .customers
                .iter_mut()
                .find(|c| c.business_id == business_id && c.phone == phone)
            {
                customer.last_contacted_at = Some(now);
                if name.is_some() {
                    customer.name = name;
                }
                return Ok(customer.clone());
            }
            let customer = Customer {
                id: new_id(),
                business_id,
                phone,
                name,
                total_bookings: 0,
                last_contacted_at: Some(now),
            };
            inner.customers.push(customer.clone());
            Ok(customer)
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
            let mut inner = self.inner.lock().unwrap();
            if let Some(customer) = inner
                .customers
                .iter_mut()
                .find(|c| c.business_id == business_id && c.phone == phone)
            {
                customer.total_bookings += 1;
                if name.is_some() {
                    customer.name = name;
                }
                return Ok(customer.clone());
            }
            let customer = Customer {
                id: new_id(),
                business_id,
                phone,
                name,
                total_bookings: 1,
                last_contacted_at: None,
            };
            inner.customers.push(customer.clone());
            Ok(customer)
        })
    }
}

impl AppointmentRepository for MemoryStore {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async { Ok(()) })
    }

    fn insert(&self, appointment: Appointment) -> BoxFuture<'_, Appointment, DbError> {
        Box::pin(async move {
            self.inner
                .lock()
                .unwrap()
                .appointments
                .push(appointment.clone());
            Ok(appointment)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Appointment>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner.appointments.iter().find(|a| a.id == id).cloned())
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
            let mut inner = self.inner.lock().unwrap();
            if let Some(appointment) = inner
                .appointments
                .iter_mut()
                .find(|a| a.id == id && a.business_id == business_id)
            {
                appointment.status = AppointmentStatus::Cancelled;
                return Ok(Some(appointment.clone()));
            }
            Ok(None)
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
            let inner = self.inner.lock().unwrap();
            let mut matches: Vec<Appointment> = inner
                .appointments
                .iter()
                .filter(|a| {
                    a.business_id == business_id
                        && a.customer_phone == phone
                        && a.start_at >= now
                        && matches!(
                            a.status,
                            AppointmentStatus::Pending | AppointmentStatus::Confirmed
                        )
                })
                .cloned()
                .collect();
            matches.sort_by_key(|a| a.start_at);
            Ok(matches)
        })
    }

    fn list(
        &self,
        business_id: &str,
        filter: AppointmentFilter,
    ) -> BoxFuture<'_, Vec<Appointment>, DbError> {
        let business_id = business_id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            let mut matches: Vec<Appointment> = inner
                .appointments
                .iter()
                .filter(|a| a.business_id == business_id)
                .filter(|a| filter.phone.as_deref().is_none_or(|p| a.customer_phone == p))
                .filter(|a| filter.status.is_none_or(|s| a.status == s))
                .filter(|a| filter.starting_after.is_none_or(|t| a.start_at >= t))
                .filter(|a| filter.starting_before.is_none_or(|t| a.start_at <= t))
                .cloned()
                .collect();
            matches.sort_by_key(|a| a.start_at);
            Ok(matches)
        })
    }
}

impl ConversationRepository for MemoryStore {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async { Ok(()) })
    }

    fn find_by_session(
        &self,
        business_id: &str,
        session_id: &str,
    ) -> BoxFuture<'_, Option<Conversation>, DbError> {
        let business_id = business_id.to_string();
        let session_id = session_id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .conversations
                .iter()
                .find(|c| c.business_id == business_id && c.session_id == session_id)
                .cloned())
        })
    }

    fn upsert(&self, conversation: Conversation) -> BoxFuture<'_, Conversation, DbError> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.conversations.iter_mut().find(|c| {
                c.business_id == conversation.business_id
                    && c.session_id == conversation.session_id
            }) {
                *existing = conversation.clone();
            } else {
                inner.conversations.push(conversation.clone());
            }
            Ok(conversation)
        })
    }
}

impl ReminderRepository for MemoryStore {
    fn init_schema(&self) -> BoxFuture<'_, (), DbError> {
        Box::pin(async { Ok(()) })
    }

    fn insert(&self, reminder: Reminder) -> BoxFuture<'_, Reminder, DbError> {
        Box::pin(async move {
            self.inner.lock().unwrap().reminders.push(reminder.clone());
            Ok(reminder)
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'_, Option<Reminder>, DbError> {
        let id = id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner.reminders.iter().find(|r| r.id == id).cloned())
        })
    }

    fn for_appointment(&self, appointment_id: &str) -> BoxFuture<'_, Vec<Reminder>, DbError> {
        let appointment_id = appointment_id.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            let mut matches: Vec<Reminder> = inner
                .reminders
                .iter()
                .filter(|r| r.appointment_id == appointment_id)
                .cloned()
                .collect();
            matches.sort_by_key(|r| r.scheduled_at);
            Ok(matches)
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
            let mut inner = self.inner.lock().unwrap();
            if let Some(reminder) = inner.reminders.iter_mut().find(|r| r.id == id) {
                reminder.status = status;
                reminder.sent_at = sent_at;
            }
            Ok(())
        })
    }

    fn cancel_pending(&self, appointment_id: &str) -> BoxFuture<'_, u64, DbError> {
        let appointment_id = appointment_id.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            let mut transitioned = 0;
            for reminder in inner
                .reminders
                .iter_mut()
                .filter(|r| r.appointment_id == appointment_id && r.status == ReminderStatus::Pending)
            {
                reminder.status = ReminderStatus::Cancelled;
                transitioned += 1;
            }
            Ok(transitioned)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn appointment(id: &str, business_id: &str, start_offset_hours: i64) -> Appointment {
        let start = Utc::now() + Duration::hours(start_offset_hours);
        Appointment {
            id: id.to_string(),
            business_id: business_id.to_string(),
            customer_id: "cust-1".to_string(),
            service_id: "srv-1".to_string(),
            customer_name: "John Doe".to_string(),
            customer_phone: "+6512345678".to_string(),
            service_name: "Haircut".to_string(),
            start_at: start,
            end_at: start + Duration::hours(1),
            price_cents: Some(5000),
            status: AppointmentStatus::Pending,
            notes: None,
        }
    }

    #[tokio::test]
    async fn record_booking_increments_counter() {
        let store = MemoryStore::new();
        let first = store
            .record_booking("biz-1", "+6512345678", Some("John Doe"))
            .await
            .unwrap();
        assert_eq!(first.total_bookings, 1);

        let second = store.record_booking("biz-1", "+6512345678", None).await.unwrap();
        assert_eq!(second.total_bookings, 2);
        assert_eq!(second.name.as_deref(), Some("John Doe"));
    }

    #[tokio::test]
    async fn mark_cancelled_is_ownership_scoped() {
        let store = MemoryStore::new();
        AppointmentRepository::insert(&store, appointment("apt-1", "biz-1", 24))
            .await
            .unwrap();

        assert!(store.mark_cancelled("apt-1", "wrong-biz").await.unwrap().is_none());
        let cancelled = store.mark_cancelled("apt-1", "biz-1").await.unwrap().unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn upcoming_excludes_past_and_terminal() {
        let store = MemoryStore::new();
        AppointmentRepository::insert(&store, appointment("past", "biz-1", -2))
            .await
            .unwrap();
        AppointmentRepository::insert(&store, appointment("later", "biz-1", 48))
            .await
            .unwrap();
        AppointmentRepository::insert(&store, appointment("sooner", "biz-1", 24))
            .await
            .unwrap();
        let mut cancelled = appointment("gone", "biz-1", 12);
        cancelled.status = AppointmentStatus::Cancelled;
        AppointmentRepository::insert(&store, cancelled).await.unwrap();

        let upcoming = store
            .upcoming_for_phone("biz-1", "+6512345678", Utc::now())
            .await
            .unwrap();
        let ids: Vec<&str> = upcoming.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["sooner", "later"]);
    }
}
