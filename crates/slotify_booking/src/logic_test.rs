#[cfg(test)]
mod tests {
    use crate::logic::{BookingError, BookingManager, CreateBookingRequest};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use slotify_db::repositories::{
        Appointment, AppointmentRepository, AppointmentStatus, Business, BusinessRepository,
        CustomerRepository, Reminder, ReminderKind, ReminderRepository, ReminderStatus,
        ServiceOffering, ServiceOfferingRepository,
    };
    use slotify_db::MemoryStore;
    use std::sync::Arc;

    const TZ: chrono_tz::Tz = chrono_tz::Asia::Singapore;

    fn sgt(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        TZ.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        BusinessRepository::insert(
            store.as_ref(),
            Business {
                id: "biz-1".to_string(),
                name: "Test Salon".to_string(),
                timezone: Some("Asia/Singapore".to_string()),
                operating_hours: None,
                calendar_id: None,
                address: None,
                webhook_url: None,
            },
        )
        .await
        .unwrap();
        ServiceOfferingRepository::insert(
            store.as_ref(),
            ServiceOffering {
                id: "srv-1".to_string(),
                business_id: "biz-1".to_string(),
                name: "Haircut".to_string(),
                duration_min: 60,
                price_cents: Some(5000),
                description: None,
                is_active: true,
            },
        )
        .await
        .unwrap();
        store
    }

    fn manager(store: Arc<MemoryStore>) -> BookingManager {
        BookingManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            TZ,
        )
    }

    fn request(slot_id: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            business_id: "biz-1".to_string(),
            service_id: "srv-1".to_string(),
            customer_phone: "+6512345678".to_string(),
            customer_name: Some("John Doe".to_string()),
            slot_id: slot_id.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_booking_decodes_slot_and_snapshots_service() {
        let store = seeded_store().await;
        let manager = manager(store.clone());

        let appointment = manager
            .create_booking(request("2027-03-01-1000"))
            .await
            .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.start_at, sgt(2027, 3, 1, 10, 0));
        assert_eq!(appointment.end_at, appointment.start_at + Duration::minutes(60));
        assert_eq!(appointment.price_cents, Some(5000));
        assert_eq!(appointment.service_name, "Haircut");
        assert_eq!(appointment.customer_name, "John Doe");

        let customer = CustomerRepository::find_by_phone(store.as_ref(), "biz-1", "+6512345678")
            .await
            .unwrap()
            .expect("customer upserted");
        assert_eq!(customer.total_bookings, 1);
        assert_eq!(appointment.customer_id, customer.id);
    }

    #[tokio::test]
    async fn create_booking_rejects_unknown_service() {
        let store = seeded_store().await;
        let manager = manager(store);

        let result = manager
            .create_booking(CreateBookingRequest {
                service_id: "nonexistent".to_string(),
                ..request("2027-03-01-1000")
            })
            .await;

        assert!(matches!(result, Err(BookingError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_booking_rejects_malformed_slot_id() {
        let store = seeded_store().await;
        let manager = manager(store);

        let result = manager.create_booking(request("first-thing-tomorrow")).await;

        assert!(matches!(result, Err(BookingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn cancel_booking_is_ownership_scoped_and_cascades() {
        let store = seeded_store().await;
        let manager = manager(store.clone());

        let appointment = manager
            .create_booking(request("2027-03-01-1000"))
            .await
            .unwrap();
        for kind in [ReminderKind::DayBefore, ReminderKind::HourBefore] {
            ReminderRepository::insert(
                store.as_ref(),
                Reminder {
                    id: format!("rem-{}", kind.as_str()),
                    business_id: "biz-1".to_string(),
                    appointment_id: appointment.id.clone(),
                    kind,
                    scheduled_at: appointment.start_at - Duration::hours(1),
                    message: "reminder".to_string(),
                    status: ReminderStatus::Pending,
                    sent_at: None,
                },
            )
            .await
            .unwrap();
        }

        let wrong_owner = manager.cancel_booking(&appointment.id, "other-biz").await;
        assert!(matches!(wrong_owner, Err(BookingError::NotFound(_))));

        let cancelled = manager.cancel_booking(&appointment.id, "biz-1").await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let reminders = ReminderRepository::for_appointment(store.as_ref(), &appointment.id)
            .await
            .unwrap();
        assert_eq!(reminders.len(), 2);
        assert!(reminders.iter().all(|r| r.status == ReminderStatus::Cancelled));
    }

    #[tokio::test]
    async fn customer_appointments_are_future_and_ordered() {
        let store = seeded_store().await;
        let manager = manager(store.clone());

        let now = Utc::now();
        for (id, offset_hours, status) in [
            ("past", -3, AppointmentStatus::Pending),
            ("next-week", 7 * 24, AppointmentStatus::Confirmed),
            ("tomorrow", 24, AppointmentStatus::Pending),
            ("cancelled", 48, AppointmentStatus::Cancelled),
        ] {
            let start = now + Duration::hours(offset_hours);
            AppointmentRepository::insert(
                store.as_ref(),
                Appointment {
                    id: id.to_string(),
                    business_id: "biz-1".to_string(),
                    customer_id: "cust-1".to_string(),
                    service_id: "srv-1".to_string(),
                    customer_name: "John Doe".to_string(),
                    customer_phone: "+6512345678".to_string(),
                    service_name: "Haircut".to_string(),
                    start_at: start,
                    end_at: start + Duration::hours(1),
                    price_cents: Some(5000),
                    status,
                    notes: None,
                },
            )
            .await
            .unwrap();
        }

        let upcoming = manager
            .customer_appointments("biz-1", "+6512345678")
            .await
            .unwrap();

        let ids: Vec<&str> = upcoming.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["tomorrow", "next-week"]);
    }
}
