#[cfg(test)]
mod tests {
    use crate::logic::{ReminderEngine, REMINDER_EVENT};
    use crate::scheduler::NoopScheduler;
    use chrono::{Duration, Utc};
    use slotify_common::services::{
        DelayScheduler, InfallibleFuture, MessagingService, ScheduledEvent,
    };
    use slotify_db::repositories::{
        Appointment, AppointmentRepository, AppointmentStatus, Business, BusinessRepository,
        ReminderKind, ReminderRepository, ReminderStatus,
    };
    use slotify_db::MemoryStore;
    use std::sync::{Arc, Mutex};

    const TZ: chrono_tz::Tz = chrono_tz::Asia::Singapore;

    /// Messenger that records sends and answers with a fixed outcome.
    struct RecordingMessenger {
        delivered: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMessenger {
        fn new(delivered: bool) -> Arc<Self> {
            Arc::new(Self {
                delivered,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MessagingService for RecordingMessenger {
        fn send_text(&self, to: &str, body: &str) -> InfallibleFuture<'_, bool> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            let delivered = self.delivered;
            Box::pin(async move { delivered })
        }
    }

    /// Scheduler that records the wake requests it receives.
    #[derive(Default)]
    struct RecordingScheduler {
        events: Mutex<Vec<ScheduledEvent>>,
    }

    impl DelayScheduler for RecordingScheduler {
        fn schedule(&self, event: ScheduledEvent) -> InfallibleFuture<'_, ()> {
            self.events.lock().unwrap().push(event);
            Box::pin(async {})
        }
    }

    async fn seed_appointment(store: &MemoryStore, id: &str, start_offset: Duration) -> Appointment {
        BusinessRepository::insert(
            store,
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
        .ok();

        let start = Utc::now() + start_offset;
        AppointmentRepository::insert(
            store,
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
                status: AppointmentStatus::Pending,
                notes: None,
            },
        )
        .await
        .unwrap()
    }

    fn engine(
        store: Arc<MemoryStore>,
        messenger: Arc<RecordingMessenger>,
        scheduler: Arc<dyn DelayScheduler>,
    ) -> ReminderEngine {
        ReminderEngine::new(
            store.clone(),
            store.clone(),
            store,
            messenger,
            scheduler,
            TZ,
        )
    }

    #[tokio::test]
    async fn schedules_both_offsets_for_distant_appointment() {
        let store = Arc::new(MemoryStore::new());
        let appointment = seed_appointment(&store, "apt-1", Duration::hours(48)).await;
        let scheduler = Arc::new(RecordingScheduler::default());
        let engine = engine(
            store.clone(),
            RecordingMessenger::new(true),
            scheduler.clone(),
        );

        let created = engine.schedule_reminders("apt-1").await.unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].kind, ReminderKind::DayBefore);
        assert_eq!(created[0].scheduled_at, appointment.start_at - Duration::hours(24));
        assert_eq!(created[1].kind, ReminderKind::HourBefore);
        assert_eq!(created[1].scheduled_at, appointment.start_at - Duration::hours(1));
        assert!(created.iter().all(|r| r.status == ReminderStatus::Pending));
        assert!(created[0].message.contains("John Doe"));
        assert!(created[0].message.contains("Haircut"));

        let events = scheduler.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.name == REMINDER_EVENT));
        assert_eq!(events[0].wake_at, created[0].scheduled_at);
    }

    #[tokio::test]
    async fn skips_offsets_already_past() {
        let store = Arc::new(MemoryStore::new());
        seed_appointment(&store, "apt-1", Duration::hours(12)).await;
        let engine = engine(
            store.clone(),
            RecordingMessenger::new(true),
            Arc::new(NoopScheduler),
        );

        let created = engine.schedule_reminders("apt-1").await.unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].kind, ReminderKind::HourBefore);
    }

    #[tokio::test]
    async fn imminent_booking_gets_no_reminders() {
        let store = Arc::new(MemoryStore::new());
        seed_appointment(&store, "apt-1", Duration::minutes(30)).await;
        let engine = engine(
            store.clone(),
            RecordingMessenger::new(true),
            Arc::new(NoopScheduler),
        );

        let created = engine.schedule_reminders("apt-1").await.unwrap();

        assert!(created.is_empty());
        assert!(ReminderRepository::for_appointment(store.as_ref(), "apt-1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delivery_sends_stored_message_and_marks_sent() {
        let store = Arc::new(MemoryStore::new());
        seed_appointment(&store, "apt-1", Duration::hours(48)).await;
        let messenger = RecordingMessenger::new(true);
        let engine = engine(store.clone(), messenger.clone(), Arc::new(NoopScheduler));

        let created = engine.schedule_reminders("apt-1").await.unwrap();
        engine.deliver_reminder(&created[1].id).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+6512345678");
        assert!(sent[0].1.contains("See you in 1 hour!"));

        let reminder = ReminderRepository::find_by_id(store.as_ref(), &created[1].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reminder.status, ReminderStatus::Sent);
        assert!(reminder.sent_at.is_some());
    }

    #[tokio::test]
    async fn delivery_aborts_for_cancelled_appointment() {
        let store = Arc::new(MemoryStore::new());
        seed_appointment(&store, "apt-1", Duration::hours(48)).await;
        let messenger = RecordingMessenger::new(true);
        let engine = engine(store.clone(), messenger.clone(), Arc::new(NoopScheduler));

        let created = engine.schedule_reminders("apt-1").await.unwrap();
        store.mark_cancelled("apt-1", "biz-1").await.unwrap();
        engine.deliver_reminder(&created[0].id).await.unwrap();

        assert!(messenger.sent().is_empty());
        // No side effect on the reminder row either
        let reminder = ReminderRepository::find_by_id(store.as_ref(), &created[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reminder.status, ReminderStatus::Pending);
    }

    #[tokio::test]
    async fn failed_send_is_terminal_for_the_reminder() {
        let store = Arc::new(MemoryStore::new());
        seed_appointment(&store, "apt-1", Duration::hours(48)).await;
        let messenger = RecordingMessenger::new(false);
        let engine = engine(store.clone(), messenger.clone(), Arc::new(NoopScheduler));

        let created = engine.schedule_reminders("apt-1").await.unwrap();
        engine.deliver_reminder(&created[0].id).await.unwrap();

        let reminder = ReminderRepository::find_by_id(store.as_ref(), &created[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reminder.status, ReminderStatus::Failed);
        assert!(reminder.sent_at.is_none());

        // Redelivery after failure stays a no-op: no retry semantics
        engine.deliver_reminder(&created[0].id).await.unwrap();
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn cancel_reminders_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        seed_appointment(&store, "apt-1", Duration::hours(48)).await;
        let engine = engine(
            store.clone(),
            RecordingMessenger::new(true),
            Arc::new(NoopScheduler),
        );

        engine.schedule_reminders("apt-1").await.unwrap();
        assert_eq!(engine.cancel_reminders("apt-1").await.unwrap(), 2);
        assert_eq!(engine.cancel_reminders("apt-1").await.unwrap(), 0);
    }
}
