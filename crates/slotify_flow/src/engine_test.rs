#[cfg(test)]
mod tests {
    use crate::engine::ConversationEngine;
    use crate::state::{BookingState, BookingStep};
    use chrono::{Duration, Utc};
    use slotify_availability::Availability;
    use slotify_booking::BookingManager;
    use slotify_common::services::{
        ChatMessage, ClassifiedIntent, InfallibleFuture, IntentClassifier, IntentEntities,
        IntentKind, MessagingService,
    };
    use slotify_db::repositories::{
        Appointment, AppointmentFilter, AppointmentRepository, AppointmentStatus, Business,
        BusinessRepository, ConversationRepository, Reminder, ReminderKind, ReminderRepository,
        ReminderStatus, ServiceOffering, ServiceOfferingRepository,
    };
    use slotify_db::MemoryStore;
    use slotify_reminders::{NoopScheduler, ReminderEngine};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const TZ: chrono_tz::Tz = chrono_tz::Asia::Singapore;
    const BIZ: &str = "biz-1";
    const PHONE: &str = "+6512345678";

    struct StubClassifier {
        classify: Box<dyn Fn(&str) -> ClassifiedIntent + Send + Sync>,
        calls: AtomicU32,
    }

    impl StubClassifier {
        fn new(
            classify: impl Fn(&str) -> ClassifiedIntent + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                classify: Box::new(classify),
                calls: AtomicU32::new(0),
            })
        }
    }

    impl IntentClassifier for StubClassifier {
        fn classify(
            &self,
            text: &str,
            _history: &[ChatMessage],
        ) -> InfallibleFuture<'_, ClassifiedIntent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = (self.classify)(text);
            Box::pin(async move { result })
        }
    }

    struct SilentMessenger;

    impl MessagingService for SilentMessenger {
        fn send_text(&self, _to: &str, _body: &str) -> InfallibleFuture<'_, bool> {
            Box::pin(async { true })
        }
    }

    fn book_intent(service: Option<&str>) -> ClassifiedIntent {
        ClassifiedIntent {
            intent: IntentKind::Book,
            confidence: 0.9,
            entities: IntentEntities {
                service: service.map(|s| s.to_string()),
                ..Default::default()
            },
        }
    }

    fn intent(kind: IntentKind) -> ClassifiedIntent {
        ClassifiedIntent {
            intent: kind,
            confidence: 0.9,
            entities: IntentEntities::default(),
        }
    }

    /// Operating hours that open a single full day two days out, so the
    /// first offered slot is always more than 24 hours away.
    fn hours_two_days_out(window: &str) -> (serde_json::Value, chrono::NaiveDate) {
        let target = (Utc::now().with_timezone(&TZ) + Duration::days(2)).date_naive();
        let day_name = target.format("%A").to_string().to_lowercase();
        let mut map = serde_json::Map::new();
        map.insert(day_name, serde_json::json!([window]));
        (serde_json::Value::Object(map), target)
    }

    async fn seed_business(store: &MemoryStore, hours: Option<serde_json::Value>) {
        BusinessRepository::insert(
            store,
            Business {
                id: BIZ.to_string(),
                name: "Test Salon".to_string(),
                timezone: Some("Asia/Singapore".to_string()),
                operating_hours: hours,
                calendar_id: None,
                address: None,
                webhook_url: None,
            },
        )
        .await
        .unwrap();
    }

    async fn seed_service(store: &MemoryStore, id: &str, name: &str, duration_min: i64) {
        ServiceOfferingRepository::insert(
            store,
            ServiceOffering {
                id: id.to_string(),
                business_id: BIZ.to_string(),
                name: name.to_string(),
                duration_min,
                price_cents: Some(5000),
                description: None,
                is_active: true,
            },
        )
        .await
        .unwrap();
    }

    fn make_engine(store: Arc<MemoryStore>, classifier: Arc<StubClassifier>) -> ConversationEngine {
        let availability = Arc::new(Availability::new(store.clone(), store.clone(), None, TZ));
        let booking = Arc::new(BookingManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            TZ,
        ));
        let reminders = Arc::new(ReminderEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(SilentMessenger),
            Arc::new(NoopScheduler),
            TZ,
        ));
        ConversationEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            availability,
            booking,
            reminders,
            classifier,
            TZ,
        )
    }

    async fn booking_state(store: &MemoryStore) -> Option<BookingState> {
        ConversationRepository::find_by_session(store, BIZ, PHONE)
            .await
            .unwrap()
            .and_then(|c| c.booking_state.as_ref().and_then(BookingState::from_value))
    }

    #[tokio::test]
    async fn happy_path_books_first_offered_slot() {
        let store = Arc::new(MemoryStore::new());
        let (hours, target) = hours_two_days_out("09:00-18:00");
        seed_business(&store, Some(hours)).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier = StubClassifier::new(|_| book_intent(Some("haircut")));
        let engine = make_engine(store.clone(), classifier);

        let offer = engine
            .handle_inbound_message(BIZ, PHONE, "book a haircut")
            .await;
        assert!(offer.contains("Available times for Haircut"));
        assert!(offer.contains("Reply with the number (1-5)"));
        let state = booking_state(&store).await.expect("state persisted");
        assert_eq!(state.step, BookingStep::Time);
        assert_eq!(state.service_id.as_deref(), Some("srv-1"));

        let summary = engine.handle_inbound_message(BIZ, PHONE, "1").await;
        assert!(summary.contains("Booking Summary"));
        assert!(summary.contains("Haircut"));
        let state = booking_state(&store).await.expect("state persisted");
        assert_eq!(state.step, BookingStep::Confirm);
        let expected_slot_id = format!("{}-0900", target.format("%Y-%m-%d"));
        assert_eq!(state.selected_slot_id.as_deref(), Some(expected_slot_id.as_str()));

        let confirmed = engine.handle_inbound_message(BIZ, PHONE, "yes").await;
        assert!(confirmed.contains("Booking confirmed!"));
        assert!(booking_state(&store).await.is_none());

        let appointments = AppointmentRepository::list(
            store.as_ref(),
            BIZ,
            AppointmentFilter::default(),
        )
        .await
        .unwrap();
        assert_eq!(appointments.len(), 1);
        let appointment = &appointments[0];
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(
            appointment.start_at,
            slotify_availability::parse_slot_id(&expected_slot_id, TZ).unwrap()
        );
        assert_eq!(appointment.customer_phone, PHONE);

        let reminders = ReminderRepository::for_appointment(store.as_ref(), &appointment.id)
            .await
            .unwrap();
        assert_eq!(reminders.len(), 2);
        let now = Utc::now();
        assert_eq!(reminders[0].kind, ReminderKind::DayBefore);
        assert_eq!(reminders[0].scheduled_at, appointment.start_at - Duration::hours(24));
        assert_eq!(reminders[1].kind, ReminderKind::HourBefore);
        assert_eq!(reminders[1].scheduled_at, appointment.start_at - Duration::hours(1));
        assert!(reminders.iter().all(|r| r.scheduled_at > now));

        let conversation = ConversationRepository::find_by_session(store.as_ref(), BIZ, PHONE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.intent.as_deref(), Some("book_complete"));
    }

    #[tokio::test]
    async fn out_of_range_selection_reprompts_with_valid_range() {
        let store = Arc::new(MemoryStore::new());
        // 09:00-11:00 with 60-minute slots offers exactly 3 starts
        let (hours, _) = hours_two_days_out("09:00-11:00");
        seed_business(&store, Some(hours)).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier = StubClassifier::new(|_| book_intent(Some("haircut")));
        let engine = make_engine(store.clone(), classifier);

        let offer = engine.handle_inbound_message(BIZ, PHONE, "book a haircut").await;
        assert!(offer.contains("Reply with the number (1-3)"));

        let reprompt = engine.handle_inbound_message(BIZ, PHONE, "9").await;
        assert!(reprompt.contains("between 1 and 3"));
        assert_eq!(booking_state(&store).await.unwrap().step, BookingStep::Time);

        // The flow is still selectable after the re-prompt
        let summary = engine.handle_inbound_message(BIZ, PHONE, "2").await;
        assert!(summary.contains("Booking Summary"));
    }

    #[tokio::test]
    async fn digit_replies_bypass_the_classifier_while_selecting() {
        let store = Arc::new(MemoryStore::new());
        let (hours, _) = hours_two_days_out("09:00-18:00");
        seed_business(&store, Some(hours)).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier = StubClassifier::new(|_| book_intent(Some("haircut")));
        let engine = make_engine(store.clone(), classifier.clone());

        engine.handle_inbound_message(BIZ, PHONE, "book a haircut").await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

        engine.handle_inbound_message(BIZ, PHONE, "1").await;
        engine.handle_inbound_message(BIZ, PHONE, "yes").await;
        // Neither the slot digit nor the confirmation word reached the
        // classifier.
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declining_clears_the_flow() {
        let store = Arc::new(MemoryStore::new());
        let (hours, _) = hours_two_days_out("09:00-18:00");
        seed_business(&store, Some(hours)).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier =
            StubClassifier::new(|text| {
                if text.contains("book") {
                    book_intent(Some("haircut"))
                } else {
                    ClassifiedIntent::fallback()
                }
            });
        let engine = make_engine(store.clone(), classifier);

        engine.handle_inbound_message(BIZ, PHONE, "book a haircut").await;
        engine.handle_inbound_message(BIZ, PHONE, "1").await;
        let declined = engine.handle_inbound_message(BIZ, PHONE, "no").await;
        assert!(declined.contains("No problem!"));
        assert!(booking_state(&store).await.is_none());

        // With no booking state a digit is just text again and falls through
        // to classification.
        let reply = engine.handle_inbound_message(BIZ, PHONE, "1").await;
        assert!(reply.contains("booking assistant"));

        let conversation = ConversationRepository::find_by_session(store.as_ref(), BIZ, PHONE)
            .await
            .unwrap()
            .unwrap();
        assert!(AppointmentRepository::list(store.as_ref(), BIZ, AppointmentFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(conversation.intent.as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn unrecognized_confirmation_reply_reprompts() {
        let store = Arc::new(MemoryStore::new());
        let (hours, _) = hours_two_days_out("09:00-18:00");
        seed_business(&store, Some(hours)).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier = StubClassifier::new(|_| book_intent(Some("haircut")));
        let engine = make_engine(store.clone(), classifier);

        engine.handle_inbound_message(BIZ, PHONE, "book a haircut").await;
        engine.handle_inbound_message(BIZ, PHONE, "1").await;

        let reprompt = engine.handle_inbound_message(BIZ, PHONE, "what about parking?").await;
        assert!(reprompt.contains("\"yes\" to confirm"));
        assert_eq!(booking_state(&store).await.unwrap().step, BookingStep::Confirm);

        let confirmed = engine.handle_inbound_message(BIZ, PHONE, "okay").await;
        assert!(confirmed.contains("Booking confirmed!"));
    }

    #[tokio::test]
    async fn multiple_services_render_a_menu_without_state() {
        let store = Arc::new(MemoryStore::new());
        let (hours, _) = hours_two_days_out("09:00-18:00");
        seed_business(&store, Some(hours)).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        seed_service(&store, "srv-2", "Beard Trim", 30).await;
        let classifier = StubClassifier::new(|_| book_intent(None));
        let engine = make_engine(store.clone(), classifier);

        let menu = engine.handle_inbound_message(BIZ, PHONE, "I want to book").await;
        assert!(menu.contains("What service would you like to book?"));
        assert!(menu.contains("1. Haircut (60min - $50)"));
        assert!(menu.contains("2. Beard Trim (30min - $50)"));
        // The menu is implicit: no slot state yet
        assert!(booking_state(&store).await.is_none());
    }

    #[tokio::test]
    async fn cancel_intent_cancels_next_appointment_and_reminders() {
        let store = Arc::new(MemoryStore::new());
        seed_business(&store, None).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;

        let start = Utc::now() + Duration::hours(48);
        AppointmentRepository::insert(
            store.as_ref(),
            Appointment {
                id: "apt-1".to_string(),
                business_id: BIZ.to_string(),
                customer_id: "cust-1".to_string(),
                service_id: "srv-1".to_string(),
                customer_name: "John Doe".to_string(),
                customer_phone: PHONE.to_string(),
                service_name: "Haircut".to_string(),
                start_at: start,
                end_at: start + Duration::hours(1),
                price_cents: Some(5000),
                status: AppointmentStatus::Pending,
                notes: None,
            },
        )
        .await
        .unwrap();
        ReminderRepository::insert(
            store.as_ref(),
            Reminder {
                id: "rem-1".to_string(),
                business_id: BIZ.to_string(),
                appointment_id: "apt-1".to_string(),
                kind: ReminderKind::DayBefore,
                scheduled_at: start - Duration::hours(24),
                message: "reminder".to_string(),
                status: ReminderStatus::Pending,
                sent_at: None,
            },
        )
        .await
        .unwrap();

        let classifier = StubClassifier::new(|_| intent(IntentKind::Cancel));
        let engine = make_engine(store.clone(), classifier);

        let reply = engine.handle_inbound_message(BIZ, PHONE, "cancel my appointment").await;
        assert!(reply.contains("Haircut"));
        assert!(reply.contains("has been cancelled"));

        let appointment = AppointmentRepository::find_by_id(store.as_ref(), "apt-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Cancelled);
        let reminder = ReminderRepository::find_by_id(store.as_ref(), "rem-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reminder.status, ReminderStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_intent_without_appointments_offers_booking() {
        let store = Arc::new(MemoryStore::new());
        seed_business(&store, None).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier = StubClassifier::new(|_| intent(IntentKind::Cancel));
        let engine = make_engine(store.clone(), classifier);

        let reply = engine.handle_inbound_message(BIZ, PHONE, "cancel it").await;
        assert!(reply.contains("don't have any upcoming appointments"));
    }

    #[tokio::test]
    async fn faq_intent_lists_configured_hours() {
        let store = Arc::new(MemoryStore::new());
        seed_business(
            &store,
            Some(serde_json::json!({
                "monday": ["09:00-12:00", "14:00-18:00"],
                "saturday": ["09:00-14:00"],
            })),
        )
        .await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier = StubClassifier::new(|_| intent(IntentKind::Faq));
        let engine = make_engine(store.clone(), classifier);

        let reply = engine.handle_inbound_message(BIZ, PHONE, "when are you open?").await;
        assert!(reply.contains("Monday: 09:00-12:00, 14:00-18:00"));
        assert!(reply.contains("Saturday: 09:00-14:00"));
        assert!(reply.contains("Sunday: Closed"));
    }

    #[tokio::test]
    async fn classifier_fallback_gets_a_greeting() {
        let store = Arc::new(MemoryStore::new());
        seed_business(&store, None).await;
        seed_service(&store, "srv-1", "Haircut", 60).await;
        let classifier = StubClassifier::new(|_| ClassifiedIntent::fallback());
        let engine = make_engine(store.clone(), classifier);

        let reply = engine.handle_inbound_message(BIZ, PHONE, "ws-9921 asdf").await;
        assert!(reply.contains("booking assistant"));
        assert!(reply.contains("Haircut"));

        // History carries both turns of the exchange
        let conversation = ConversationRepository::find_by_session(store.as_ref(), BIZ, PHONE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, "user");
        assert_eq!(conversation.messages[1].role, "assistant");
    }
}
