// File: services/slotify_backend/src/app_state.rs
//! Service wiring.
//!
//! Repositories come from SQL when a database is configured and fall back to
//! the in-memory store otherwise; every engine is built once here and shared
//! behind Arcs.

use chrono_tz::Tz;
use slotify_availability::Availability;
use slotify_booking::BookingManager;
use slotify_common::services::{
    ClassifiedIntent, DelayScheduler, InfallibleFuture, IntentClassifier, MessagingService,
};
use slotify_common::SlotifyError;
use slotify_config::AppConfig;
use slotify_db::repositories::{
    AppointmentRepository, BusinessRepository, ConversationRepository, CustomerRepository,
    ReminderRepository, ServiceOfferingRepository, SqlAppointmentRepository,
    SqlBusinessRepository, SqlConversationRepository, SqlCustomerRepository,
    SqlReminderRepository, SqlServiceOfferingRepository,
};
use slotify_db::{DbClient, MemoryStore};
use slotify_flow::ConversationEngine;
use slotify_intent::GatewayIntentClassifier;
use slotify_reminders::{NoopScheduler, ReminderEngine, TokioDelayScheduler};
use slotify_whatsapp::WhatsAppSender;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Singapore;

struct Repositories {
    businesses: Arc<dyn BusinessRepository>,
    services: Arc<dyn ServiceOfferingRepository>,
    customers: Arc<dyn CustomerRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    conversations: Arc<dyn ConversationRepository>,
    reminders: Arc<dyn ReminderRepository>,
}

/// Classifier used when no LLM gateway is enabled: every message lands on
/// the neutral fallback and the state machine's pattern handling carries
/// the flow.
struct DisabledClassifier;

impl IntentClassifier for DisabledClassifier {
    fn classify(
        &self,
        _text: &str,
        _history: &[slotify_common::services::ChatMessage],
    ) -> InfallibleFuture<'_, ClassifiedIntent> {
        Box::pin(async { ClassifiedIntent::fallback() })
    }
}

pub struct AppState {
    pub availability: Arc<Availability>,
    pub booking: Arc<BookingManager>,
    pub reminders: Arc<ReminderEngine>,
    pub engine: Arc<ConversationEngine>,
    pub sender: Arc<WhatsAppSender>,
    pub businesses: Arc<dyn BusinessRepository>,
}

impl AppState {
    pub async fn initialize(config: Arc<AppConfig>) -> Result<Self, SlotifyError> {
        let repos = build_repositories(&config).await?;

        let default_timezone = config
            .booking
            .as_ref()
            .and_then(|b| b.default_timezone.as_deref())
            .and_then(|name| name.parse().ok())
            .unwrap_or(DEFAULT_TIMEZONE);

        // The external calendar is a collaborator seam; no provider is wired
        // in this build, so availability treats every calendar as open.
        if config.use_calendar {
            warn!("use_calendar is set but no calendar provider is configured");
        }
        let availability = Arc::new(Availability::new(
            repos.businesses.clone(),
            repos.services.clone(),
            None,
            default_timezone,
        ));

        let booking = Arc::new(BookingManager::new(
            repos.businesses.clone(),
            repos.services.clone(),
            repos.customers.clone(),
            repos.appointments.clone(),
            repos.reminders.clone(),
            default_timezone,
        ));

        let sender = Arc::new(WhatsAppSender::new(&config));
        let messenger: Arc<dyn MessagingService> = sender.clone();

        // Delivery runs with a no-op scheduler: delivering never schedules
        // further work.
        let delivery_engine = Arc::new(ReminderEngine::new(
            repos.businesses.clone(),
            repos.appointments.clone(),
            repos.reminders.clone(),
            messenger.clone(),
            Arc::new(NoopScheduler),
            default_timezone,
        ));
        let scheduler: Arc<dyn DelayScheduler> =
            Arc::new(TokioDelayScheduler::new(delivery_engine));
        let reminders = Arc::new(ReminderEngine::new(
            repos.businesses.clone(),
            repos.appointments.clone(),
            repos.reminders.clone(),
            messenger,
            scheduler,
            default_timezone,
        ));

        let classifier: Arc<dyn IntentClassifier> = match (&config.use_llm, &config.llm) {
            (true, Some(llm)) => Arc::new(GatewayIntentClassifier::new(llm)),
            _ => {
                warn!("LLM gateway disabled; intent classification falls back to 'other'");
                Arc::new(DisabledClassifier)
            }
        };

        let engine = Arc::new(ConversationEngine::new(
            repos.businesses.clone(),
            repos.services.clone(),
            repos.customers.clone(),
            repos.conversations.clone(),
            availability.clone(),
            booking.clone(),
            reminders.clone(),
            classifier,
            default_timezone,
        ));

        Ok(Self {
            availability,
            booking,
            reminders,
            engine,
            sender,
            businesses: repos.businesses,
        })
    }
}

async fn build_repositories(config: &AppConfig) -> Result<Repositories, SlotifyError> {
    match &config.database {
        Some(_) => {
            let client = DbClient::new(config).await?;

            let businesses = Arc::new(SqlBusinessRepository::new(client.clone()));
            let services = Arc::new(SqlServiceOfferingRepository::new(client.clone()));
            let customers = Arc::new(SqlCustomerRepository::new(client.clone()));
            let appointments = Arc::new(SqlAppointmentRepository::new(client.clone()));
            let conversations = Arc::new(SqlConversationRepository::new(client.clone()));
            let reminders = Arc::new(SqlReminderRepository::new(client));

            businesses.init_schema().await?;
            services.init_schema().await?;
            customers.init_schema().await?;
            appointments.init_schema().await?;
            conversations.init_schema().await?;
            reminders.init_schema().await?;
            info!("Database schema initialized");

            Ok(Repositories {
                businesses,
                services,
                customers,
                appointments,
                conversations,
                reminders,
            })
        }
        None => {
            warn!("No database configured; using the in-memory store");
            let store = Arc::new(MemoryStore::new());
            Ok(Repositories {
                businesses: store.clone(),
                services: store.clone(),
                customers: store.clone(),
                appointments: store.clone(),
                conversations: store.clone(),
                reminders: store,
            })
        }
    }
}
