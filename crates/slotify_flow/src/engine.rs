// --- File: crates/slotify_flow/src/engine.rs ---
//! The conversation engine.
//!
//! Every inbound message is one pure transition: read the persisted
//! conversation, compute (reply, next state), write the conversation back.
//! Nothing is held in memory between turns, so any instance can pick up any
//! session.
//!
//! Interception order matters: while a booking flow is mid-way, the raw
//! reply is matched against the awaited pattern (yes/no words in `confirm`,
//! a single digit in `time`) BEFORE the classifier runs, so a "1" always
//! means "slot 1" in the `time` step even if it would classify as something
//! else. Classification is only invoked when no state-specific pattern
//! matches.

use crate::state::{intent_label, BookingState, BookingStep};
use crate::templates;
use chrono_tz::Tz;
use slotify_availability::{
    Availability, AvailabilityError, OperatingHours, SlotRequest,
};
use slotify_booking::{BookingError, BookingManager, CreateBookingRequest};
use slotify_common::services::{ChatMessage, ClassifiedIntent, IntentClassifier, IntentKind};
use slotify_db::repositories::{
    Business, BusinessRepository, Conversation, ConversationRepository, Customer,
    CustomerRepository, ServiceOffering, ServiceOfferingRepository,
};
use slotify_db::DbError;
use slotify_reminders::ReminderEngine;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Rolling history kept on the conversation record.
const HISTORY_MAX: usize = 20;

const YES_WORDS: [&str; 7] = ["yes", "yep", "sure", "confirm", "ok", "okay", "y"];
const NO_WORDS: [&str; 3] = ["no", "nope", "cancel"];

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error(transparent)]
    Availability(#[from] AvailabilityError),
    #[error(transparent)]
    Booking(#[from] BookingError),
}

/// What one turn decided: the reply to send, the intent label to store, and
/// what happens to the persisted booking state.
struct Turn {
    reply: String,
    intent: Option<&'static str>,
    state: StateChange,
}

enum StateChange {
    Keep,
    Set(BookingState),
    Clear,
}

impl Turn {
    fn keep(reply: String, intent: Option<&'static str>) -> Self {
        Self {
            reply,
            intent,
            state: StateChange::Keep,
        }
    }
}

/// The booking state machine, wired to its collaborators.
pub struct ConversationEngine {
    businesses: Arc<dyn BusinessRepository>,
    services: Arc<dyn ServiceOfferingRepository>,
    customers: Arc<dyn CustomerRepository>,
    conversations: Arc<dyn ConversationRepository>,
    availability: Arc<Availability>,
    booking: Arc<BookingManager>,
    reminders: Arc<ReminderEngine>,
    classifier: Arc<dyn IntentClassifier>,
    default_timezone: Tz,
}

impl ConversationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        services: Arc<dyn ServiceOfferingRepository>,
        customers: Arc<dyn CustomerRepository>,
        conversations: Arc<dyn ConversationRepository>,
        availability: Arc<Availability>,
        booking: Arc<BookingManager>,
        reminders: Arc<ReminderEngine>,
        classifier: Arc<dyn IntentClassifier>,
        default_timezone: Tz,
    ) -> Self {
        Self {
            businesses,
            services,
            customers,
            conversations,
            availability,
            booking,
            reminders,
            classifier,
            default_timezone,
        }
    }

    /// State-machine entry point: one inbound message in, one reply out.
    ///
    /// Any unresolved error degrades to a generic apology; the conversation
    /// is left as last persisted.
    pub async fn handle_inbound_message(
        &self,
        business_id: &str,
        from: &str,
        text: &str,
    ) -> String {
        match self.process(business_id, from, text).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("Message processing failed for session {}: {}", from, err);
                templates::technical_error()
            }
        }
    }

    async fn process(
        &self,
        business_id: &str,
        from: &str,
        text: &str,
    ) -> Result<String, FlowError> {
        let text = text.trim();
        let normalized = text.to_lowercase();

        let customer = self.customers.record_contact(business_id, from, None).await?;
        let mut conversation = self
            .conversations
            .find_by_session(business_id, from)
            .await?
            .unwrap_or_else(|| Conversation::new(business_id, from, from));

        let Some(business) = self.businesses.find_by_id(business_id).await? else {
            warn!("Inbound message for unknown business {}", business_id);
            return Ok(templates::technical_error());
        };
        let services = self.services.find_active(business_id).await?;

        let state = conversation
            .booking_state
            .as_ref()
            .and_then(BookingState::from_value);

        let turn = match &state {
            Some(state) if state.step == BookingStep::Confirm => {
                self.handle_confirm_reply(&business, state, &customer, &normalized)
                    .await?
            }
            Some(state) if state.step == BookingStep::Time && is_slot_digit(&normalized) => {
                let selection: usize = normalized.parse().expect("digit already matched");
                self.handle_slot_selection(&business, state, selection).await?
            }
            _ => {
                let intent = self.classifier.classify(text, &conversation.messages).await;
                debug!(
                    "Classified '{}' as {:?} ({:.2})",
                    text, intent.intent, intent.confidence
                );
                self.route_intent(&business, &services, &customer, &intent)
                    .await?
            }
        };

        conversation.messages.push(ChatMessage::user(text));
        conversation.messages.push(ChatMessage::assistant(&turn.reply));
        if conversation.messages.len() > HISTORY_MAX {
            let excess = conversation.messages.len() - HISTORY_MAX;
            conversation.messages.drain(..excess);
        }
        if let Some(intent) = turn.intent {
            conversation.intent = Some(intent.to_string());
        }
        match turn.state {
            StateChange::Keep => {}
            StateChange::Set(state) => conversation.booking_state = Some(state.to_value()),
            StateChange::Clear => conversation.booking_state = None,
        }
        self.conversations.upsert(conversation).await?;

        Ok(turn.reply)
    }

    // --- confirm step ---

    async fn handle_confirm_reply(
        &self,
        business: &Business,
        state: &BookingState,
        customer: &Customer,
        normalized: &str,
    ) -> Result<Turn, FlowError> {
        if YES_WORDS.contains(&normalized) {
            return self.confirm_booking(business, state, customer).await;
        }
        if NO_WORDS.contains(&normalized) {
            return Ok(Turn {
                reply: templates::booking_declined(),
                intent: Some("other"),
                state: StateChange::Clear,
            });
        }
        Ok(Turn::keep(templates::confirm_reprompt(), None))
    }

    async fn confirm_booking(
        &self,
        business: &Business,
        state: &BookingState,
        customer: &Customer,
    ) -> Result<Turn, FlowError> {
        let (Some(service_id), Some(slot_id)) = (&state.service_id, &state.selected_slot_id)
        else {
            return Ok(Turn {
                reply: templates::start_over(),
                intent: Some("other"),
                state: StateChange::Clear,
            });
        };

        let created = self
            .booking
            .create_booking(CreateBookingRequest {
                business_id: business.id.clone(),
                service_id: service_id.clone(),
                customer_phone: customer.phone.clone(),
                customer_name: customer.name.clone(),
                slot_id: slot_id.clone(),
                notes: None,
            })
            .await;

        let appointment = match created {
            Ok(appointment) => appointment,
            Err(err) => {
                error!("Booking creation failed: {}", err);
                return Ok(Turn::keep(templates::booking_failed(), None));
            }
        };

        // Reminder scheduling failures must not take down a booking that
        // already exists.
        if let Err(err) = self.reminders.schedule_reminders(&appointment.id).await {
            warn!(
                "Reminder scheduling failed for appointment {}: {}",
                appointment.id, err
            );
        }

        Ok(Turn {
            reply: templates::booking_confirmed(
                state.slot_date.as_deref().unwrap_or_default(),
                state.slot_time.as_deref().unwrap_or_default(),
            ),
            intent: Some("book_complete"),
            state: StateChange::Clear,
        })
    }

    // --- time step ---

    async fn handle_slot_selection(
        &self,
        business: &Business,
        state: &BookingState,
        selection: usize,
    ) -> Result<Turn, FlowError> {
        let Some(service_id) = &state.service_id else {
            return Ok(Turn {
                reply: templates::start_over(),
                intent: Some("other"),
                state: StateChange::Clear,
            });
        };
        let Some(service) = self.services.find_by_id(service_id).await? else {
            return Ok(Turn {
                reply: templates::start_over(),
                intent: Some("other"),
                state: StateChange::Clear,
            });
        };

        // Re-run generation with the same inputs as the offer. The index is
        // only as stable as the regeneration: if the clock has passed an
        // offered slot or a busy block appeared since, the mapping drifts.
        let computation = self
            .availability
            .get_available_slots(&SlotRequest {
                business_id: business.id.clone(),
                service_id: Some(service.id.clone()),
                duration_min: Some(service.duration_min),
                ..Default::default()
            })
            .await?;
        let slots = computation.slots;

        if selection < 1 || selection > slots.len() {
            let max = slots.len().min(templates::DISPLAY_MAX);
            return Ok(Turn::keep(templates::invalid_selection(max), None));
        }

        let selected = &slots[selection - 1];
        Ok(Turn {
            reply: templates::booking_summary(
                state.service_name.as_deref().unwrap_or(&service.name),
                selected,
            ),
            intent: Some("book_pending"),
            state: StateChange::Set(state.with_selection(selected)),
        })
    }

    // --- intent routing ---

    async fn route_intent(
        &self,
        business: &Business,
        services: &[ServiceOffering],
        customer: &Customer,
        intent: &ClassifiedIntent,
    ) -> Result<Turn, FlowError> {
        match intent.intent {
            IntentKind::Book => self.handle_booking_intent(business, services, intent).await,
            IntentKind::Inquire => Ok(handle_inquiry_intent(services, intent)),
            IntentKind::Cancel => self.handle_cancellation_intent(business, customer).await,
            IntentKind::Faq => Ok(handle_faq_intent(business)),
            IntentKind::Reschedule | IntentKind::Other => Ok(Turn::keep(
                templates::greeting(business, services),
                Some(intent_label(intent.intent)),
            )),
        }
    }

    async fn handle_booking_intent(
        &self,
        business: &Business,
        services: &[ServiceOffering],
        intent: &ClassifiedIntent,
    ) -> Result<Turn, FlowError> {
        if let Some(wanted) = &intent.entities.service {
            let wanted = wanted.to_lowercase();
            if let Some(service) = services
                .iter()
                .find(|s| s.name.to_lowercase().contains(&wanted))
            {
                return self.offer_slots(business, service).await;
            }
        }

        match services {
            [] => Ok(Turn::keep(templates::no_services(), Some("book"))),
            [only] => self.offer_slots(business, only).await,
            _ => Ok(Turn::keep(templates::service_menu(services), Some("book"))),
        }
    }

    async fn offer_slots(
        &self,
        business: &Business,
        service: &ServiceOffering,
    ) -> Result<Turn, FlowError> {
        let computation = self
            .availability
            .get_available_slots(&SlotRequest {
                business_id: business.id.clone(),
                service_id: Some(service.id.clone()),
                duration_min: Some(service.duration_min),
                ..Default::default()
            })
            .await?;

        if computation.slots.is_empty() {
            return Ok(Turn::keep(templates::no_slots(&service.name), Some("book")));
        }

        Ok(Turn {
            reply: templates::slot_list(&service.name, &computation.slots),
            intent: Some("book_pending"),
            state: StateChange::Set(BookingState::awaiting_time(&service.id, &service.name)),
        })
    }

    async fn handle_cancellation_intent(
        &self,
        business: &Business,
        customer: &Customer,
    ) -> Result<Turn, FlowError> {
        let upcoming = self
            .booking
            .customer_appointments(&business.id, &customer.phone)
            .await?;
        let Some(next) = upcoming.first() else {
            return Ok(Turn::keep(
                templates::no_upcoming_appointments(),
                Some("cancel"),
            ));
        };

        let cancelled = self.booking.cancel_booking(&next.id, &business.id).await?;
        let tz = slotify_availability::business_timezone(business, self.default_timezone);
        let when = cancelled
            .start_at
            .with_timezone(&tz)
            .format("%A, %B %-d at %-I:%M %p")
            .to_string();

        Ok(Turn {
            reply: templates::cancellation_confirmed(&cancelled.service_name, &when),
            intent: Some("cancel"),
            state: StateChange::Clear,
        })
    }
}

fn handle_inquiry_intent(services: &[ServiceOffering], intent: &ClassifiedIntent) -> Turn {
    if let Some(wanted) = &intent.entities.service {
        let wanted = wanted.to_lowercase();
        if let Some(service) = services
            .iter()
            .find(|s| s.name.to_lowercase().contains(&wanted))
        {
            return Turn::keep(templates::service_details(service), Some("inquire"));
        }
    }
    Turn::keep(templates::which_service(), Some("inquire"))
}

fn handle_faq_intent(business: &Business) -> Turn {
    let reply = match business
        .operating_hours
        .as_ref()
        .and_then(OperatingHours::parse)
    {
        Some(hours) => templates::hours(business, &hours),
        None => templates::hours_unknown(),
    };
    Turn::keep(reply, Some("faq"))
}

/// A single digit 1-9 selects a slot while the flow awaits one.
fn is_slot_digit(normalized: &str) -> bool {
    normalized.len() == 1 && normalized.chars().all(|c| c.is_ascii_digit() && c != '0')
}
