// --- File: crates/slotify_flow/src/templates.rs ---
//! Reply templates for the booking dialogue.
//!
//! All customer-facing copy lives here so the engine stays readable and the
//! wording is testable in one place.

use slotify_availability::Slot;
use slotify_db::repositories::{Business, ServiceOffering};

/// How many slots a conversational surface shows at once. Numeric replies
/// resolve against the full offered list; the display is just truncated.
pub const DISPLAY_MAX: usize = 5;

fn price_label(price_cents: i64) -> String {
    if price_cents % 100 == 0 {
        format!("${}", price_cents / 100)
    } else {
        format!("${:.2}", price_cents as f64 / 100.0)
    }
}

pub fn service_menu(services: &[ServiceOffering]) -> String {
    let list = services
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let price = s
                .price_cents
                .map(|p| format!(" - {}", price_label(p)))
                .unwrap_or_default();
            format!("{}. {} ({}min{})", i + 1, s.name, s.duration_min, price)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "What service would you like to book?\n\n{}\n\nReply with the number.",
        list
    )
}

pub fn slot_list(service_name: &str, slots: &[Slot]) -> String {
    let shown = slots.len().min(DISPLAY_MAX);
    let list = slots[..shown]
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {} {} at {}", i + 1, s.day, s.date, s.time))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Available times for {}:\n\n{}\n\nReply with the number (1-{}) to book.",
        service_name, list, shown
    )
}

pub fn no_slots(service_name: &str) -> String {
    format!(
        "Sorry, no available slots for {} in the next 2 weeks.\n\nWould you like to try a different service?",
        service_name
    )
}

pub fn no_services() -> String {
    "Sorry, no services available right now.".to_string()
}

pub fn booking_summary(service_name: &str, slot: &Slot) -> String {
    format!(
        "Booking Summary\n\nService: {}\nDate: {} {}\nTime: {}\n\nReply \"yes\" to confirm or \"no\" to cancel.",
        service_name, slot.day, slot.date, slot.time
    )
}

pub fn booking_confirmed(slot_date: &str, slot_time: &str) -> String {
    format!(
        "Booking confirmed!\n\n{} at {}\n\nYou'll receive a reminder before your appointment.\n\nSee you then!",
        slot_date, slot_time
    )
}

pub fn booking_failed() -> String {
    "Sorry, there was a problem creating your booking. Please try again.".to_string()
}

pub fn booking_declined() -> String {
    "No problem! Your booking is cancelled.\n\nWould you like to book for a different time?"
        .to_string()
}

pub fn confirm_reprompt() -> String {
    "Please reply \"yes\" to confirm or \"no\" to cancel.".to_string()
}

pub fn invalid_selection(max: usize) -> String {
    format!(
        "Invalid selection. Please reply with a number between 1 and {}.",
        max
    )
}

pub fn start_over() -> String {
    "Something went wrong. Please start over with a new booking.".to_string()
}

pub fn cancellation_confirmed(service_name: &str, when: &str) -> String {
    format!(
        "Your {} appointment on {} has been cancelled.\n\nWould you like to rebook for another time?",
        service_name, when
    )
}

pub fn no_upcoming_appointments() -> String {
    "You don't have any upcoming appointments.\n\nWould you like to book one?".to_string()
}

pub fn service_details(service: &ServiceOffering) -> String {
    let mut details = service.name.clone();
    if let Some(description) = &service.description {
        details.push('\n');
        details.push_str(description);
    }
    details.push_str(&format!("\n\nDuration: {} minutes", service.duration_min));
    match service.price_cents {
        Some(price) => details.push_str(&format!("\nPrice: {}", price_label(price))),
        None => details.push_str("\nContact us for pricing"),
    }
    details.push_str("\n\nWould you like to book?");
    details
}

pub fn which_service() -> String {
    "Which service are you interested in?".to_string()
}

/// Hours listing for the FAQ intent, one line per weekday, Monday first.
pub fn hours(business: &Business, hours: &slotify_availability::OperatingHours) -> String {
    let list = hours
        .entries()
        .map(|(day, ranges)| {
            let mut label = day.to_string();
            if let Some(first) = label.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            let times = if ranges.is_empty() {
                "Closed".to_string()
            } else {
                ranges.join(", ")
            };
            format!("{}: {}", label, times)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let address = business
        .address
        .as_ref()
        .map(|a| format!("{}\n", a))
        .unwrap_or_default();
    format!("Our hours:\n\n{}\n\n{}Anything else?", list, address)
}

pub fn hours_unknown() -> String {
    "Please contact us directly for hours and availability.".to_string()
}

pub fn greeting(business: &Business, services: &[ServiceOffering]) -> String {
    if services.is_empty() {
        return format!(
            "Hi! I'm the booking assistant for {}. How can I help you today?",
            business.name
        );
    }
    let names = services
        .iter()
        .take(3)
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let more = if services.len() > 3 { " and more" } else { "" };
    format!(
        "Hi! I'm the booking assistant for {}. I can help you book {}{}.\n\nWhat would you like?",
        business.name, names, more
    )
}

pub fn image_fallback() -> String {
    "Thanks for the image! For bookings and inquiries, please send a text message.".to_string()
}

pub fn technical_error() -> String {
    "Sorry, something went wrong. Please try again.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_label_drops_cents_when_round() {
        assert_eq!(price_label(5000), "$50");
        assert_eq!(price_label(5250), "$52.50");
    }

    #[test]
    fn slot_list_shows_at_most_five() {
        let slots: Vec<Slot> = (0..8)
            .map(|i| Slot {
                id: format!("2027-03-01-{:02}00", 9 + i),
                date: "2027-03-01".to_string(),
                day: "Monday".to_string(),
                time: format!("{}:00 AM", 9 + i),
                start_at: chrono::Utc::now(),
                duration_min: 60,
            })
            .collect();

        let rendered = slot_list("Haircut", &slots);
        assert!(rendered.contains("1. Monday 2027-03-01 at 9:00 AM"));
        assert!(rendered.contains("5."));
        assert!(!rendered.contains("6."));
        assert!(rendered.contains("(1-5)"));
    }

    #[test]
    fn slot_list_range_matches_short_lists() {
        let slots = vec![Slot {
            id: "2027-03-01-0900".to_string(),
            date: "2027-03-01".to_string(),
            day: "Monday".to_string(),
            time: "9:00 AM".to_string(),
            start_at: chrono::Utc::now(),
            duration_min: 60,
        }];
        assert!(slot_list("Haircut", &slots).contains("(1-1)"));
    }
}
