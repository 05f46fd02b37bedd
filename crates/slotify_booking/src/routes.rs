// --- File: crates/slotify_booking/src/routes.rs ---

use crate::handlers::{
    cancel_appointment_handler, create_appointment_handler, list_appointments_handler,
    AppointmentsState,
};
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Creates a router containing the appointment routes.
pub fn routes(state: AppointmentsState) -> Router {
    Router::new()
        .route("/appointments", get(list_appointments_handler))
        .route("/appointments", post(create_appointment_handler))
        .route("/appointments/{appointment_id}", delete(cancel_appointment_handler))
        .with_state(state)
}
