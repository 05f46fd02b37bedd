// --- File: crates/slotify_availability/src/routes.rs ---

use crate::handlers::get_availability_handler;
use crate::logic::Availability;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Creates a router containing the availability routes.
pub fn routes(availability: Arc<Availability>) -> Router {
    Router::new()
        .route("/availability", get(get_availability_handler))
        .with_state(availability)
}
