// File: services/slotify_backend/src/main.rs
mod app_state;

use app_state::AppState;
use axum::{routing::get, Router};
use slotify_availability::routes as availability_routes;
use slotify_booking::handlers::AppointmentsState;
use slotify_booking::routes as booking_routes;
use slotify_config::load_config;
use slotify_whatsapp::handlers::WebhookState;
use slotify_whatsapp::routes as whatsapp_routes;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    let config = Arc::new(load_config().expect("Failed to load config"));
    slotify_common::logging::init();

    let state = AppState::initialize(config.clone())
        .await
        .expect("Failed to initialize application state");

    let availability_router = availability_routes::routes(state.availability.clone());
    let booking_router = booking_routes::routes(AppointmentsState {
        manager: state.booking.clone(),
        reminders: state.reminders.clone(),
    });
    let whatsapp_router = whatsapp_routes::routes(WebhookState {
        engine: state.engine.clone(),
        sender: state.sender.clone(),
        businesses: state.businesses.clone(),
    });

    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to Slotify API!" }))
        .merge(availability_router)
        .merge(booking_router)
        .merge(whatsapp_router);

    let app = Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.unwrap();
    println!("Starting server at http://{}", addr);
    println!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}
