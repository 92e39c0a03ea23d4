// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Extension, Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::realtime::ChangeFeed;

/// Token-addressed booking pages; no session required.
pub fn booking_routes(state: Arc<AppConfig>, feed: ChangeFeed) -> Router {
    Router::new()
        .route("/{token}", get(handlers::get_booking_page))
        .route("/{token}", post(handlers::book_slot))
        .route("/{token}/availability", get(handlers::get_booking_availability))
        .layer(Extension(feed))
        .with_state(state)
}

pub fn recipient_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_recipient))
        .route("/", get(handlers::list_recipients))
        .route("/import", post(handlers::import_recipients))
        .route("/{recipient_id}", get(handlers::get_recipient))
        .route("/{recipient_id}/invite", post(handlers::invite_recipient))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn appointment_routes(state: Arc<AppConfig>, feed: ChangeFeed) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/", post(handlers::create_appointment))
        .route("/changes", get(handlers::stream_changes))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/missed", post(handlers::notify_missed_appointment))
        .layer(Extension(feed))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

pub fn blocked_time_routes(state: Arc<AppConfig>, feed: ChangeFeed) -> Router {
    Router::new()
        .route("/", get(handlers::list_blocked_times))
        .route("/", post(handlers::create_blocked_time))
        .route("/{blocked_time_id}", delete(handlers::delete_blocked_time))
        .layer(Extension(feed))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// Machine-triggered; guarded by a shared secret header instead of a JWT.
pub fn reminder_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/run", post(handlers::run_reminders))
        .with_state(state)
}
