// libs/contract-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn contract_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_contracts))
        .route("/{contract_id}", get(handlers::get_contract))
        .route("/{contract_id}/status", patch(handlers::update_contract_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // submission comes from the onboarding form without a session
        .route("/", post(handlers::submit_contract))
        .with_state(state)
}
