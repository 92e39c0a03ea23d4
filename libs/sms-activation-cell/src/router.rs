// libs/sms-activation-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn sms_request_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_sms_request))
        .route("/", get(handlers::list_my_sms_requests))
        .route("/{request_id}", get(handlers::get_sms_request))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
