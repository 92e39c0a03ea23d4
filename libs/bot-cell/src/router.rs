// libs/bot-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use shared_config::AppConfig;

use crate::handlers;

/// The webhook authenticates with Telegram's secret header, not a user JWT.
pub fn bot_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/webhook", post(handlers::telegram_webhook))
        .with_state(state)
}
