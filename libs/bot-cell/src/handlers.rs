// libs/bot-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use tracing::{debug, warn};

use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::require_shared_secret;

use crate::models::{BotError, TelegramUpdate};
use crate::services::executor::CommandExecutor;

pub const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Telegram retries any non-2xx answer, so once the secret checks out every
/// update is acknowledged, including ones that are ignored.
#[axum::debug_handler]
pub async fn telegram_webhook(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Json(update): Json<TelegramUpdate>,
) -> Result<Json<Value>, AppError> {
    require_shared_secret(&headers, WEBHOOK_SECRET_HEADER, &state.telegram_webhook_secret)?;

    if !state.is_telegram_configured() {
        return Err(BotError::NotConfigured.into());
    }

    let Some(message) = update.message else {
        debug!("Update {} carries no message", update.update_id);
        return Ok(Json(json!({ "ok": true })));
    };

    let executor = CommandExecutor::new(&state);
    let today = Local::now().date_naive();

    if let Some(reply) = executor.handle_message(&message, today).await {
        let dispatcher = NotificationDispatcher::new(&state);
        if let Err(e) = dispatcher.send_chat_message(message.chat.id, &reply).await {
            warn!("Bot reply to chat {} failed: {}", message.chat.id, e);
        }
    }

    Ok(Json(json!({ "ok": true })))
}
