// libs/bot-cell/src/models.rs
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

// ==============================================================================
// TELEGRAM WEBHOOK PAYLOAD
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

// ==============================================================================
// COMMANDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/activate <ID>`
    Activate(i64),
    /// `/send <ID> <CODE>`
    SendCode { id: i64, code: String },
    /// `/complete <ID>`
    Complete(i64),
    /// `/termine`
    TodaysAppointments,
    Help,
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Sender {0} is not allowed to use the bot")]
    UnauthorizedSender(i64),

    #[error("Bot is not configured")]
    NotConfigured,
}

impl From<BotError> for AppError {
    fn from(err: BotError) -> Self {
        match err {
            BotError::UnauthorizedSender(_) => AppError::Forbidden(err.to_string()),
            BotError::NotConfigured => AppError::Internal(err.to_string()),
        }
    }
}
