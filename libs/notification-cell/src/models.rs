use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_models::error::AppError;

/// What a notification needs to know about an appointment and its recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentNotice {
    pub recipient_first_name: String,
    pub recipient_last_name: String,
    pub recipient_email: String,
    pub appointment_date: NaiveDate,
    /// Slot label, `HH:MM` or `HH:MM:SS`.
    pub appointment_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSendResponse {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramApiResponse {
    pub ok: bool,
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Email delivery is not configured")]
    EmailNotConfigured,

    #[error("Telegram delivery is not configured")]
    TelegramNotConfigured,

    #[error("Email provider error: {0}")]
    EmailProvider(String),

    #[error("Telegram API error: {0}")]
    TelegramApi(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::EmailNotConfigured | NotificationError::TelegramNotConfigured => {
                AppError::Internal(err.to_string())
            }
            _ => AppError::ExternalService(err.to_string()),
        }
    }
}
