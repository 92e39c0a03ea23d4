use reqwest::Client;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::models::{NotificationError, TelegramApiResponse, TelegramSendMessage};

/// Minimal Telegram Bot API client (`sendMessage` only).
pub struct TelegramClient {
    client: Client,
    bot_token: String,
    base_url: String,
    admin_chat_ids: Vec<i64>,
}

impl TelegramClient {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_telegram_configured() {
            return Err(NotificationError::TelegramNotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            bot_token: config.telegram_bot_token.clone(),
            base_url: config.telegram_api_base_url.trim_end_matches('/').to_string(),
            admin_chat_ids: config.telegram_admin_chat_ids.clone(),
        })
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotificationError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let body = TelegramSendMessage {
            chat_id,
            text: text.to_string(),
            parse_mode: None,
        };

        debug!("Sending Telegram message to chat {}", chat_id);

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let api_response: TelegramApiResponse = response.json().await.unwrap_or(TelegramApiResponse {
            ok: status.is_success(),
            description: None,
        });

        if !status.is_success() || !api_response.ok {
            let description = api_response.description.unwrap_or_else(|| status.to_string());
            error!("Telegram sendMessage to {} failed: {}", chat_id, description);
            return Err(NotificationError::TelegramApi(description));
        }

        Ok(())
    }

    /// Sends `text` to every configured admin chat. Succeeds if at least one chat received it.
    pub async fn broadcast_to_admins(&self, text: &str) -> Result<usize, NotificationError> {
        let mut delivered = 0;
        let mut last_error = None;

        for chat_id in &self.admin_chat_ids {
            match self.send_message(*chat_id, text).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Admin broadcast to chat {} failed: {}", chat_id, e);
                    last_error = Some(e);
                }
            }
        }

        match (delivered, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(delivered),
        }
    }
}
