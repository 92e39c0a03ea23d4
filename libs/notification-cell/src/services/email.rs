use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{EmailMessage, EmailSendResponse, NotificationError};

/// Client for the transactional email provider (`POST {base}/emails`).
pub struct EmailClient {
    client: Client,
    api_key: String,
    base_url: String,
    from: String,
}

impl EmailClient {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::EmailNotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.email_api_key.clone(),
            base_url: config.email_api_base_url.trim_end_matches('/').to_string(),
            from: config.email_from.clone(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, html: String) -> Result<EmailSendResponse, NotificationError> {
        let message = EmailMessage {
            from: self.from.clone(),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html,
        };

        let url = format!("{}/emails", self.base_url);
        debug!("Sending email '{}' to {}", subject, to);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Email provider rejected message to {}: {} - {}", to, status, response_text);
            return Err(NotificationError::EmailProvider(format!("HTTP {}: {}", status, response_text)));
        }

        let parsed: EmailSendResponse = serde_json::from_str(&response_text)
            .unwrap_or(EmailSendResponse { id: None });

        info!("Email '{}' accepted for {} (id: {:?})", subject, to, parsed.id);
        Ok(parsed)
    }
}
