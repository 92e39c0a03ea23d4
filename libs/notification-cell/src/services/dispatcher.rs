use tracing::{info, warn};

use shared_config::AppConfig;

use crate::models::{AppointmentNotice, NotificationError};
use crate::services::email::EmailClient;
use crate::services::telegram::TelegramClient;
use crate::services::templates;

/// Formats and delivers appointment notifications. Unconfigured channels
/// surface as errors so callers can log them like any delivery failure.
pub struct NotificationDispatcher {
    email: Option<EmailClient>,
    telegram: Option<TelegramClient>,
}

impl NotificationDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        let email = EmailClient::new(config)
            .map_err(|e| warn!("Email channel disabled: {}", e))
            .ok();
        let telegram = TelegramClient::new(config)
            .map_err(|e| warn!("Telegram channel disabled: {}", e))
            .ok();

        Self { email, telegram }
    }

    fn email(&self) -> Result<&EmailClient, NotificationError> {
        self.email.as_ref().ok_or(NotificationError::EmailNotConfigured)
    }

    fn telegram(&self) -> Result<&TelegramClient, NotificationError> {
        self.telegram.as_ref().ok_or(NotificationError::TelegramNotConfigured)
    }

    pub async fn send_appointment_confirmation(&self, notice: &AppointmentNotice) -> Result<(), NotificationError> {
        let rendered = templates::appointment_confirmation(notice);
        self.email()?.send(&notice.recipient_email, &rendered.subject, rendered.html).await?;
        info!("Confirmation sent to {}", notice.recipient_email);
        Ok(())
    }

    pub async fn send_appointment_reminder(&self, notice: &AppointmentNotice) -> Result<(), NotificationError> {
        let rendered = templates::appointment_reminder(notice);
        self.email()?.send(&notice.recipient_email, &rendered.subject, rendered.html).await?;
        info!("Reminder sent to {}", notice.recipient_email);
        Ok(())
    }

    pub async fn send_missed_appointment(&self, notice: &AppointmentNotice, booking_url: &str) -> Result<(), NotificationError> {
        let rendered = templates::missed_appointment(notice, booking_url);
        self.email()?.send(&notice.recipient_email, &rendered.subject, rendered.html).await?;
        info!("Missed-appointment notice sent to {}", notice.recipient_email);
        Ok(())
    }

    pub async fn send_booking_invitation(&self, first_name: &str, email: &str, booking_url: &str) -> Result<(), NotificationError> {
        let rendered = templates::booking_invitation(first_name, booking_url);
        self.email()?.send(email, &rendered.subject, rendered.html).await?;
        Ok(())
    }

    pub async fn send_chat_message(&self, chat_id: i64, text: &str) -> Result<(), NotificationError> {
        self.telegram()?.send_message(chat_id, text).await
    }

    pub async fn notify_admins(&self, text: &str) -> Result<usize, NotificationError> {
        self.telegram()?.broadcast_to_admins(text).await
    }
}
