// libs/bot-cell/src/services/executor.rs
use chrono::NaiveDate;
use tracing::{info, warn};

use appointment_cell::models::AppointmentWithRecipient;
use appointment_cell::services::appointments::AppointmentService;
use notification_cell::services::templates::{format_date, format_time};
use shared_config::AppConfig;
use sms_activation_cell::models::{SmsActivationError, SmsActivationRequest};
use sms_activation_cell::SmsActivationService;

use crate::models::{BotCommand, BotError, TelegramMessage};
use crate::services::commands::{parse_command, HELP_TEXT};

/// Runs administrator commands and renders the chat reply.
pub struct CommandExecutor {
    sms_requests: SmsActivationService,
    appointments: AppointmentService,
    service_key: String,
    config: AppConfig,
}

impl CommandExecutor {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            sms_requests: SmsActivationService::new(config),
            appointments: AppointmentService::new(config),
            service_key: config.supabase_service_role_key.clone(),
            config: config.clone(),
        }
    }

    /// Either the chat or the sending user must be on the admin list.
    pub fn authorize(&self, message: &TelegramMessage) -> Result<(), BotError> {
        let sender = message.from.as_ref().map(|user| user.id);
        let allowed = self.config.is_admin_chat(message.chat.id)
            || sender.is_some_and(|id| self.config.is_admin_chat(id));

        if allowed {
            Ok(())
        } else {
            Err(BotError::UnauthorizedSender(sender.unwrap_or(message.chat.id)))
        }
    }

    /// Returns the reply for an incoming message, or `None` when the message
    /// must be ignored.
    pub async fn handle_message(&self, message: &TelegramMessage, today: NaiveDate) -> Option<String> {
        let text = message.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }

        if let Err(e) = self.authorize(message) {
            warn!("Ignoring bot message in chat {}: {}", message.chat.id, e);
            return None;
        }

        Some(self.execute(parse_command(text), today).await)
    }

    pub async fn execute(&self, command: BotCommand, today: NaiveDate) -> String {
        match command {
            BotCommand::Activate(id) => {
                let result = self.sms_requests.activate(id).await;
                sms_reply(id, result, |request| {
                    format!(
                        "Anfrage #{} ist aktiv ({}).\nCode senden mit /send {} <CODE>",
                        request.id, request.service_name, request.id
                    )
                })
            }
            BotCommand::SendCode { id, code } => {
                let result = self.sms_requests.send_code(id, &code).await;
                sms_reply(id, result, |request| {
                    format!(
                        "Code für Anfrage #{} wurde übermittelt.\nAbschließen mit /complete {}",
                        request.id, request.id
                    )
                })
            }
            BotCommand::Complete(id) => {
                let result = self.sms_requests.complete(id).await;
                sms_reply(id, result, |request| format!("Anfrage #{} ist abgeschlossen.", request.id))
            }
            BotCommand::TodaysAppointments => {
                match self.appointments.list_for_day(today, &self.service_key).await {
                    Ok(rows) => format_day_overview(today, &rows),
                    Err(e) => {
                        warn!("Could not load appointments for {}: {}", today, e);
                        "Termine konnten nicht geladen werden.".to_string()
                    }
                }
            }
            BotCommand::Help => HELP_TEXT.to_string(),
        }
    }
}

fn sms_reply(
    id: i64,
    result: Result<SmsActivationRequest, SmsActivationError>,
    success: impl FnOnce(&SmsActivationRequest) -> String,
) -> String {
    match result {
        Ok(request) => {
            info!("Bot moved SMS request #{} to {}", id, request.status);
            success(&request)
        }
        Err(SmsActivationError::NotFound(_)) => format!("Anfrage #{} nicht gefunden.", id),
        Err(SmsActivationError::InvalidTransition { from, .. }) => {
            format!("Anfrage #{} ist im Status '{}', Befehl nicht möglich.", id, from)
        }
        Err(SmsActivationError::ValidationError(msg)) => msg,
        Err(e) => {
            warn!("Bot command on SMS request #{} failed: {}", id, e);
            format!("Anfrage #{} konnte nicht aktualisiert werden.", id)
        }
    }
}

pub fn format_day_overview(date: NaiveDate, rows: &[AppointmentWithRecipient]) -> String {
    if rows.is_empty() {
        return format!("Keine Termine am {}.", format_date(date));
    }

    let mut reply = format!("Termine am {}:", format_date(date));
    for row in rows {
        let name = row.recipient
            .as_ref()
            .map(|r| r.full_name())
            .unwrap_or_else(|| "Unbekannt".to_string());
        reply.push_str(&format!(
            "\n{} Uhr - {} ({})",
            format_time(&row.appointment.appointment_time),
            name,
            row.appointment.status
        ));
    }
    reply
}
