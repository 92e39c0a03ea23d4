// libs/appointment-cell/src/services/reminder.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use notification_cell::{AppointmentNotice, NotificationDispatcher};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AppointmentWithRecipient, BookingRules,
    ReminderRunSummary,
};

/// True when a confirmed appointment without a reminder starts inside the
/// reminder window, both bounds inclusive.
pub fn is_due_for_reminder(appointment: &Appointment, now: NaiveDateTime, rules: &BookingRules) -> bool {
    if appointment.status != AppointmentStatus::Confirmed || appointment.reminder_sent_at.is_some() {
        return false;
    }

    let Some(starts_at) = appointment.starts_at() else {
        return false;
    };

    let window_start = now + Duration::minutes(rules.reminder_window_start_minutes);
    let window_end = now + Duration::minutes(rules.reminder_window_end_minutes);
    starts_at >= window_start && starts_at <= window_end
}

pub struct ReminderService {
    supabase: Arc<SupabaseClient>,
    rules: BookingRules,
    service_key: String,
}

impl ReminderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            rules: BookingRules::from_config(config),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    async fn candidates(&self, now: NaiveDateTime) -> Result<Vec<AppointmentWithRecipient>, AppointmentError> {
        let from = (now + Duration::minutes(self.rules.reminder_window_start_minutes)).date();
        let to = (now + Duration::minutes(self.rules.reminder_window_end_minutes)).date();

        let path = format!(
            "/rest/v1/appointments?select=*,recipients(first_name,last_name,email,phone_note)\
             &status=eq.confirmed&reminder_sent_at=is.null\
             &appointment_date=gte.{}&appointment_date=lte.{}",
            from, to
        );
        let rows: Vec<AppointmentWithRecipient> = self.supabase
            .request(Method::GET, &path, Some(&self.service_key), None)
            .await?;
        Ok(rows)
    }

    /// Sets the marker only if no other run has set it. `false` means another run owns the reminder.
    async fn claim(&self, appointment: &Appointment) -> Result<bool, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&reminder_sent_at=is.null",
            appointment.id
        );
        let claimed: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&self.service_key),
            Some(json!({ "reminder_sent_at": Utc::now().to_rfc3339() })),
            Some(SupabaseClient::representation_headers()),
        ).await?;
        Ok(!claimed.is_empty())
    }

    pub async fn run(
        &self,
        now: NaiveDateTime,
        dispatcher: &NotificationDispatcher,
    ) -> Result<ReminderRunSummary, AppointmentError> {
        let rows = self.candidates(now).await?;
        let mut summary = ReminderRunSummary {
            checked: rows.len(),
            ..ReminderRunSummary::default()
        };

        for row in rows {
            if !is_due_for_reminder(&row.appointment, now, &self.rules) {
                continue;
            }
            summary.due += 1;

            if !self.claim(&row.appointment).await? {
                debug!("Reminder for {} already claimed", row.appointment.id);
                summary.already_claimed += 1;
                continue;
            }

            let Some(recipient) = row.recipient.as_ref() else {
                warn!("Appointment {} has no recipient, reminder skipped", row.appointment.id);
                summary.failed += 1;
                continue;
            };
            let Some(email) = recipient.email.clone() else {
                warn!("Recipient of appointment {} has no email", row.appointment.id);
                summary.failed += 1;
                continue;
            };

            let notice = AppointmentNotice {
                recipient_first_name: recipient.first_name.clone(),
                recipient_last_name: recipient.last_name.clone(),
                recipient_email: email,
                appointment_date: row.appointment.appointment_date,
                appointment_time: row.appointment.appointment_time.clone(),
            };

            // the marker stays set on failure; reminders are not retried
            match dispatcher.send_appointment_reminder(&notice).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    warn!("Reminder for appointment {} failed: {}", row.appointment.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Reminder run: checked {}, due {}, sent {}, failed {}, already claimed {}",
            summary.checked, summary.due, summary.sent, summary.failed, summary.already_claimed
        );
        Ok(summary)
    }
}
