// libs/appointment-cell/src/services/appointments.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use notification_cell::{AppointmentNotice, NotificationDispatcher};
use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    AppointmentWithRecipient, BookingRules, CreateAppointmentRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::recipient::RecipientService;
use crate::services::slots::{canonical_time, is_catalog_slot};

const WITH_RECIPIENT: &str = "select=*,recipients(first_name,last_name,email,phone_note)";

/// Administrative view of appointments.
pub struct AppointmentService {
    supabase: Arc<SupabaseClient>,
    availability: AvailabilityService,
    recipients: RecipientService,
    config: AppConfig,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            availability: AvailabilityService::new(Arc::clone(&supabase), BookingRules::from_config(config)),
            supabase,
            recipients: RecipientService::new(config),
            config: config.clone(),
        }
    }

    pub async fn list(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<AppointmentWithRecipient>, AppointmentError> {
        let mut filters = vec![
            WITH_RECIPIENT.to_string(),
            "order=appointment_date.asc,appointment_time.asc".to_string(),
        ];

        if let Some(date) = query.date {
            filters.push(format!("appointment_date=eq.{}", date));
        } else {
            if let Some(from) = query.from_date {
                filters.push(format!("appointment_date=gte.{}", from));
            }
            if let Some(to) = query.to_date {
                filters.push(format!("appointment_date=lte.{}", to));
            }
        }
        if let Some(raw) = query.status.as_deref() {
            let status = AppointmentLifecycleService::parse_status(raw)?;
            filters.push(format!("status=eq.{}", status));
        }
        filters.push(format!("limit={}", query.limit.unwrap_or(200)));
        if let Some(offset) = query.offset {
            filters.push(format!("offset={}", offset));
        }

        let path = format!("/rest/v1/appointments?{}", filters.join("&"));
        let rows: Vec<AppointmentWithRecipient> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(rows)
    }

    /// Non-cancelled appointments of one day, earliest first.
    pub async fn list_for_day(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<AppointmentWithRecipient>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?{}&appointment_date=eq.{}&status=neq.cancelled&order=appointment_time.asc",
            WITH_RECIPIENT, date
        );
        let rows: Vec<AppointmentWithRecipient> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, appointment_id: Uuid, auth_token: &str) -> Result<AppointmentWithRecipient, AppointmentError> {
        let path = format!("/rest/v1/appointments?{}&id=eq.{}", WITH_RECIPIENT, appointment_id);
        let rows: Vec<AppointmentWithRecipient> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Records an appointment on behalf of a recipient. Past dates are
    /// allowed; the slot must still be free unless the row is cancelled.
    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let status = match request.status.as_deref() {
            Some(raw) => AppointmentLifecycleService::parse_status(raw)?,
            None => AppointmentStatus::Pending,
        };
        if !is_catalog_slot(&request.appointment_time) {
            return Err(AppointmentError::InvalidTime(request.appointment_time));
        }
        let time = canonical_time(&request.appointment_time)?;

        self.recipients.get(request.recipient_id, auth_token).await?;

        if status != AppointmentStatus::Cancelled {
            let date = request.appointment_date;
            let (appointments, blocked_times) = self.availability.fetch_range(date, date, auth_token).await?;
            let start_of_day = date.and_time(NaiveTime::default());
            if !self.availability.evaluator().is_slot_available(date, &time, &appointments, &blocked_times, start_of_day) {
                return Err(AppointmentError::SlotNotAvailable);
            }
        }

        let mut body = json!({
            "recipient_id": request.recipient_id,
            "appointment_date": request.appointment_date,
            "appointment_time": time,
            "status": status.as_str(),
        });
        if status == AppointmentStatus::Confirmed {
            body["confirmed_at"] = json!(Utc::now().to_rfc3339());
        }

        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| {
            if is_conflict(&e) {
                AppointmentError::SlotNotAvailable
            } else {
                AppointmentError::from(e)
            }
        })?;

        let appointment = result.into_iter().next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))?;
        info!("Appointment {} created with status {}", appointment.id, appointment.status);
        Ok(appointment)
    }

    pub async fn delete(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let removed = result.into_iter().next().ok_or(AppointmentError::NotFound)?;
        info!("Appointment {} deleted", removed.id);
        Ok(removed)
    }

    /// Emails the recipient that the appointment was missed, with a link to rebook.
    pub async fn notify_missed(
        &self,
        appointment_id: Uuid,
        dispatcher: &NotificationDispatcher,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get(appointment_id, auth_token).await?.appointment;
        let recipient = self.recipients.get(appointment.recipient_id, auth_token).await?;

        let notice = AppointmentNotice {
            recipient_first_name: recipient.first_name.clone(),
            recipient_last_name: recipient.last_name.clone(),
            recipient_email: recipient.email.clone(),
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time.clone(),
        };
        let booking_url = self.config.booking_url(&recipient.token);

        dispatcher.send_missed_appointment(&notice, &booking_url).await.map_err(|e| {
            warn!("Missed-appointment notice for {} failed: {}", appointment.id, e);
            AppointmentError::NotificationFailed(e.to_string())
        })?;

        Ok(appointment)
    }
}
