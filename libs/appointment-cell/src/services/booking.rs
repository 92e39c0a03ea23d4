// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use notification_cell::{AppointmentNotice, NotificationDispatcher};
use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookSlotRequest, BookingOutcome,
    BookingPage, BookingRules, DayAvailability, Recipient,
};
use crate::services::availability::AvailabilityService;
use crate::services::recipient::RecipientService;
use crate::services::slots::{canonical_time, is_catalog_slot};

/// Public booking flow keyed by a recipient's token. Storage calls run with
/// the service role since visitors carry no session.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    availability: AvailabilityService,
    recipients: RecipientService,
    service_key: String,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let availability = AvailabilityService::new(Arc::clone(&supabase), BookingRules::from_config(config));

        Self {
            supabase,
            availability,
            recipients: RecipientService::new(config),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    pub async fn resolve_recipient(&self, token: &str) -> Result<Recipient, AppointmentError> {
        self.recipients.get_by_token(token, &self.service_key).await
    }

    pub async fn booking_page(&self, token: &str, now: NaiveDateTime) -> Result<BookingPage, AppointmentError> {
        let recipient = self.resolve_recipient(token).await?;
        let bookable_dates = self.availability.bookable_dates(now, &self.service_key).await?;

        Ok(BookingPage {
            first_name: recipient.first_name,
            last_name: recipient.last_name,
            bookable_dates,
        })
    }

    pub async fn availability_for(
        &self,
        token: &str,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<DayAvailability, AppointmentError> {
        self.resolve_recipient(token).await?;
        self.availability.day_availability(date, now, &self.service_key).await
    }

    /// Books a slot as `confirmed`. A failed confirmation email is reported in
    /// the outcome and never undoes the booking.
    pub async fn book(
        &self,
        token: &str,
        request: BookSlotRequest,
        dispatcher: &NotificationDispatcher,
        now: NaiveDateTime,
    ) -> Result<BookingOutcome, AppointmentError> {
        let recipient = self.resolve_recipient(token).await?;

        let raw_date = request.appointment_date
            .filter(|date| !date.trim().is_empty())
            .ok_or_else(|| AppointmentError::ValidationError("Please choose a date".to_string()))?;
        let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
            .map_err(|_| AppointmentError::ValidationError(format!("Invalid appointment date: {}", raw_date)))?;
        let raw_time = request.appointment_time
            .filter(|time| !time.trim().is_empty())
            .ok_or_else(|| AppointmentError::ValidationError("Please choose a time".to_string()))?;

        if date < now.date() {
            return Err(AppointmentError::ValidationError(format!("{} is in the past", date)));
        }
        if !is_catalog_slot(&raw_time) {
            return Err(AppointmentError::InvalidTime(raw_time));
        }
        let time = canonical_time(&raw_time)?;

        let (appointments, blocked_times) = self.availability
            .fetch_range(date, date, &self.service_key)
            .await?;
        if !self.availability.evaluator().is_slot_available(date, &time, &appointments, &blocked_times, now) {
            debug!("Slot {} {} is no longer available", date, time);
            return Err(AppointmentError::SlotNotAvailable);
        }

        let appointment = self.insert_confirmed(&recipient, date, &time).await?;

        let notice = AppointmentNotice {
            recipient_first_name: recipient.first_name.clone(),
            recipient_last_name: recipient.last_name.clone(),
            recipient_email: recipient.email.clone(),
            appointment_date: date,
            appointment_time: time,
        };

        let notification_warning = match dispatcher.send_appointment_confirmation(&notice).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Confirmation for appointment {} not delivered: {}", appointment.id, e);
                Some(format!("Appointment booked, but the confirmation email could not be sent: {}", e))
            }
        };

        Ok(BookingOutcome {
            appointment,
            notification_sent: notification_warning.is_none(),
            notification_warning,
        })
    }

    async fn insert_confirmed(
        &self,
        recipient: &Recipient,
        date: NaiveDate,
        time: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = json!({
            "recipient_id": recipient.id,
            "appointment_date": date,
            "appointment_time": time,
            "status": AppointmentStatus::Confirmed.as_str(),
            "confirmed_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(&self.service_key),
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

        info!("Recipient {} booked {} {}", recipient.id, date, time);
        Ok(appointment)
    }
}
