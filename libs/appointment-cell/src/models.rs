// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

use shared_models::error::AppError;

use crate::services::slots;

// ==============================================================================
// RECIPIENTS
// ==============================================================================

/// Person invited to book an appointment. The token is the only credential
/// for the public booking flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub token: String,
    pub email_sent: bool,
    pub phone_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecipientsRequest {
    pub recipients: Vec<CreateRecipientRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecipientsResponse {
    pub created: Vec<Recipient>,
    /// Emails that already existed or were invalid.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientSearchQuery {
    pub email_sent: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// Columns embedded through `select=*,recipients(...)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientSummary {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone_note: Option<String>,
}

impl RecipientSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub appointment_date: NaiveDate,
    /// `HH:MM` or `HH:MM:SS`; rows written by this service are always `HH:MM:SS`.
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_sent_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn blocks_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    /// Local start of the appointment; `None` if the stored time is malformed.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        slots::parse_time(&self.appointment_time)
            .map(|time| self.appointment_date.and_time(time))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithRecipient {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(rename = "recipients")]
    pub recipient: Option<RecipientSummary>,
}

/// Flat allow-list; any value may follow any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Interessiert,
    Abgelehnt,
    Mailbox,
    InfosAngefragt,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Interessiert,
        AppointmentStatus::Abgelehnt,
        AppointmentStatus::Mailbox,
        AppointmentStatus::InfosAngefragt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Interessiert => "interessiert",
            AppointmentStatus::Abgelehnt => "abgelehnt",
            AppointmentStatus::Mailbox => "mailbox",
            AppointmentStatus::InfosAngefragt => "infos_angefragt",
        }
    }

    pub fn allowed_values() -> Vec<&'static str> {
        Self::ALL.iter().map(AppointmentStatus::as_str).collect()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| AppointmentError::InvalidStatus {
                value: raw.to_string(),
                allowed: Self::allowed_values().join(", "),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub recipient_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    /// Raw status string, validated against the allow-list. Defaults to `pending`.
    pub status: Option<String>,
}

/// Public booking form. Fields stay raw strings so a missing, blank or
/// malformed value is a validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSlotRequest {
    /// `YYYY-MM-DD`
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub date: Option<NaiveDate>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingOutcome {
    pub appointment: Appointment,
    pub notification_sent: bool,
    pub notification_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPage {
    pub first_name: String,
    pub last_name: String,
    pub bookable_dates: Vec<NaiveDate>,
}

// ==============================================================================
// BLOCKED TIMES & AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedTime {
    pub id: Uuid,
    pub blocked_date: NaiveDate,
    pub blocked_time: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockedTimeRequest {
    pub blocked_date: NaiveDate,
    pub blocked_time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedTimeQuery {
    pub date: Option<NaiveDate>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub available_slots: Vec<String>,
    pub fully_booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// REMINDERS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReminderRunSummary {
    pub checked: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub already_claimed: usize,
}

// ==============================================================================
// RULES
// ==============================================================================

#[derive(Debug, Clone)]
pub struct BookingRules {
    /// Non-cancelled appointments plus blocked times at which a date counts as exhausted.
    pub fully_booked_threshold: u32,
    pub booking_horizon_days: i64,
    pub reminder_window_start_minutes: i64,
    pub reminder_window_end_minutes: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            fully_booked_threshold: shared_config::DEFAULT_FULLY_BOOKED_THRESHOLD,
            booking_horizon_days: 30,
            reminder_window_start_minutes: 25,
            reminder_window_end_minutes: 35,
        }
    }
}

impl BookingRules {
    pub fn from_config(config: &shared_config::AppConfig) -> Self {
        Self {
            fully_booked_threshold: config.fully_booked_threshold,
            ..Self::default()
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Booking link is invalid or has expired")]
    RecipientNotFound,

    #[error("Recipient not found")]
    UnknownRecipient,

    #[error("Appointment not found")]
    NotFound,

    #[error("Blocked time not found")]
    BlockedTimeNotFound,

    #[error("Appointment slot not available")]
    SlotNotAvailable,

    #[error("Invalid status '{value}'. Allowed values: {allowed}")]
    InvalidStatus { value: String, allowed: String },

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Recipient with email {0} already exists")]
    DuplicateRecipient(String),

    #[error("Slot {date} {time} is already blocked")]
    DuplicateBlockedTime { date: NaiveDate, time: String },

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::RecipientNotFound => AppError::NotFoundRedirect {
                message: err.to_string(),
                redirect: "/".to_string(),
            },
            AppointmentError::UnknownRecipient
            | AppointmentError::NotFound
            | AppointmentError::BlockedTimeNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotNotAvailable
            | AppointmentError::DuplicateRecipient(_)
            | AppointmentError::DuplicateBlockedTime { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidStatus { .. }
            | AppointmentError::InvalidTime(_)
            | AppointmentError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            AppointmentError::NotificationFailed(_) => AppError::ExternalService(err.to_string()),
            AppointmentError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}
