// libs/sms-activation-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

/// An employee asks for an SMS verification code for an app under test; an
/// administrator obtains the code and relays it through the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsActivationRequest {
    /// Short numeric id so administrators can type it in bot commands.
    pub id: i64,
    pub user_id: String,
    pub service_name: String,
    pub phone_number: Option<String>,
    pub status: SmsRequestStatus,
    pub sms_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSmsRequest {
    pub service_name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SmsRequestStatus {
    Pending,
    Active,
    CodeSent,
    Completed,
}

impl SmsRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsRequestStatus::Pending => "pending",
            SmsRequestStatus::Active => "active",
            SmsRequestStatus::CodeSent => "code_sent",
            SmsRequestStatus::Completed => "completed",
        }
    }

    /// A code may be sent again while the employee is still waiting.
    pub fn can_transition_to(&self, next: SmsRequestStatus) -> bool {
        matches!(
            (self, next),
            (SmsRequestStatus::Pending, SmsRequestStatus::Active)
                | (SmsRequestStatus::Active, SmsRequestStatus::CodeSent)
                | (SmsRequestStatus::CodeSent, SmsRequestStatus::CodeSent)
                | (SmsRequestStatus::CodeSent, SmsRequestStatus::Completed)
                | (SmsRequestStatus::Active, SmsRequestStatus::Completed)
        )
    }
}

impl fmt::Display for SmsRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SmsActivationError {
    #[error("SMS request #{0} not found")]
    NotFound(i64),

    #[error("SMS request #{id} is {from}, cannot move to {to}")]
    InvalidTransition { id: i64, from: SmsRequestStatus, to: SmsRequestStatus },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for SmsActivationError {
    fn from(err: anyhow::Error) -> Self {
        SmsActivationError::DatabaseError(err.to_string())
    }
}

impl From<SmsActivationError> for AppError {
    fn from(err: SmsActivationError) -> Self {
        match err {
            SmsActivationError::NotFound(_) => AppError::NotFound(err.to_string()),
            SmsActivationError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            SmsActivationError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            SmsActivationError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SmsRequestStatus::*;

    #[test]
    fn allowed_transitions() {
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(CodeSent));
        assert!(CodeSent.can_transition_to(CodeSent));
        assert!(CodeSent.can_transition_to(Completed));
        assert!(Active.can_transition_to(Completed));
    }

    #[test]
    fn everything_else_is_refused() {
        assert!(!Pending.can_transition_to(CodeSent));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Active.can_transition_to(Active));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Completed.can_transition_to(CodeSent));
        assert!(!CodeSent.can_transition_to(Pending));
    }
}
