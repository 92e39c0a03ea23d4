// libs/contract-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// CONTRACTS
// ==============================================================================

/// Onboarding data submitted by a new employee. Identity documents are stored
/// elsewhere; only their storage paths are kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmploymentContract {
    pub id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub tax_id: String,
    pub social_security_number: Option<String>,
    pub health_insurance: Option<String>,
    pub iban: String,
    pub bic: String,
    pub id_front_path: Option<String>,
    pub id_back_path: Option<String>,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitContractRequest {
    pub appointment_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub tax_id: String,
    pub social_security_number: Option<String>,
    pub health_insurance: Option<String>,
    pub iban: String,
    pub bic: String,
    pub id_front_path: Option<String>,
    pub id_back_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateContractStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractSearchQuery {
    pub status: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 3] = [
        ContractStatus::Pending,
        ContractStatus::Accepted,
        ContractStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Accepted => "accepted",
            ContractStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = ContractError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| ContractError::InvalidStatus {
                value: raw.to_string(),
                allowed: Self::ALL.iter().map(ContractStatus::as_str).collect::<Vec<_>>().join(", "),
            })
    }
}

/// Result of a review. Account provisioning is best effort: a failure is
/// reported here and the status change stands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractReviewOutcome {
    pub contract: EmploymentContract,
    pub account_provisioned: bool,
    pub provisioning_warning: Option<String>,
}

// ==============================================================================
// ACCOUNT PROVISIONING
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedAccount {
    pub id: String,
    pub email: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ContractError {
    #[error("Contract not found")]
    NotFound,

    #[error("Invalid status '{value}'. Allowed values: {allowed}")]
    InvalidStatus { value: String, allowed: String },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Account provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for ContractError {
    fn from(err: anyhow::Error) -> Self {
        ContractError::DatabaseError(err.to_string())
    }
}

impl From<ContractError> for AppError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::NotFound => AppError::NotFound(err.to_string()),
            ContractError::InvalidStatus { .. } | ContractError::InvalidField { .. } => {
                AppError::ValidationError(err.to_string())
            }
            ContractError::ProvisioningFailed(_) => AppError::ExternalService(err.to_string()),
            ContractError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}
