// libs/contract-cell/src/services/contract.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ContractError, ContractReviewOutcome, ContractSearchQuery, ContractStatus,
    EmploymentContract, SubmitContractRequest,
};
use crate::services::provisioning::AccountProvisioningService;
use crate::services::validation::{compact, validate_submission};

pub struct ContractService {
    supabase: Arc<SupabaseClient>,
    provisioning: AccountProvisioningService,
    service_key: String,
}

impl ContractService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            provisioning: AccountProvisioningService::new(config),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    pub fn parse_status(raw: &str) -> Result<ContractStatus, ContractError> {
        raw.trim().parse::<ContractStatus>()
    }

    /// Public intake; submitters have no session, so the row is written with the service role.
    pub async fn submit(&self, request: SubmitContractRequest, today: NaiveDate) -> Result<EmploymentContract, ContractError> {
        validate_submission(&request, today)?;

        let body = json!({
            "appointment_id": request.appointment_id,
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "email": request.email.trim().to_lowercase(),
            "phone": request.phone,
            "date_of_birth": request.date_of_birth,
            "street": request.street.trim(),
            "postal_code": request.postal_code.trim(),
            "city": request.city.trim(),
            "tax_id": request.tax_id.split_whitespace().collect::<String>(),
            "social_security_number": request.social_security_number,
            "health_insurance": request.health_insurance,
            "iban": compact(&request.iban),
            "bic": compact(&request.bic),
            "id_front_path": request.id_front_path,
            "id_back_path": request.id_back_path,
            "status": ContractStatus::Pending.as_str(),
        });

        let result: Vec<EmploymentContract> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/employment_contracts",
            Some(&self.service_key),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let contract = result.into_iter().next()
            .ok_or_else(|| ContractError::DatabaseError("Failed to store contract".to_string()))?;

        info!("Contract {} submitted", contract.id);
        Ok(contract)
    }

    pub async fn list(&self, query: ContractSearchQuery, auth_token: &str) -> Result<Vec<EmploymentContract>, ContractError> {
        let mut filters = vec!["order=created_at.desc".to_string()];
        if let Some(raw) = query.status.as_deref() {
            filters.push(format!("status=eq.{}", Self::parse_status(raw)?));
        }
        filters.push(format!("limit={}", query.limit.unwrap_or(100)));
        if let Some(offset) = query.offset {
            filters.push(format!("offset={}", offset));
        }

        let path = format!("/rest/v1/employment_contracts?{}", filters.join("&"));
        let contracts: Vec<EmploymentContract> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(contracts)
    }

    pub async fn get(&self, contract_id: Uuid, auth_token: &str) -> Result<EmploymentContract, ContractError> {
        let path = format!("/rest/v1/employment_contracts?id=eq.{}", contract_id);
        let result: Vec<EmploymentContract> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        result.into_iter().next().ok_or(ContractError::NotFound)
    }

    /// Persists the review decision. Accepting provisions an employee account;
    /// if that fails the decision still stands and the outcome carries a warning.
    pub async fn update_status(
        &self,
        contract_id: Uuid,
        raw_status: &str,
        auth_token: &str,
    ) -> Result<ContractReviewOutcome, ContractError> {
        let status = Self::parse_status(raw_status)?;

        let mut patch = json!({ "status": status.as_str() });
        if status != ContractStatus::Pending {
            patch["reviewed_at"] = json!(Utc::now().to_rfc3339());
        }

        let path = format!("/rest/v1/employment_contracts?id=eq.{}", contract_id);
        let result: Vec<EmploymentContract> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(patch),
            Some(SupabaseClient::representation_headers()),
        ).await?;
        let contract = result.into_iter().next().ok_or(ContractError::NotFound)?;
        info!("Contract {} is now {}", contract.id, contract.status);

        if status != ContractStatus::Accepted {
            return Ok(ContractReviewOutcome {
                contract,
                account_provisioned: false,
                provisioning_warning: None,
            });
        }

        let provisioning_warning = match self.provisioning.provision_employee(&contract).await {
            Ok(_) => None,
            Err(e) => {
                warn!("Contract {} accepted but account not created: {}", contract.id, e);
                Some(e.to_string())
            }
        };

        Ok(ContractReviewOutcome {
            account_provisioned: provisioning_warning.is_none(),
            provisioning_warning,
            contract,
        })
    }
}
