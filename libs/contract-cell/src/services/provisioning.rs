// libs/contract-cell/src/services/provisioning.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ContractError, EmploymentContract, ProvisionedAccount};

pub const EMPLOYEE_ROLE: &str = "employee";

/// Creates employee logins through the Supabase Auth admin API.
pub struct AccountProvisioningService {
    supabase: Arc<SupabaseClient>,
    service_key: String,
}

impl AccountProvisioningService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    pub async fn provision_employee(&self, contract: &EmploymentContract) -> Result<ProvisionedAccount, ContractError> {
        if self.service_key.is_empty() {
            return Err(ContractError::ProvisioningFailed("service role key not configured".to_string()));
        }
        debug!("Provisioning account for contract {}", contract.id);

        let body = json!({
            "email": contract.email,
            "email_confirm": true,
            "app_metadata": { "role": EMPLOYEE_ROLE },
            "user_metadata": {
                "first_name": contract.first_name,
                "last_name": contract.last_name,
                "contract_id": contract.id,
            }
        });

        let account: ProvisionedAccount = self.supabase
            .request(Method::POST, "/auth/v1/admin/users", Some(&self.service_key), Some(body))
            .await
            .map_err(|e| ContractError::ProvisioningFailed(e.to_string()))?;

        info!("Account {} provisioned for contract {}", account.id, contract.id);
        Ok(account)
    }
}
