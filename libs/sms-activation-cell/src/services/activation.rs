// libs/sms-activation-cell/src/services/activation.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{CreateSmsRequest, SmsActivationError, SmsActivationRequest, SmsRequestStatus};

const MAX_CODE_LENGTH: usize = 12;

pub fn validate_code(code: &str) -> Result<String, SmsActivationError> {
    let code = code.trim();
    if code.is_empty() || code.len() > MAX_CODE_LENGTH || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(SmsActivationError::ValidationError(format!("'{}' is not a valid SMS code", code)));
    }
    Ok(code.to_string())
}

pub fn admin_announcement(request: &SmsActivationRequest, requester: Option<&str>) -> String {
    format!(
        "Neue SMS-Anfrage #{}\nDienst: {}\nNummer: {}\nVon: {}\n\n/activate {}",
        request.id,
        request.service_name,
        request.phone_number.as_deref().unwrap_or("-"),
        requester.unwrap_or("unbekannt"),
        request.id
    )
}

pub struct SmsActivationService {
    supabase: Arc<SupabaseClient>,
    service_key: String,
}

impl SmsActivationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    /// Stores the request and tells the administrators about it. The request
    /// stands even if no administrator could be reached.
    pub async fn create(
        &self,
        user: &User,
        request: CreateSmsRequest,
        dispatcher: &NotificationDispatcher,
        auth_token: &str,
    ) -> Result<SmsActivationRequest, SmsActivationError> {
        let service_name = request.service_name.trim();
        if service_name.is_empty() {
            return Err(SmsActivationError::ValidationError("Service name is required".to_string()));
        }

        let body = json!({
            "user_id": user.id,
            "service_name": service_name,
            "phone_number": request.phone_number.as_deref().map(str::trim).filter(|p| !p.is_empty()),
            "status": SmsRequestStatus::Pending.as_str(),
        });

        let result: Vec<SmsActivationRequest> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/sms_requests",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let created = result.into_iter().next()
            .ok_or_else(|| SmsActivationError::DatabaseError("Failed to create SMS request".to_string()))?;
        info!("SMS request #{} created for {}", created.id, user.id);

        if let Err(e) = dispatcher.notify_admins(&admin_announcement(&created, user.email.as_deref())).await {
            warn!("Admins not notified about SMS request #{}: {}", created.id, e);
        }

        Ok(created)
    }

    pub async fn list_for_user(&self, user_id: &str, auth_token: &str) -> Result<Vec<SmsActivationRequest>, SmsActivationError> {
        let path = format!(
            "/rest/v1/sms_requests?user_id=eq.{}&order=created_at.desc",
            urlencoding::encode(user_id)
        );
        let requests: Vec<SmsActivationRequest> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(requests)
    }

    /// Employees only see their own requests; administrators see all.
    pub async fn get_for_user(&self, id: i64, user: &User, auth_token: &str) -> Result<SmsActivationRequest, SmsActivationError> {
        let request = self.fetch(id, auth_token).await?;
        if !user.is_admin() && request.user_id != user.id {
            return Err(SmsActivationError::NotFound(id));
        }
        Ok(request)
    }

    async fn fetch(&self, id: i64, auth_token: &str) -> Result<SmsActivationRequest, SmsActivationError> {
        let path = format!("/rest/v1/sms_requests?id=eq.{}", id);
        let result: Vec<SmsActivationRequest> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        result.into_iter().next().ok_or(SmsActivationError::NotFound(id))
    }

    /// Moves the request to `next` if it is still in the status we read,
    /// so two administrators racing on one request cannot both succeed.
    async fn transition(
        &self,
        id: i64,
        next: SmsRequestStatus,
        mut fields: serde_json::Map<String, Value>,
    ) -> Result<SmsActivationRequest, SmsActivationError> {
        let current = self.fetch(id, &self.service_key).await?;
        if !current.status.can_transition_to(next) {
            return Err(SmsActivationError::InvalidTransition { id, from: current.status, to: next });
        }

        fields.insert("status".to_string(), json!(next.as_str()));
        fields.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/sms_requests?id=eq.{}&status=eq.{}", id, current.status);
        let result: Vec<SmsActivationRequest> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&self.service_key),
            Some(Value::Object(fields)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        match result.into_iter().next() {
            Some(updated) => {
                info!("SMS request #{} {} -> {}", id, current.status, updated.status);
                Ok(updated)
            }
            None => {
                debug!("SMS request #{} changed concurrently", id);
                let latest = self.fetch(id, &self.service_key).await?;
                Err(SmsActivationError::InvalidTransition { id, from: latest.status, to: next })
            }
        }
    }

    pub async fn activate(&self, id: i64) -> Result<SmsActivationRequest, SmsActivationError> {
        self.transition(id, SmsRequestStatus::Active, serde_json::Map::new()).await
    }

    pub async fn send_code(&self, id: i64, code: &str) -> Result<SmsActivationRequest, SmsActivationError> {
        let code = validate_code(code)?;
        let mut fields = serde_json::Map::new();
        fields.insert("sms_code".to_string(), json!(code));
        self.transition(id, SmsRequestStatus::CodeSent, fields).await
    }

    pub async fn complete(&self, id: i64) -> Result<SmsActivationRequest, SmsActivationError> {
        self.transition(id, SmsRequestStatus::Completed, serde_json::Map::new()).await
    }
}
