// libs/appointment-cell/src/services/recipient.rs
use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{
    AppointmentError, CreateRecipientRequest, ImportRecipientsRequest, ImportRecipientsResponse,
    Recipient, RecipientSearchQuery,
};

pub const BOOKING_TOKEN_LENGTH: usize = 32;

pub fn generate_booking_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOOKING_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub struct RecipientService {
    supabase: Arc<SupabaseClient>,
    config: AppConfig,
}

impl RecipientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            config: config.clone(),
        }
    }

    fn validate(request: &CreateRecipientRequest) -> Result<(), AppointmentError> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(AppointmentError::ValidationError("First and last name are required".to_string()));
        }
        let email = request.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppointmentError::ValidationError(format!("Invalid email address: {}", request.email)));
        }
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str, auth_token: &str) -> Result<Option<Recipient>, AppointmentError> {
        let path = format!(
            "/rest/v1/recipients?email=eq.{}&limit=1",
            urlencoding::encode(&email.trim().to_lowercase())
        );
        let result: Vec<Recipient> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(result.into_iter().next())
    }

    pub async fn create(&self, request: CreateRecipientRequest, auth_token: &str) -> Result<Recipient, AppointmentError> {
        Self::validate(&request)?;

        let email = request.email.trim().to_lowercase();
        if self.find_by_email(&email, auth_token).await?.is_some() {
            return Err(AppointmentError::DuplicateRecipient(email));
        }

        let body = json!({
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "email": email,
            "token": generate_booking_token(),
            "email_sent": false,
            "phone_note": request.phone_note,
        });

        let result: Vec<Recipient> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/recipients",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| {
            if is_conflict(&e) {
                AppointmentError::DuplicateRecipient(email.clone())
            } else {
                AppointmentError::from(e)
            }
        })?;

        let recipient = result.into_iter().next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create recipient".to_string()))?;

        info!("Recipient {} created", recipient.id);
        Ok(recipient)
    }

    /// Creates each entry independently; duplicates and invalid rows are reported, not fatal.
    pub async fn import(&self, request: ImportRecipientsRequest, auth_token: &str) -> Result<ImportRecipientsResponse, AppointmentError> {
        let mut response = ImportRecipientsResponse { created: Vec::new(), skipped: Vec::new() };

        for entry in request.recipients {
            let email = entry.email.clone();
            match self.create(entry, auth_token).await {
                Ok(recipient) => response.created.push(recipient),
                Err(AppointmentError::DuplicateRecipient(_)) | Err(AppointmentError::ValidationError(_)) => {
                    debug!("Skipping recipient {}", email);
                    response.skipped.push(email);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Imported {} recipients, skipped {}", response.created.len(), response.skipped.len());
        Ok(response)
    }

    pub async fn list(&self, query: RecipientSearchQuery, auth_token: &str) -> Result<Vec<Recipient>, AppointmentError> {
        let mut filters = vec!["order=created_at.desc".to_string()];

        if let Some(email_sent) = query.email_sent {
            filters.push(format!("email_sent=eq.{}", email_sent));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = urlencoding::encode(&format!("*{}*", search)).into_owned();
            filters.push(format!(
                "or=(first_name.ilike.{p},last_name.ilike.{p},email.ilike.{p})",
                p = pattern
            ));
        }
        filters.push(format!("limit={}", query.limit.unwrap_or(100)));
        if let Some(offset) = query.offset {
            filters.push(format!("offset={}", offset));
        }

        let path = format!("/rest/v1/recipients?{}", filters.join("&"));
        let recipients: Vec<Recipient> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(recipients)
    }

    pub async fn get(&self, recipient_id: Uuid, auth_token: &str) -> Result<Recipient, AppointmentError> {
        let path = format!("/rest/v1/recipients?id=eq.{}", recipient_id);
        let result: Vec<Recipient> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        result.into_iter().next().ok_or(AppointmentError::UnknownRecipient)
    }

    /// Resolves a booking link. Unknown tokens are a not-found that sends the visitor home.
    pub async fn get_by_token(&self, token: &str, auth_token: &str) -> Result<Recipient, AppointmentError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppointmentError::RecipientNotFound);
        }

        let path = format!("/rest/v1/recipients?token=eq.{}&limit=1", urlencoding::encode(token));
        let result: Vec<Recipient> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        result.into_iter().next().ok_or(AppointmentError::RecipientNotFound)
    }

    /// Emails the booking link and marks the recipient as invited.
    pub async fn send_invitation(
        &self,
        recipient_id: Uuid,
        dispatcher: &NotificationDispatcher,
        auth_token: &str,
    ) -> Result<Recipient, AppointmentError> {
        let recipient = self.get(recipient_id, auth_token).await?;
        let url = self.config.booking_url(&recipient.token);

        dispatcher
            .send_booking_invitation(&recipient.first_name, &recipient.email, &url)
            .await
            .map_err(|e| {
                warn!("Invitation to {} failed: {}", recipient.email, e);
                AppointmentError::NotificationFailed(e.to_string())
            })?;

        let path = format!("/rest/v1/recipients?id=eq.{}", recipient_id);
        let result: Vec<Recipient> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "email_sent": true })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let updated = result.into_iter().next().ok_or(AppointmentError::UnknownRecipient)?;
        info!("Invitation sent to recipient {}", updated.id);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_alphanumeric_and_distinct() {
        let first = generate_booking_token();
        let second = generate_booking_token();

        assert_eq!(first.len(), BOOKING_TOKEN_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn validation_rejects_blank_names_and_bad_email() {
        let mut request = CreateRecipientRequest {
            first_name: "Erika".to_string(),
            last_name: "Mustermann".to_string(),
            email: "erika@example.com".to_string(),
            phone_note: None,
        };
        assert!(RecipientService::validate(&request).is_ok());

        request.email = "not-an-email".to_string();
        assert!(RecipientService::validate(&request).is_err());

        request.email = "erika@example.com".to_string();
        request.last_name = "  ".to_string();
        assert!(RecipientService::validate(&request).is_err());
    }
}
