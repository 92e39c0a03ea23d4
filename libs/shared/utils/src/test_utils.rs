use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub service_role_key: String,
    pub email_api_base_url: String,
    pub telegram_api_base_url: String,
    pub admin_chat_ids: Vec<i64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            service_role_key: "test-service-role-key".to_string(),
            email_api_base_url: "http://localhost:54322".to_string(),
            telegram_api_base_url: "http://localhost:54323".to_string(),
            admin_chat_ids: vec![4242],
        }
    }
}

impl TestConfig {
    /// Points Supabase, the email API and the Telegram API at the same mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            email_api_base_url: uri.to_string(),
            telegram_api_base_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            supabase_service_role_key: self.service_role_key.clone(),
            email_api_key: "test-email-key".to_string(),
            email_api_base_url: self.email_api_base_url.clone(),
            email_from: "Termine <termine@example.com>".to_string(),
            telegram_bot_token: "test-bot-token".to_string(),
            telegram_api_base_url: self.telegram_api_base_url.clone(),
            telegram_admin_chat_ids: self.admin_chat_ids.clone(),
            telegram_webhook_secret: "test-webhook-secret".to_string(),
            reminder_trigger_secret: "test-trigger-secret".to_string(),
            app_base_url: "https://portal.example.com".to_string(),
            fully_booked_threshold: shared_config::DEFAULT_FULLY_BOOKED_THRESHOLD,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "employee".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn employee(email: &str) -> Self {
        Self::new(email, "employee")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        }), secret)
    }

    /// Token shaped like a real Supabase session: database role plus app_metadata role.
    pub fn create_token_with_app_role(user: &TestUser, secret: &str, app_role: &str) -> String {
        let now = Utc::now();
        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "app_metadata": { "role": app_role },
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp()
        }), secret)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn recipient_response(recipient_id: &str, token: &str) -> Value {
        json!({
            "id": recipient_id,
            "first_name": "Erika",
            "last_name": "Mustermann",
            "email": "erika@example.com",
            "token": token,
            "email_sent": false,
            "phone_note": null,
            "created_at": "2025-06-01T08:00:00Z"
        })
    }

    pub fn appointment_response(recipient_id: &str, date: &str, time: &str, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "recipient_id": recipient_id,
            "appointment_date": date,
            "appointment_time": time,
            "status": status,
            "created_at": "2025-06-01T08:00:00Z",
            "confirmed_at": null,
            "reminder_sent_at": null
        })
    }

    pub fn blocked_time_response(date: &str, time: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "blocked_date": date,
            "blocked_time": time,
            "reason": null,
            "created_at": "2025-06-01T08:00:00Z"
        })
    }

    pub fn sms_request_response(id: i64, user_id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "service_name": "WhatsApp",
            "phone_number": "+4915112345678",
            "status": status,
            "sms_code": null,
            "created_at": "2025-06-01T08:00:00Z",
            "updated_at": "2025-06-01T08:00:00Z"
        })
    }

    pub fn contract_response(contract_id: &str, status: &str) -> Value {
        json!({
            "id": contract_id,
            "appointment_id": null,
            "first_name": "Max",
            "last_name": "Muster",
            "email": "max@example.com",
            "phone": "+4917612345678",
            "date_of_birth": "1990-04-01",
            "street": "Hauptstr. 1",
            "postal_code": "10115",
            "city": "Berlin",
            "tax_id": "12345678901",
            "social_security_number": null,
            "health_insurance": "TK",
            "iban": "DE89370400440532013000",
            "bic": "COBADEFFXXX",
            "id_front_path": "contracts/front.jpg",
            "id_back_path": "contracts/back.jpg",
            "status": status,
            "created_at": "2025-06-01T08:00:00Z",
            "reviewed_at": null
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
