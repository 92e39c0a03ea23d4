use std::env;
use tracing::warn;

pub const DEFAULT_FULLY_BOOKED_THRESHOLD: u32 = 19;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub email_api_key: String,
    pub email_api_base_url: String,
    pub email_from: String,
    pub telegram_bot_token: String,
    pub telegram_api_base_url: String,
    pub telegram_admin_chat_ids: Vec<i64>,
    pub telegram_webhook_secret: String,
    pub reminder_trigger_secret: String,
    pub app_base_url: String,
    pub fully_booked_threshold: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: required("SUPABASE_URL"),
            supabase_anon_key: required("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET"),
            supabase_service_role_key: required("SUPABASE_SERVICE_ROLE_KEY"),
            email_api_key: required("EMAIL_API_KEY"),
            email_api_base_url: env::var("EMAIL_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_API_BASE_URL not set, using default");
                    "https://api.resend.com".to_string()
                }),
            email_from: required("EMAIL_FROM"),
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN"),
            telegram_api_base_url: env::var("TELEGRAM_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("TELEGRAM_API_BASE_URL not set, using default");
                    "https://api.telegram.org".to_string()
                }),
            telegram_admin_chat_ids: env::var("TELEGRAM_ADMIN_CHAT_IDS")
                .map(|raw| parse_chat_ids(&raw))
                .unwrap_or_else(|_| {
                    warn!("TELEGRAM_ADMIN_CHAT_IDS not set, bot commands will be ignored");
                    Vec::new()
                }),
            telegram_webhook_secret: required("TELEGRAM_WEBHOOK_SECRET"),
            reminder_trigger_secret: required("REMINDER_TRIGGER_SECRET"),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("APP_BASE_URL not set, using default");
                    "http://localhost:3000".to_string()
                }),
            fully_booked_threshold: env::var("FULLY_BOOKED_THRESHOLD")
                .ok()
                .and_then(|raw| match raw.trim().parse::<u32>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("FULLY_BOOKED_THRESHOLD '{}' is not a number, using default", raw);
                        None
                    }
                })
                .unwrap_or(DEFAULT_FULLY_BOOKED_THRESHOLD),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_key.is_empty()
            && !self.email_api_base_url.is_empty()
            && !self.email_from.is_empty()
    }

    pub fn is_telegram_configured(&self) -> bool {
        !self.telegram_bot_token.is_empty() && !self.telegram_api_base_url.is_empty()
    }

    pub fn is_admin_chat(&self, chat_id: i64) -> bool {
        self.telegram_admin_chat_ids.contains(&chat_id)
    }

    /// Public booking link handed out to a recipient.
    pub fn booking_url(&self, token: &str) -> String {
        format!("{}/booking/{}", self.app_base_url.trim_end_matches('/'), token)
    }
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn parse_chat_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring invalid Telegram chat id '{}'", part);
                None
            }
        })
        .collect()
}
