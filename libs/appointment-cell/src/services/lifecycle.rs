// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Applies status changes to stored appointments. Any allow-listed value may
/// replace any other; only unknown values are rejected.
pub struct AppointmentLifecycleService {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub fn parse_status(raw: &str) -> Result<AppointmentStatus, AppointmentError> {
        raw.trim().parse::<AppointmentStatus>().map_err(|e| {
            warn!("Rejected appointment status '{}'", raw);
            e
        })
    }

    /// Fields written for a status change. Confirming also stamps `confirmed_at`.
    pub fn status_patch(status: AppointmentStatus) -> Value {
        let mut patch = serde_json::Map::new();
        patch.insert("status".to_string(), json!(status.as_str()));

        if status == AppointmentStatus::Confirmed {
            patch.insert("confirmed_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        Value::Object(patch)
    }

    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        raw_status: &str,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let status = Self::parse_status(raw_status)?;
        debug!("Setting appointment {} to {}", appointment_id, status);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Self::status_patch(status)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let appointment = result.into_iter().next().ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} is now {}", appointment.id, appointment.status);
        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn every_allowed_status_parses() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentLifecycleService::parse_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_lists_allowed_values() {
        let err = AppointmentLifecycleService::parse_status("completed").unwrap_err();

        assert_matches!(&err, AppointmentError::InvalidStatus { value, allowed } => {
            assert_eq!(value, "completed");
            assert!(allowed.contains("infos_angefragt"));
            assert!(allowed.contains("mailbox"));
        });
    }

    #[test]
    fn status_match_is_case_sensitive() {
        assert!(AppointmentLifecycleService::parse_status("Confirmed").is_err());
        assert!(AppointmentLifecycleService::parse_status("").is_err());
    }

    #[test]
    fn confirming_stamps_confirmed_at() {
        let patch = AppointmentLifecycleService::status_patch(AppointmentStatus::Confirmed);
        assert_eq!(patch["status"], "confirmed");
        assert!(patch.get("confirmed_at").is_some());

        let patch = AppointmentLifecycleService::status_patch(AppointmentStatus::Mailbox);
        assert_eq!(patch["status"], "mailbox");
        assert!(patch.get("confirmed_at").is_none());
    }
}
