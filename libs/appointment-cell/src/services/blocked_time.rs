// libs/appointment-cell/src/services/blocked_time.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{AppointmentError, BlockedTime, BlockedTimeQuery, CreateBlockedTimeRequest};
use crate::services::slots::{canonical_time, is_catalog_slot, same_time};

pub struct BlockedTimeService {
    supabase: Arc<SupabaseClient>,
}

impl BlockedTimeService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub async fn list(&self, query: BlockedTimeQuery, auth_token: &str) -> Result<Vec<BlockedTime>, AppointmentError> {
        let mut filters = vec!["order=blocked_date.asc,blocked_time.asc".to_string()];

        if let Some(date) = query.date {
            filters.push(format!("blocked_date=eq.{}", date));
        } else {
            if let Some(from) = query.from_date {
                filters.push(format!("blocked_date=gte.{}", from));
            }
            if let Some(to) = query.to_date {
                filters.push(format!("blocked_date=lte.{}", to));
            }
        }

        let path = format!("/rest/v1/blocked_times?{}", filters.join("&"));
        let blocked: Vec<BlockedTime> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(blocked)
    }

    pub async fn create(&self, request: CreateBlockedTimeRequest, auth_token: &str) -> Result<BlockedTime, AppointmentError> {
        if !is_catalog_slot(&request.blocked_time) {
            return Err(AppointmentError::InvalidTime(request.blocked_time));
        }
        let time = canonical_time(&request.blocked_time)?;

        // legacy rows may be stored as HH:MM, so compare parsed times of the whole day
        let existing_path = format!("/rest/v1/blocked_times?blocked_date=eq.{}", request.blocked_date);
        let existing: Vec<BlockedTime> = self.supabase.request(Method::GET, &existing_path, Some(auth_token), None).await?;
        if existing.iter().any(|blocked| same_time(&blocked.blocked_time, &time)) {
            return Err(AppointmentError::DuplicateBlockedTime { date: request.blocked_date, time });
        }

        let body = json!({
            "blocked_date": request.blocked_date,
            "blocked_time": time,
            "reason": request.reason,
        });

        let result: Vec<BlockedTime> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/blocked_times",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| {
            if is_conflict(&e) {
                AppointmentError::DuplicateBlockedTime { date: request.blocked_date, time: time.clone() }
            } else {
                AppointmentError::from(e)
            }
        })?;

        let blocked = result.into_iter().next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create blocked time".to_string()))?;

        info!("Blocked {} {}", blocked.blocked_date, blocked.blocked_time);
        Ok(blocked)
    }

    pub async fn delete(&self, blocked_time_id: Uuid, auth_token: &str) -> Result<BlockedTime, AppointmentError> {
        let path = format!("/rest/v1/blocked_times?id=eq.{}", blocked_time_id);
        let result: Vec<BlockedTime> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let removed = result.into_iter().next().ok_or(AppointmentError::BlockedTimeNotFound)?;
        info!("Unblocked {} {}", removed.blocked_date, removed.blocked_time);
        Ok(removed)
    }
}
