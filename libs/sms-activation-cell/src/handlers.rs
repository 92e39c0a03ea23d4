// libs/sms-activation-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::CreateSmsRequest;
use crate::services::activation::SmsActivationService;

#[axum::debug_handler]
pub async fn create_sms_request(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSmsRequest>,
) -> Result<Json<Value>, AppError> {
    let dispatcher = NotificationDispatcher::new(&state);
    let created = SmsActivationService::new(&state)
        .create(&user, request, &dispatcher, auth.token())
        .await?;

    Ok(Json(json!(created)))
}

#[axum::debug_handler]
pub async fn list_my_sms_requests(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let requests = SmsActivationService::new(&state)
        .list_for_user(&user.id, auth.token())
        .await?;

    Ok(Json(json!({
        "total": requests.len(),
        "requests": requests,
    })))
}

#[axum::debug_handler]
pub async fn get_sms_request(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let request = SmsActivationService::new(&state)
        .get_for_user(request_id, &user, auth.token())
        .await?;

    Ok(Json(json!(request)))
}
