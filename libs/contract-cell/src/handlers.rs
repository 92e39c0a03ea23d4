// libs/contract-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Local;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{ContractSearchQuery, SubmitContractRequest, UpdateContractStatusRequest};
use crate::services::contract::ContractService;

#[axum::debug_handler]
pub async fn submit_contract(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<SubmitContractRequest>,
) -> Result<Json<Value>, AppError> {
    let contract = ContractService::new(&state)
        .submit(request, Local::now().date_naive())
        .await?;

    Ok(Json(json!({
        "success": true,
        "contract_id": contract.id,
        "status": contract.status,
    })))
}

#[axum::debug_handler]
pub async fn list_contracts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ContractSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let contracts = ContractService::new(&state).list(query, auth.token()).await?;
    Ok(Json(json!({
        "total": contracts.len(),
        "contracts": contracts,
    })))
}

#[axum::debug_handler]
pub async fn get_contract(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let contract = ContractService::new(&state).get(contract_id, auth.token()).await?;
    Ok(Json(json!(contract)))
}

#[axum::debug_handler]
pub async fn update_contract_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(contract_id): Path<Uuid>,
    Json(request): Json<UpdateContractStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let outcome = ContractService::new(&state)
        .update_status(contract_id, &request.status, auth.token())
        .await?;

    Ok(Json(json!({
        "contract": outcome.contract,
        "account_provisioned": outcome.account_provisioned,
        "warning": outcome.provisioning_warning,
    })))
}
