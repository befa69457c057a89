//! Movement and statement handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, ErrorBody, MovementPayload, MovementResponse, StatementResponse, ok,
};
use crate::ledger::{AccountId, LedgerError, MovementRequest};

/// Parse the path id; anything non-numeric or outside the configured range is unknown.
fn resolve_account(state: &AppState, raw: &str) -> Result<AccountId, ApiError> {
    match raw.parse::<AccountId>() {
        Ok(id) if state.accounts.in_range(id) => Ok(id),
        _ => Err(LedgerError::AccountNotFound.into()),
    }
}

/// Apply a debit or credit
///
/// POST /clientes/{id}/transacoes
#[utoipa::path(
    post,
    path = "/clientes/{id}/transacoes",
    params(("id" = i32, Path, description = "Account id")),
    request_body(content = MovementPayload, description = "Movement", content_type = "application/json"),
    responses(
        (status = 200, description = "Movement applied", body = MovementResponse),
        (status = 400, description = "Malformed payload", body = ErrorBody),
        (status = 404, description = "Unknown account", body = ErrorBody),
        (status = 413, description = "Payload too large", body = ErrorBody),
        (status = 422, description = "Validation failed or limit exceeded", body = ErrorBody),
        (status = 503, description = "Lock or operation timeout", body = ErrorBody)
    ),
    tag = "Ledger"
)]
pub async fn create_movement(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<MovementPayload>, JsonRejection>,
) -> ApiResult<MovementResponse> {
    let account_id = resolve_account(&state, &raw_id)?;
    let Json(payload) = payload?;
    let request = MovementRequest::from(payload);

    // Only failures before the first write are safe to repeat
    let engine = &state.engine;
    let request = &request;
    let receipt = state
        .retry
        .run(
            "apply_movement",
            |e| matches!(e, LedgerError::Unavailable(_)),
            || engine.apply_movement(account_id, request.clone()),
        )
        .await?;

    ok(MovementResponse::from(receipt))
}

/// Statement: balance, limit and up to 10 newest movements
///
/// GET /clientes/{id}/extrato
#[utoipa::path(
    get,
    path = "/clientes/{id}/extrato",
    params(("id" = i32, Path, description = "Account id")),
    responses(
        (status = 200, description = "Statement", body = StatementResponse),
        (status = 404, description = "Unknown account", body = ErrorBody),
        (status = 503, description = "Service unavailable", body = ErrorBody)
    ),
    tag = "Ledger"
)]
pub async fn get_statement(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatementResponse> {
    let account_id = resolve_account(&state, &raw_id)?;

    let engine = &state.engine;
    let statement = state
        .retry
        .run(
            "statement",
            |e| {
                matches!(
                    e,
                    LedgerError::Unavailable(_) | LedgerError::LockTimeout | LedgerError::Timeout
                )
            },
            || engine.statement(account_id),
        )
        .await?;

    ok(StatementResponse::from(statement))
}
