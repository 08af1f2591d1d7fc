//! Route handlers. Thin by design: decode, authorize, delegate to the
//! account domain, wrap the result.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::{debug, info};

use super::types::{CreateAccountRequest, DeleteResponse, LoginRequest, LoginResponse};
use super::ApiState;
use crate::account::{Account, TransferIntent};
use crate::auth::password;
use crate::error::BankError;

/// POST /login
///
/// Unknown account numbers and wrong passwords produce the same
/// `PermissionDenied` so login cannot be used to probe for accounts.
pub async fn login(
    State(state): State<ApiState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, BankError> {
    let account = state
        .store
        .get_by_account_number(req.account_number)
        .await
        .map_err(|err| {
            debug!(%err, "login lookup failed");
            BankError::PermissionDenied
        })?;

    password::verify_password(&req.password, &account.password_hash)
        .map_err(|_| BankError::PermissionDenied)?;

    let token = state.tokens.mint(account.account_number)?;
    info!(account_number = account.account_number, "login succeeded");

    Ok(Json(LoginResponse {
        account_number: account.account_number,
        token,
    }))
}

/// GET /account
pub async fn list_accounts(State(state): State<ApiState>) -> Result<Json<Vec<Account>>, BankError> {
    let accounts = state.store.list().await?;
    Ok(Json(accounts))
}

/// POST /account
pub async fn create_account(
    State(state): State<ApiState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<Account>, BankError> {
    if req.password.is_empty() {
        return Err(BankError::InvalidRequest("password is required".into()));
    }
    if req.deposit < 0 {
        return Err(BankError::InvalidRequest(
            "deposit cannot be negative".into(),
        ));
    }

    let password_hash = password::hash_password(&req.password)
        .map_err(|_| BankError::StoreFailure("password hashing failed".into()))?;

    let account = state
        .store
        .create(Account::new(
            req.first_name,
            req.last_name,
            password_hash,
            req.deposit,
        ))
        .await?;

    info!(
        id = account.id,
        account_number = account.account_number,
        "account created"
    );
    Ok(Json(account))
}

/// GET /account/:id (gated)
pub async fn get_account(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Account>, BankError> {
    let account = state.gate.authorize(&headers, id).await?;
    Ok(Json(account))
}

/// DELETE /account/:id (gated)
pub async fn delete_account(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>, BankError> {
    state.gate.authorize(&headers, id).await?;
    state.store.delete(id).await?;
    info!(id, "account deleted");
    Ok(Json(DeleteResponse { deleted: id }))
}

/// POST /account/:id/transfer (gated)
pub async fn transfer(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(intent): Json<TransferIntent>,
) -> Result<Json<Account>, BankError> {
    state.gate.authorize(&headers, id).await?;
    let updated = state.transfers.execute(id, &intent).await?;
    Ok(Json(updated))
}
