//! HTTP surface: router, shared state, and the error-to-status mapping.

pub mod handlers;
pub mod types;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::account::{AccountStore, TransferOrchestrator};
use crate::auth::{AuthGate, TokenService};
use crate::error::BankError;
use types::ApiErrorBody;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn AccountStore>,
    pub tokens: Arc<TokenService>,
    pub gate: Arc<AuthGate>,
    pub transfers: TransferOrchestrator,
}

impl ApiState {
    pub fn new(store: Arc<dyn AccountStore>, tokens: Arc<TokenService>) -> Self {
        let gate = Arc::new(AuthGate::new(store.clone(), tokens.clone()));
        let transfers = TransferOrchestrator::new(store.clone());
        Self {
            store,
            tokens,
            gate,
            transfers,
        }
    }
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/login", post(handlers::login))
        .route(
            "/account",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/account/:id",
            get(handlers::get_account).delete(handlers::delete_account),
        )
        .route("/account/:id/transfer", post(handlers::transfer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct ApiServer {
    state: ApiState,
    bind_addr: std::net::SocketAddr,
}

impl ApiServer {
    pub fn new(state: ApiState, bind_addr: std::net::SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let app = build_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        info!("API server listening on {}", listener.local_addr()?);
        axum::serve(listener, app).await
    }
}

impl IntoResponse for BankError {
    fn into_response(self) -> Response {
        let status = match self {
            BankError::PermissionDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = ApiErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
