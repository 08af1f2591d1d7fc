//! Authorization gate for routes addressing a single account.
//!
//! Pure boundary check: either the caller's token matches the targeted
//! account and the resolved record comes back, or the request dies with one
//! undifferentiated `PermissionDenied`. Token failures, unknown ids, and
//! number mismatches are indistinguishable to the client so the endpoint
//! cannot be used to enumerate accounts.

use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::debug;

use super::token::TokenService;
use crate::account::store::AccountStore;
use crate::account::types::Account;
use crate::error::BankError;

/// Request header carrying the signed token.
pub const TOKEN_HEADER: &str = "x-bank-token";

pub struct AuthGate {
    store: Arc<dyn AccountStore>,
    tokens: Arc<TokenService>,
}

impl AuthGate {
    pub fn new(store: Arc<dyn AccountStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    /// Admit the request only if the presented token authorizes exactly the
    /// account behind `account_id`. Never mutates state.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        account_id: i64,
    ) -> Result<Account, BankError> {
        // Fail closed before touching the token service.
        let token = headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(BankError::PermissionDenied)?;

        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(?err, "token verification failed");
                return Err(BankError::PermissionDenied);
            }
        };

        let account = match self.store.get(account_id).await {
            Ok(account) => account,
            Err(err) => {
                debug!(account_id, %err, "account resolution failed during authorization");
                return Err(BankError::PermissionDenied);
            }
        };

        if account.account_number != claims.account_number {
            debug!(account_id, "token subject does not match targeted account");
            return Err(BankError::PermissionDenied);
        }

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::store::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, Arc<TokenService>, AuthGate, Account, Account) {
        let store = Arc::new(MemoryStore::new());
        let a = store
            .create(Account::new("a".into(), "x".into(), "hash".into(), 100))
            .await
            .unwrap();
        let b = store
            .create(Account::new("b".into(), "y".into(), "hash".into(), 100))
            .await
            .unwrap();
        let tokens = Arc::new(TokenService::new("gate_test_secret".as_bytes().to_vec()));
        let gate = AuthGate::new(store.clone(), tokens.clone());
        (store, tokens, gate, a, b)
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn valid_token_for_own_account_is_admitted() {
        let (_store, tokens, gate, a, _b) = setup().await;
        let token = tokens.mint(a.account_number).unwrap();

        let admitted = gate.authorize(&headers_with(&token), a.id).await.unwrap();
        assert_eq!(admitted.id, a.id);
        assert_eq!(admitted.account_number, a.account_number);
    }

    #[tokio::test]
    async fn missing_header_fails_closed() {
        let (_store, _tokens, gate, a, _b) = setup().await;
        assert!(matches!(
            gate.authorize(&HeaderMap::new(), a.id).await,
            Err(BankError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn token_for_other_account_is_denied() {
        let (_store, tokens, gate, a, b) = setup().await;
        let token = tokens.mint(a.account_number).unwrap();

        assert!(matches!(
            gate.authorize(&headers_with(&token), b.id).await,
            Err(BankError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn unknown_account_id_is_denied_not_not_found() {
        let (_store, tokens, gate, a, _b) = setup().await;
        let token = tokens.mint(a.account_number).unwrap();

        // Existence of the target must be indistinguishable from a mismatch.
        assert!(matches!(
            gate.authorize(&headers_with(&token), 9_999).await,
            Err(BankError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_denied() {
        let (_store, _tokens, gate, a, _b) = setup().await;
        assert!(matches!(
            gate.authorize(&headers_with("junk.junk.junk"), a.id).await,
            Err(BankError::PermissionDenied)
        ));
    }
}
