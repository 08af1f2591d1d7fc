use thiserror::Error;

/// Closed failure set for every core operation. Callers branch on the kind,
/// never on message text.
#[derive(Error, Debug)]
pub enum BankError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("destination account [{0}] not found")]
    DestinationNotFound(i64),
    // Detail-free on purpose: the client must not learn which check failed.
    #[error("permission denied")]
    PermissionDenied,
    #[error("invalid token")]
    InvalidToken,
    #[error("storage error: {0}")]
    StoreFailure(String),
}
