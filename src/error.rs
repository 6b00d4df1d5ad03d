//! Error types.
//!
//! `CatalogResult<T>` is the result envelope of every catalog operation: either
//! `Ok(data)` or `Err(CatalogError)`, so callers match on it instead of catching
//! faults. Expected failures of the remote API are folded into one of four
//! kinds, plus `Cancelled` for a caller that stopped waiting on its own
//! request. `StoreError` covers the local session-state database.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use thiserror::Error;
use tracing::error;

/// Outcome of a catalog operation
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error taxonomy for remote catalog operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Network failure or timeout. Retryable by the caller.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Credentials rejected. Needs re-authentication.
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// Category, series or stream does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Anything else, including internal faults
    #[error("{0}")]
    Unknown(String),
    /// This caller abandoned the request
    #[error("Request cancelled")]
    Cancelled,
}

impl CatalogError {
    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Transport(_))
    }

    /// Human-readable message for the presentation layer
    pub fn message(&self) -> String {
        match self {
            CatalogError::Transport(m)
            | CatalogError::Auth(m)
            | CatalogError::NotFound(m)
            | CatalogError::Unknown(m) => m.clone(),
            CatalogError::Cancelled => "Request cancelled".to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            error!("Catalog fetch task panicked");
            CatalogError::Unknown("Internal error while loading catalog".to_string())
        } else {
            CatalogError::Cancelled
        }
    }
}

/// Session-state persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Parental PIN is already set")]
    PinAlreadySet,
    #[error("Parental PIN rejected")]
    PinRejected,
    #[error("PIN must be 4 to 8 digits")]
    InvalidPin,
    #[error("Stored PIN record is corrupt")]
    CorruptPin,
}

/// Run an operation and turn a panic inside it into `CatalogError::Unknown`.
pub async fn supervise<T, F>(op: &'static str, fut: F) -> CatalogResult<T>
where
    F: Future<Output = CatalogResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(operation = op, detail = %detail, "Internal fault converted to error");
            Err(CatalogError::Unknown(format!("Internal error in {}", op)))
        }
    }
}
