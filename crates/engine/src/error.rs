//! The module contains the errors the engine can return.
//!
//! Every variant maps to an [`ErrorKind`], the stable, serializable tag the
//! caller-facing [`Response`] carries next to a human-readable message.
//!
//!  [`Response`]: crate::Response
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    #[error("Partial failure: {0}")]
    PartialFailure(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Stable error tag exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    WalletNotFound,
    TransactionNotFound,
    InsufficientBalance,
    UploadFailed,
    StoreUnavailable,
    Conflict,
    PartialFailure,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::WalletNotFound(_) => ErrorKind::WalletNotFound,
            Self::TransactionNotFound(_) => ErrorKind::TransactionNotFound,
            Self::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            Self::UploadFailed(_) => ErrorKind::UploadFailed,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::PartialFailure(_) => ErrorKind::PartialFailure,
            Self::StoreUnavailable(_) | Self::Database(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Short message suitable for end users.
    ///
    /// Business failures get a fixed, actionable sentence; backend text is
    /// only exposed for unexpected store faults.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => format!("Invalid input: {reason}"),
            Self::WalletNotFound(_) => "Wallet not found".to_string(),
            Self::TransactionNotFound(_) => "Transaction not found".to_string(),
            Self::InsufficientBalance(_) => {
                "Selected wallet doesn't have enough balance".to_string()
            }
            Self::UploadFailed(_) => "Failed to upload image".to_string(),
            Self::Conflict(_) => "Wallet was modified concurrently, please retry".to_string(),
            Self::PartialFailure(_) => {
                "Wallet was updated but the transaction could not be saved, please retry"
                    .to_string()
            }
            Self::StoreUnavailable(reason) => reason.clone(),
            Self::Database(err) => err.to_string(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::WalletNotFound(a), Self::WalletNotFound(b)) => a == b,
            (Self::TransactionNotFound(a), Self::TransactionNotFound(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::UploadFailed(a), Self::UploadFailed(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::PartialFailure(a), Self::PartialFailure(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
