//! The module contains the errors the ledger engine can throw.
//!
//! Validation failures ([`InvalidAmount`], [`InvalidDuration`], [`EmptySplit`],
//! [`UnknownKind`]) are recoverable: the caller re-prompts. [`NoAccounts`] is a
//! state failure that aborts the operation. [`Store`] wraps persistence
//! failures; a failed write leaves the previous on-disk document untouched.
//!
//!  [`InvalidAmount`]: LedgerError::InvalidAmount
//!  [`InvalidDuration`]: LedgerError::InvalidDuration
//!  [`EmptySplit`]: LedgerError::EmptySplit
//!  [`UnknownKind`]: LedgerError::UnknownKind
//!  [`NoAccounts`]: LedgerError::NoAccounts
//!  [`Store`]: LedgerError::Store
use thiserror::Error;

/// Failures of the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Ledger engine custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
    #[error("The expense must be split with at least one member")]
    EmptySplit,
    #[error("Unknown transaction kind: {0}")]
    UnknownKind(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("No accounts exist yet")]
    NoAccounts,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidDuration(a), Self::InvalidDuration(b)) => a == b,
            (Self::EmptySplit, Self::EmptySplit) => true,
            (Self::UnknownKind(a), Self::UnknownKind(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::NoAccounts, Self::NoAccounts) => true,
            (Self::Store(a), Self::Store(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
