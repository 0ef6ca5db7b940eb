//! The module contains the errors the engine can throw.
//!
//! Validation failures are surfaced directly to the caller and are never
//! retried by the engine:
//!
//! - [`OverAllocation`] thrown when an allocation would exceed the project's
//!   total shares.
//! - [`InsufficientShares`] thrown when an owner's tradable holding does not
//!   cover the requested count.
//! - [`InvalidProject`] thrown when the project is not in a status that allows
//!   the operation.
//! - [`TransactionNotListed`] / [`TransactionNotMatched`] thrown when a share
//!   transaction is not in the expected state.
//! - [`SelfTrade`] thrown when a seller tries to buy their own listing.
//! - [`DuplicatePeriod`] thrown when an income period overlaps a distributed
//!   one.
//! - [`ProjectNotActive`] thrown when income is distributed for a project that
//!   is not operating.
//!
//! [`TransactionFailed`] is the only retryable error: the settlement was
//! rolled back and the soft-lock released.
//!
//!  [`OverAllocation`]: EngineError::OverAllocation
//!  [`InsufficientShares`]: EngineError::InsufficientShares
//!  [`InvalidProject`]: EngineError::InvalidProject
//!  [`TransactionNotListed`]: EngineError::TransactionNotListed
//!  [`TransactionNotMatched`]: EngineError::TransactionNotMatched
//!  [`SelfTrade`]: EngineError::SelfTrade
//!  [`DuplicatePeriod`]: EngineError::DuplicatePeriod
//!  [`ProjectNotActive`]: EngineError::ProjectNotActive
//!  [`TransactionFailed`]: EngineError::TransactionFailed
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Over allocation: {0}")]
    OverAllocation(String),
    #[error("Insufficient shares: {0}")]
    InsufficientShares(String),
    #[error("Invalid project: {0}")]
    InvalidProject(String),
    #[error("Transaction not listed: {0}")]
    TransactionNotListed(String),
    #[error("Transaction not matched: {0}")]
    TransactionNotMatched(String),
    #[error("Self trade: {0}")]
    SelfTrade(String),
    #[error("Duplicate period: {0}")]
    DuplicatePeriod(String),
    #[error("Project not active: {0}")]
    ProjectNotActive(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when the caller may resubmit the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionFailed(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::OverAllocation(a), Self::OverAllocation(b)) => a == b,
            (Self::InsufficientShares(a), Self::InsufficientShares(b)) => a == b,
            (Self::InvalidProject(a), Self::InvalidProject(b)) => a == b,
            (Self::TransactionNotListed(a), Self::TransactionNotListed(b)) => a == b,
            (Self::TransactionNotMatched(a), Self::TransactionNotMatched(b)) => a == b,
            (Self::SelfTrade(a), Self::SelfTrade(b)) => a == b,
            (Self::DuplicatePeriod(a), Self::DuplicatePeriod(b)) => a == b,
            (Self::ProjectNotActive(a), Self::ProjectNotActive(b)) => a == b,
            (Self::TransactionFailed(a), Self::TransactionFailed(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
