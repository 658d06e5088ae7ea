//! Error types for the core library.

use thiserror::Error;

use crate::run::{EligibilityError, RunId};
use chatledger_api::GroupId;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote API operation failed.
    #[error("API error: {0}")]
    Api(#[from] chatledger_api::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Cache run rejected by the eligibility guard. No run record was
    /// persisted.
    #[error("cache run rejected: {}", reasons(.0))]
    Ineligible(Vec<EligibilityError>),

    /// Cache run not found.
    #[error("cache run not found: {0}")]
    RunNotFound(RunId),

    /// Group not found in local storage.
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),
}

fn reasons(errors: &[EligibilityError]) -> String {
    errors
        .iter()
        .map(EligibilityError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
