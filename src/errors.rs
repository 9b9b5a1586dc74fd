//! Error handling for the election ledger

use crate::types::{CandidateId, Identity, Phase};

/// Result type alias for the election ledger
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the election ledger
///
/// Every variant is a synchronous validation failure raised before any state
/// is written, so a failed call always leaves the ledger unchanged.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Candidate list or election setup rejected
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Candidate registry was already initialized
    #[error("Candidate registry already initialized")]
    AlreadyInitialized,

    /// Candidate id outside `1..=candidates_count`
    #[error("Invalid candidate: {candidate_id} (valid range 1..={candidates_count})")]
    InvalidCandidate {
        candidate_id: CandidateId,
        candidates_count: u32,
    },

    /// Vote attempted outside the active phase
    #[error("Election not active (phase: {phase})")]
    NotActive { phase: Phase },

    /// Identity already has a vote recorded in this election
    #[error("Already voted: {identity}")]
    AlreadyVoted { identity: Identity },

    /// Identity has no verified voter record
    #[error("Voter not registered or not verified: {identity}")]
    NotRegistered { identity: Identity },

    /// Phase transition not allowed from the current phase
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    /// Identity already has a voter record
    #[error("Voter already registered: {identity}")]
    AlreadyRegistered { identity: Identity },

    /// No voter record for this identity
    #[error("Unknown voter: {identity}")]
    UnknownVoter { identity: Identity },

    /// Voter record already verified
    #[error("Voter already verified: {identity}")]
    AlreadyVerified { identity: Identity },

    /// Election handle outside the factory's range
    #[error("Unknown election: {index} (elections: {count})")]
    UnknownElection { index: usize, count: usize },

    /// Caller is not the admin of the component it tried to mutate
    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: Identity },

    /// Input validation errors
    #[error("Validation failed: {field}")]
    Validation { field: String },

    /// Restored state or event feed violates a ledger invariant
    #[error("Integrity violation: {message}")]
    Integrity { message: String },

    /// Environment configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Create a new integrity error
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenience macro for internal errors (lock poisoning and the like)
#[macro_export]
macro_rules! ledger_error {
    ($msg:expr) => {
        $crate::Error::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::internal(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! integrity_error {
    ($msg:expr) => {
        $crate::Error::integrity($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::integrity(format!($fmt, $($arg)*))
    };
}
