//! Error types for clubhouse-auth — Railway Programming
//!
//! Collaborator seams and configuration return `Result<T, AuthSyncError>`.
//! The reactive session loop never propagates errors: every failure is
//! folded into a `none` session or a `none` role before it reaches state.

use thiserror::Error;

/// Closed classification of a Profile Directory lookup failure.
///
/// Decided by the directory adapter from whatever the backend reported
/// (status codes, PostgREST error codes, transport errors). The core only
/// ever matches on these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No profile row exists for the user. Not a failure for role resolution.
    #[error("Profile not found")]
    NotFound,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Network trouble, overloaded backend, timeouts below the core deadline.
    #[error("Transient lookup failure: {0}")]
    Transient(String),

    /// The backend answered, but not with something we can read as a profile.
    #[error("Malformed profile response: {0}")]
    Malformed(String),

    #[error("Unknown lookup failure: {0}")]
    Unknown(String),
}

impl LookupError {
    /// True for the "profile row absent" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Short stable label, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Transient(_) => "transient",
            Self::Malformed(_) => "malformed",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Unified error type for collaborator and configuration failures
#[derive(Error, Debug)]
pub enum AuthSyncError {
    // ─── Collaborator Errors ───

    #[error("Auth provider error: {0}")]
    Provider(String),

    #[error("Auth cleanup failed: {0}")]
    Cleanup(String),

    #[error("Profile lookup failed: {0}")]
    Lookup(#[from] LookupError),

    // ─── Infrastructure Errors ───

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),
}

#[cfg(feature = "postgrest")]
impl From<reqwest::Error> for AuthSyncError {
    fn from(err: reqwest::Error) -> Self {
        AuthSyncError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for AuthSyncError {
    fn from(err: serde_json::Error) -> Self {
        AuthSyncError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for AuthSyncError {
    fn from(err: url::ParseError) -> Self {
        AuthSyncError::Config(format!("URL parse error: {err}"))
    }
}

/// Result type alias for clubhouse-auth operations
pub type Result<T> = std::result::Result<T, AuthSyncError>;
