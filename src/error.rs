//! Error taxonomy for registration and matching.
//!
//! Registration errors fail the corresponding `add`/`build` call outright.
//! Match errors are a distinct outcome from "no route matched": callers can
//! tell a 404 condition from a 400/500 one by matching on [`MatchError`]
//! instead of treating every non-match the same way.

use thiserror::Error;

/// Errors raised while registering routes or building the router.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("duplicate route: {method} {pattern}")]
    DuplicateRoute { method: String, pattern: String },

    #[error("unsafe regex in pattern `{pattern}`: {reason}")]
    UnsafeRegex { pattern: String, reason: String },

    #[error("reserved parameter name `{name}` in pattern `{pattern}`")]
    ReservedParamName { name: String, pattern: String },

    #[error("pattern `{pattern}` would exceed the maximum of {max} parameters")]
    TooManyParams { pattern: String, max: usize },

    #[error("invalid option `{option}`: {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("malformed pattern `{pattern}`: {reason}")]
    MalformedPattern { pattern: String, reason: String },
}

/// Errors raised while matching a request path against a built router.
///
/// Distinct from a "no route" result ([`crate::router::RouteOutcome::NotFound`],
/// still an `Ok` from [`crate::router::Router::match_request`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("malformed percent-encoding in path segment")]
    BadEncoding,

    #[error("encoded slash (%2F) rejected by configuration")]
    EncodedSlashRejected,

    #[error("pattern `{pattern}` exceeded the {duration_ms}ms execution bound")]
    RegexTimeout { pattern: String, duration_ms: u64 },

    #[error("path segment exceeds the configured maximum length")]
    SegmentTooLong,

    #[error("internal router fault: {0}")]
    InternalFault(String),
}

/// A minimal, un-typed error carrier for hosts that would rather not match on
/// [`RegistrationError`]/[`MatchError`] variants -- the "plain `Result`/`Err`
/// value carrier" external collaborator named by the router's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HostError {}

impl From<RegistrationError> for HostError {
    fn from(err: RegistrationError) -> Self {
        HostError::new(err.to_string())
    }
}

impl From<MatchError> for HostError {
    fn from(err: MatchError) -> Self {
        HostError::new(err.to_string())
    }
}

/// Convenience alias used by the host-facing boundary.
pub type RouterResult<T> = Result<T, HostError>;
