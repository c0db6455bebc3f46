//! Shared HTTP status constants.
//!
//! The router itself never emits an HTTP response, but it classifies its own
//! outcomes (no-route, bad-encoding, timeout, internal fault) the same way a
//! host would map them onto status codes, so that mapping lives in one place
//! rather than being re-invented per embedding.

use http::StatusCode;

use crate::error::MatchError;

/// The status a host would typically return for a given match outcome. Not
/// prescriptive -- a host is free to map differently -- but a sane default
/// that keeps "no route" (404) distinct from malformed input (400) and
/// internal faults (500), per `spec.md` §7's "caller can distinguish a 404
/// from a 400/500 condition".
#[must_use]
pub fn suggested_status_for_no_match() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[must_use]
pub fn suggested_status_for_match_error(err: &MatchError) -> StatusCode {
    match err {
        MatchError::BadEncoding
        | MatchError::EncodedSlashRejected
        | MatchError::SegmentTooLong => StatusCode::BAD_REQUEST,
        MatchError::RegexTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        MatchError::InternalFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_encoding_maps_to_400() {
        assert_eq!(
            suggested_status_for_match_error(&MatchError::BadEncoding),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn timeout_maps_to_504() {
        let err = MatchError::RegexTimeout {
            pattern: "x".into(),
            duration_ms: 5,
        };
        assert_eq!(
            suggested_status_for_match_error(&err),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
