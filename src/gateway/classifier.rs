use crate::gateway::{
    backend::BackendCallError,
    error::{GatewayError, GatewayErrorKind},
};

pub const AUTH_FAILURE_MESSAGE: &str = "AI service authentication failed";
pub const QUOTA_EXCEEDED_MESSAGE: &str = "AI service quota exceeded. Please try again later.";
pub const TIMEOUT_MESSAGE: &str = "AI service request timed out. Please try again.";
pub const UNKNOWN_FAILURE_MESSAGE: &str = "Failed to process AI request.";

/// Maps a backend failure onto the stable client-facing taxonomy. The raw
/// error text is inspected here and then discarded; only the fixed generic
/// message reaches the caller. Rules are evaluated in order: timeout
/// (structural), authentication substrings, quota substrings, unknown.
pub fn classify(err: &BackendCallError) -> GatewayError {
    if matches!(err, BackendCallError::Timeout(_)) {
        return GatewayError::new(GatewayErrorKind::Timeout, 504, TIMEOUT_MESSAGE);
    }

    let detail = err.to_string();
    if detail.contains("API key") || detail.contains("API_KEY") {
        GatewayError::new(GatewayErrorKind::AuthFailure, 500, AUTH_FAILURE_MESSAGE)
    } else if detail.contains("RESOURCE_EXHAUSTED") || detail.contains("quota") {
        GatewayError::new(GatewayErrorKind::QuotaExceeded, 429, QUOTA_EXCEEDED_MESSAGE)
    } else {
        GatewayError::new(GatewayErrorKind::Unknown, 500, UNKNOWN_FAILURE_MESSAGE)
    }
}
