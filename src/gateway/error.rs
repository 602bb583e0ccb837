use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    Validation,
    NotImplemented,
    RateLimited,
    Unconfigured,
    AuthFailure,
    QuotaExceeded,
    Timeout,
    Unknown,
}

/// Client-facing request failure. The message is always a fixed generic
/// string; raw backend error text never travels through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub http_status: u16,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, http_status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status,
            message: message.into(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

impl std::error::Error for GatewayError {}

pub fn validation(message: impl Into<String>) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Validation, 400, message)
}

pub fn not_implemented(action: &str) -> GatewayError {
    GatewayError::new(
        GatewayErrorKind::NotImplemented,
        400,
        format!("Action not implemented: {action}"),
    )
}

pub fn rate_limited() -> GatewayError {
    GatewayError::new(
        GatewayErrorKind::RateLimited,
        429,
        "Rate limit exceeded. Please try again later.",
    )
}

pub fn unconfigured() -> GatewayError {
    GatewayError::new(
        GatewayErrorKind::Unconfigured,
        500,
        "AI service not configured. Please contact support.",
    )
}
