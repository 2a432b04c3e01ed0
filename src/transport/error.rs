//! Failure classification for remote calls.
//!
//! The service reports failures as `{detail?: string, error?: string}`.
//! Classification is a pure function over status and body so it can be
//! tested without a network.

use reqwest::StatusCode;

/// Hardcoded fallback when a response body yields no usable message.
const GENERIC_MESSAGE: &str = "Request failed";

/// A failed remote call, classified by kind.
///
/// Every kind except `AuthRejected` is recoverable: the caller can retry
/// the same action. `AuthRejected` means the transport has already run
/// its global side effect (credential cleared, UI sent to login) by the
/// time callers see the error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// 401 — the service rejected the credential.
    #[error("Authentication rejected")]
    AuthRejected,
    /// 415 — the service refused the content negotiation.
    #[error("Unsupported content type: {0}")]
    ContentType(String),
    /// 503 — the service, or its upstream extraction engine, is down.
    /// Carries the service's `error` field, which names upstream API-key
    /// problems when that is the cause.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    /// 404 — the referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The request deadline elapsed before a response arrived.
    #[error("Request timed out")]
    Timeout,
    /// No response received at all.
    #[error("Network error: {0}")]
    Network(String),
    /// Any other non-success response.
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },
}

impl ApiError {
    /// Map a reqwest transport failure (no HTTP response) to a kind.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }

    /// The service-provided message, when this kind carries one.
    pub fn body_message(&self) -> Option<&str> {
        let message = match self {
            Self::ContentType(m) | Self::ServiceUnavailable(m) | Self::NotFound(m) => m,
            Self::Service { message, .. } => message,
            _ => return None,
        };
        (!message.is_empty()).then_some(message.as_str())
    }

    /// Whether the failure points at the upstream extraction engine's
    /// API key (surfaced distinctly so an administrator can act on it).
    pub fn is_api_key_error(&self) -> bool {
        self.body_message()
            .is_some_and(|m| m.contains("API key") || m.contains("INVALID_ARGUMENT"))
    }
}

/// Classify a non-success response.
pub fn classify(status: StatusCode, body: &str) -> ApiError {
    match status.as_u16() {
        401 => ApiError::AuthRejected,
        404 => ApiError::NotFound(error_message(body)),
        415 => ApiError::ContentType(error_message(body)),
        // 503 carries its cause in the `error` field; keep it verbatim so
        // callers can inspect it for upstream API-key failures.
        503 => ApiError::ServiceUnavailable(
            body_field(body, "error")
                .or_else(|| body_field(body, "detail"))
                .unwrap_or_default(),
        ),
        s => ApiError::Service {
            status: s,
            message: error_message(body),
        },
    }
}

/// Ordered fallback chain for a response body: `detail`, then `error`,
/// then the stringified body, then a hardcoded fallback.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return error.to_string();
        }
        if !value.is_null() {
            // Structured but unrecognized (e.g. per-field validation
            // errors) — show it stringified rather than dropping it.
            return value.to_string();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    GENERIC_MESSAGE.to_string()
}

fn body_field(body: &str, field: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    value.get(field)?.as_str().map(str::to_string)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
