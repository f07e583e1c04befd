//! Typed errors for remote services

use serde::Deserialize;
use ureq::http::Response;
use ureq::{Agent, Body};

/// Error reasons Google uses for quota exhaustion on a 403
const RATE_LIMIT_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "RATE_LIMIT_EXCEEDED",
];

/// A remote HTTP API answered with a non-success status
#[derive(Debug, thiserror::Error)]
#[error("{service} request failed with HTTP {status}")]
pub struct ApiError {
    pub service: &'static str,
    pub status: u16,
    /// Machine-readable reason from the error body, when there is one
    pub reason: Option<String>,
}

impl ApiError {
    /// 429, or 403 with a rate-limit reason
    ///
    /// Gmail also answers 403 for missing scopes and revoked access, which
    /// are not rate limits.
    pub fn is_rate_limited(&self) -> bool {
        match self.status {
            429 => true,
            403 => self
                .reason
                .as_deref()
                .is_some_and(|r| RATE_LIMIT_REASONS.contains(&r)),
            _ => false,
        }
    }
}

/// Google JSON error envelope: `{"error": {"errors": [{"reason": ..}], "details": [..]}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorItem>,
    #[serde(default)]
    details: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    reason: Option<String>,
}

/// First reason in a Google error body
fn error_reason(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope
        .error
        .errors
        .into_iter()
        .chain(envelope.error.details)
        .find_map(|item| item.reason)
}

/// HTTP agent that hands error responses back so their body can be read
pub(crate) fn http_agent() -> Agent {
    Agent::new_with_config(Agent::config_builder().http_status_as_error(false).build())
}

/// Convert a ureq result into an anyhow result, keeping HTTP statuses typed
pub(crate) fn check_status(
    result: Result<Response<Body>, ureq::Error>,
    service: &'static str,
) -> anyhow::Result<Response<Body>> {
    match result {
        Ok(mut response)
            if response.status().is_client_error() || response.status().is_server_error() =>
        {
            let status = response.status().as_u16();
            let body = response.body_mut().read_to_string().unwrap_or_default();
            Err(ApiError {
                service,
                status,
                reason: error_reason(&body),
            }
            .into())
        }
        Ok(response) => Ok(response),
        Err(ureq::Error::StatusCode(status)) => Err(ApiError {
            service,
            status,
            reason: None,
        }
        .into()),
        Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to reach {}", service))),
    }
}
