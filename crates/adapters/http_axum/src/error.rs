//! HTTP error response mapping.
//!
//! The v1 and v2 APIs report failures differently: v1 answers an unknown
//! light with `502 {}` and a bad body with `400 {"error": ...}`, while v2
//! wraps every failure in its `{errors, data}` envelope.

use axum::Json;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use huehub_domain::error::BridgeError;

/// JSON error body returned by v1 endpoints and the draining guard.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

/// Parse a request body as JSON.
pub(crate) fn parse_json(body: &Bytes) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Maps v1 failures to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    Domain(BridgeError),
    /// The request body is not valid JSON.
    MalformedBody(String),
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Domain(BridgeError::NotFound(err)) => {
                tracing::debug!(error = %err, "v1 lookup failed");
                (StatusCode::BAD_GATEWAY, Json(serde_json::json!({}))).into_response()
            }
            Self::Domain(BridgeError::Validation(err)) => {
                error_body(StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(BridgeError::Normalize(err)) => {
                error_body(StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(err @ BridgeError::HubLaunch { .. }) => {
                tracing::error!(error = %err, "internal error");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            Self::MalformedBody(reason) => error_body(StatusCode::BAD_REQUEST, reason),
        }
    }
}

fn error_body(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

/// One entry of the v2 `errors` array.
#[derive(Debug, Serialize)]
pub struct V2ErrorEntry {
    #[serde(rename = "type")]
    pub kind: u16,
    pub address: String,
    pub description: String,
}

/// The v2 response envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub errors: Vec<V2ErrorEntry>,
    pub data: Vec<T>,
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn data(data: Vec<T>) -> Self {
        Self {
            errors: Vec::new(),
            data,
        }
    }
}

/// Hue v2 error types.
pub mod v2_type {
    pub const INVALID_BODY: u16 = 2;
    pub const NOT_AVAILABLE: u16 = 3;
    pub const INTERNAL: u16 = 901;
}

/// Maps v2 failures to an enveloped HTTP response.
#[derive(Debug)]
pub struct V2Error {
    pub kind: u16,
    pub address: String,
    pub description: String,
}

impl V2Error {
    #[must_use]
    pub fn not_available(address: impl Into<String>) -> Self {
        Self {
            kind: v2_type::NOT_AVAILABLE,
            address: address.into(),
            description: "resource, not available".to_string(),
        }
    }

    #[must_use]
    pub fn invalid_body(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: v2_type::INVALID_BODY,
            address: address.into(),
            description: reason.into(),
        }
    }

    /// Map a domain error raised while serving `address`.
    #[must_use]
    pub fn from_domain(address: impl Into<String>, err: &BridgeError) -> Self {
        match err {
            BridgeError::NotFound(_) => Self::not_available(address),
            BridgeError::Validation(_) | BridgeError::Normalize(_) => {
                Self::invalid_body(address, err.to_string())
            }
            BridgeError::HubLaunch { .. } => {
                tracing::error!(error = %err, "internal error");
                Self {
                    kind: v2_type::INTERNAL,
                    address: address.into(),
                    description: "internal error".to_string(),
                }
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind {
            v2_type::NOT_AVAILABLE => StatusCode::NOT_FOUND,
            v2_type::INTERNAL => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for V2Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let envelope: Envelope<Value> = Envelope {
            errors: vec![V2ErrorEntry {
                kind: self.kind,
                address: self.address,
                description: self.description,
            }],
            data: Vec::new(),
        };
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huehub_domain::error::{NotFoundError, ValidationError};

    #[test]
    fn should_map_v1_not_found_to_bad_gateway() {
        let err = ApiError::from(BridgeError::from(NotFoundError {
            entity: "Device",
            id: "x".to_string(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn should_map_v1_malformed_body_to_bad_request() {
        let err = ApiError::MalformedBody("expected value".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_v2_not_available_to_not_found() {
        let err = V2Error::not_available("/resource/light/x");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_map_other_v2_errors_to_bad_request() {
        let err = V2Error::from_domain(
            "/resource/light/x",
            &BridgeError::from(ValidationError::EmptyName),
        );
        assert_eq!(err.kind, v2_type::INVALID_BODY);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
