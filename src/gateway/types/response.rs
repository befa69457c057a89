//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Wrapper for service endpoints (health)
//! - `ApiError`: Structured error body with a stable code
//! - `error_codes`: Gateway-only error codes

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::LedgerError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Service endpoint response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes raised by the gateway itself (the ledger has its own, see `LedgerError::code`)
pub mod error_codes {
    pub const MALFORMED_PAYLOAD: &str = "MALFORMED_PAYLOAD";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable error identifier
    #[schema(example = "LIMIT_EXCEEDED")]
    pub code: String,
    /// Human-readable description
    #[schema(example = "Credit limit exceeded")]
    pub msg: String,
}

/// Handler error: HTTP status plus a stable code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub msg: String,
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Wrap a successful handler result
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(data))
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::MALFORMED_PAYLOAD, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    pub fn request_timeout() -> Self {
        Self::new(
            StatusCode::REQUEST_TIMEOUT,
            error_codes::REQUEST_TIMEOUT,
            "Request timed out",
        )
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Infrastructure details stay in the logs
        let msg = match &e {
            LedgerError::Database(_) => "Internal error".to_string(),
            LedgerError::Unavailable(_) => "Service unavailable".to_string(),
            _ => e.to_string(),
        };
        Self::new(status, e.code(), msg)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                error_codes::PAYLOAD_TOO_LARGE,
                "Request body too large",
            )
        } else {
            Self::bad_request(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                code: self.code.to_string(),
                msg: self.msg,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_mapping() {
        let err = ApiError::from(LedgerError::LimitExceeded);
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "LIMIT_EXCEEDED");

        let err = ApiError::from(LedgerError::AccountNotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = ApiError::from(LedgerError::Database("password=secret".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.msg.contains("secret"));
    }

    #[test]
    fn test_api_response_success() {
        let resp = ApiResponse::success(42);
        assert_eq!(resp.code, 0);
        assert_eq!(resp.data, Some(42));
    }

    #[test]
    fn test_api_response_error_omits_data() {
        let err = ApiResponse::<u64>::error(503, "unavailable");
        assert_eq!(err.code, 503);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!({"code": 503, "msg": "unavailable"}));
    }

    #[test]
    fn test_internal_and_timeout_errors() {
        let err = ApiError::internal("boom");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);

        let err = ApiError::request_timeout();
        assert_eq!(err.status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.code, error_codes::REQUEST_TIMEOUT);
    }
}
