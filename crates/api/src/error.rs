//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use services::{ErrorKind, ServiceError};

/// Body returned in place of internal error detail in production.
pub const REDACTED_MESSAGE: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body, identifier or query string.
    BadRequest(String),
    /// Missing or invalid bearer token.
    Unauthenticated(String),
    /// Service-layer failure.
    Service(ServiceError),
}

impl ApiError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            ApiError::Service(err) => err.kind(),
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        status_for(self.kind())
    }
}

/// Maps an error kind to its HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock | ErrorKind::EmptyOrder | ErrorKind::Validation => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        metrics::counter!("http_errors_total", "kind" => kind.as_str()).increment(1);

        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Unauthenticated(msg) => msg,
            ApiError::Service(err) => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "internal server error");
                }
                err.to_string()
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use domain::{CartError, OrderError};

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ErrorKind::NotFound, StatusCode::NOT_FOUND),
            (ErrorKind::InsufficientStock, StatusCode::BAD_REQUEST),
            (ErrorKind::EmptyOrder, StatusCode::BAD_REQUEST),
            (ErrorKind::Validation, StatusCode::BAD_REQUEST),
            (ErrorKind::Unauthorized, StatusCode::FORBIDDEN),
            (ErrorKind::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ErrorKind::Conflict, StatusCode::CONFLICT),
            (ErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (kind, status) in cases {
            assert_eq!(status_for(kind), status, "{kind:?}");
        }
    }

    #[test]
    fn test_domain_errors_map_through_kind() {
        let empty: ApiError = ServiceError::from(OrderError::NoItems).into();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let zero: ApiError = ServiceError::from(CartError::InvalidQuantity { quantity: 0 }).into();
        assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = ServiceError::not_found("Order", "abc").into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
