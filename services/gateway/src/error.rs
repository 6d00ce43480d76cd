use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use platform::{ErrorKind, PlatformError};
use quant::QuantError;
use serde::Serialize;
use thiserror::Error;

/// Central error type for the Gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("{message}")]
    Unprocessable { code: &'static str, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    code: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized {
            code: "UNAUTHORIZED",
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden {
            code: "FORBIDDEN",
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized { code, .. } => (StatusCode::UNAUTHORIZED, *code),
            AppError::Forbidden { code, .. } => (StatusCode::FORBIDDEN, *code),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict { code, .. } => (StatusCode::CONFLICT, *code),
            AppError::Unprocessable { code, .. } => (StatusCode::UNPROCESSABLE_ENTITY, *code),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            AppError::InsufficientFunds(_) => (StatusCode::BAD_REQUEST, "INSUFFICIENT_FUNDS"),
            AppError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl AppError {
    /// Transient failures are not worth remembering for idempotent replays
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Internal(_) | AppError::ServiceUnavailable(_))
    }

    fn body(&self) -> ErrorBody {
        let (_, code) = self.status_and_code();
        let message = match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            success: false,
            error: ErrorDetail { message, code },
        }
    }

    /// The error envelope as a JSON value
    pub fn to_value(&self) -> serde_json::Value {
        let body = self.body();
        serde_json::json!({
            "success": body.success,
            "error": { "message": body.error.message, "code": body.error.code },
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();

        match &self {
            AppError::Internal(err) => tracing::error!(error = ?err, "internal error"),
            AppError::ServiceUnavailable(detail) => tracing::warn!(detail = %detail, "upstream unavailable"),
            _ => {}
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<PlatformError> for AppError {
    fn from(err: PlatformError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => match err {
                PlatformError::NotFound(what) => AppError::NotFound(what),
                _ => AppError::NotFound(message),
            },
            ErrorKind::Conflict => AppError::Conflict { code, message },
            ErrorKind::Validation => AppError::Validation(message),
            ErrorKind::Unprocessable => AppError::Unprocessable { code, message },
            ErrorKind::Forbidden => AppError::Forbidden { code, message },
            ErrorKind::InsufficientFunds => AppError::InsufficientFunds(message),
            ErrorKind::Unavailable => AppError::ServiceUnavailable(message),
            ErrorKind::Internal => AppError::Internal(anyhow::anyhow!(message)),
        }
    }
}

impl From<QuantError> for AppError {
    fn from(err: QuantError) -> Self {
        match err {
            QuantError::NoConvergence(_) => AppError::Unprocessable {
                code: "NO_CONVERGENCE",
                message: err.to_string(),
            },
            QuantError::InvalidInput { .. } | QuantError::DimensionMismatch(_) => AppError::Validation(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_error_does_not_leak() {
        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("db password=hunter2"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_value_matches_response_body() {
        let err = AppError::Conflict {
            code: "TENANT_MISMATCH",
            message: "user is not in tenant acme".into(),
        };
        let stored = err.to_value();
        let (_, body) = body_json(err).await;
        assert_eq!(stored, body);
    }

    #[tokio::test]
    async fn test_platform_conflict_keeps_code() {
        let err: AppError = PlatformError::conflict("SLIPPAGE_EXCEEDED", "output below minimum").into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "SLIPPAGE_EXCEEDED");
        assert_eq!(body["error"]["message"], "output below minimum");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PlatformError::not_found("order x"), StatusCode::NOT_FOUND),
            (PlatformError::validation("bad"), StatusCode::BAD_REQUEST),
            (PlatformError::InsufficientFunds("margin".into()), StatusCode::BAD_REQUEST),
            (PlatformError::unprocessable("INVALID_SIGNATURE", "bad sig"), StatusCode::UNPROCESSABLE_ENTITY),
            (PlatformError::forbidden("KYC_REQUIRED", "level 2"), StatusCode::FORBIDDEN),
            (PlatformError::Unavailable("graphsense".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn test_quant_errors() {
        let err = AppError::from(QuantError::NoConvergence("implied volatility"));
        assert_eq!(err.status_and_code(), (StatusCode::UNPROCESSABLE_ENTITY, "NO_CONVERGENCE"));
        let err = AppError::from(QuantError::DimensionMismatch("weights".into()));
        assert_eq!(err.status_and_code().1, "VALIDATION_ERROR");
    }
}
