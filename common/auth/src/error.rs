use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is structurally invalid")]
    MalformedToken,
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("invalid token configuration: {0}")]
    InvalidConfig(&'static str),
}

impl AuthError {
    /// Short label for logs and metrics. Never sent to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::MissingAuthorization => "missing_authorization",
            AuthError::InvalidAuthorization => "invalid_authorization",
            AuthError::InvalidClaim(_, _) => "invalid_claim",
            AuthError::InvalidConfig(_) => "invalid_config",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Token failures share one body; the specific reason only goes to logs.
        let (status, code, message) = match &self {
            AuthError::MissingAuthorization => (
                StatusCode::UNAUTHORIZED,
                "AUTH_HEADER",
                "authorization header missing",
            ),
            AuthError::InvalidAuthorization => (
                StatusCode::UNAUTHORIZED,
                "AUTH_HEADER",
                "authorization header malformed",
            ),
            AuthError::MalformedToken | AuthError::InvalidSignature | AuthError::Expired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN",
                "invalid or expired token",
            ),
            AuthError::InvalidClaim(_, _) | AuthError::InvalidConfig(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL",
                "authentication is misconfigured",
            ),
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
