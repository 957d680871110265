use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;

use crate::policy::DenyReason;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    #[error("forbidden - insufficient role")]
    InsufficientRole,
    #[error("forbidden - caller does not own the resource")]
    NotOwner,
}

impl From<DenyReason> for SecurityError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::InsufficientRole => SecurityError::InsufficientRole,
            DenyReason::NotOwner => SecurityError::NotOwner,
        }
    }
}

impl From<SecurityError> for ApiError {
    fn from(_: SecurityError) -> Self {
        ApiError::Forbidden { trace_id: None }
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
