use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized { code: &'static str, message: Option<String> },
    Forbidden { trace_id: Option<Uuid> },
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    Conflict { code: &'static str, message: Option<String> },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E, trace_id: Option<Uuid>) -> Self { Self::Internal { trace_id, message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::BadRequest { code, trace_id, message: None } }
    pub fn bad_request_msg(code: &'static str, message: impl Into<String>) -> Self { Self::BadRequest { code, trace_id: None, message: Some(message.into()) } }
    pub fn not_found(code: &'static str) -> Self { Self::NotFound { code, trace_id: None } }
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self { Self::Conflict { code, message: Some(message.into()) } }
    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self { Self::Unauthorized { code, message: Some(message.into()) } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (body, error_code) = match self {
            ApiError::Unauthorized { code, message } => (
                ErrorBody { code: code.into(), trace_id: None, message },
                code
            ),
            ApiError::Forbidden { trace_id } => (
                ErrorBody { code: "forbidden".into(), trace_id, message: None },
                "forbidden"
            ),
            ApiError::BadRequest { code, trace_id, message } => (
                ErrorBody { code: code.into(), trace_id, message },
                code
            ),
            ApiError::NotFound { code, trace_id } => (
                ErrorBody { code: code.into(), trace_id, message: None },
                code
            ),
            ApiError::Conflict { code, message } => (
                ErrorBody { code: code.into(), trace_id: None, message },
                code
            ),
            ApiError::Internal { trace_id, message } => (
                ErrorBody { code: "internal_error".into(), trace_id, message },
                "internal_error"
            ),
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
