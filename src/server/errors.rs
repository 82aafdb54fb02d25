use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Every failure the API reports. Each maps to one fixed JSON body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest,
    NotFound,
    MethodNotAllowed,
    Unprocessable,
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    status_code: u16,
    message: &'static str,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest => "bad request",
            ApiError::NotFound => "resource not found",
            ApiError::MethodNotAllowed => "method not allowed",
            ApiError::Unprocessable => "unprocessable",
            ApiError::Internal(_) => "unprocessed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(error) = &self {
            tracing::error!("Request failed: {error:#}");
        }
        let status = self.status();
        let body = ErrorBody {
            success: false,
            status_code: status.as_u16(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::Internal(error)
    }
}

/// Used by the panic-catching layer so a crashed handler still answers with the error envelope.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
