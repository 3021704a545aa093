//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ipam_alloc_core::{AllocationError, ErrorClass};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// One map of field errors per submitted item
    #[error("Invalid request body")]
    Validation(Vec<Map<String, Value>>),

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Allocation(err) => match err.class() {
                ErrorClass::BadRequest => StatusCode::BAD_REQUEST,
                ErrorClass::NotFound => StatusCode::NOT_FOUND,
                ErrorClass::Conflict => StatusCode::CONFLICT,
                ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::debug!("Request rejected with {}: {}", status, self);
        }

        match self {
            ApiError::Validation(items) => (status, Json(items)).into_response(),
            other => (
                status,
                Json(ErrorResponse {
                    detail: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
