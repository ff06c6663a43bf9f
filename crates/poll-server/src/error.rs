use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::PollError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Invalid action")]
    InvalidAction,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    MethodNotAllowed(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Poll(PollError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Poll(PollError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::InvalidAction | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
