use crate::models::civic::StoreError;
use crate::models::pose::OracleError;
use crate::models::validation::ProtocolError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error surface of every HTTP handler
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Landmark models unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) | AppError::Protocol(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::Invalid(_)) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
