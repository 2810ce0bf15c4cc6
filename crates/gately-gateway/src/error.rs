use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gately_service::MappingError;
use thiserror::Error;
use tracing::warn;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("request deadline exceeded")]
    Timeout,
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Mapping(error) => match error {
                MappingError::InvalidInput(_) | MappingError::AlreadyExists(_) => {
                    StatusCode::BAD_REQUEST
                }
                MappingError::NotFound(_) => StatusCode::NOT_FOUND,
                MappingError::StoreWriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
                MappingError::StoreReadFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gately_core::StorageError;

    #[test]
    fn mapping_errors_map_to_statuses() {
        let down = || StorageError::Unavailable("down".to_string());
        let cases = [
            (MappingError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (MappingError::AlreadyExists("x".into()), StatusCode::BAD_REQUEST),
            (MappingError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                MappingError::StoreWriteFailed(down()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                MappingError::StoreReadFailed(down()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status(), expected);
        }
    }

    #[test]
    fn timeout_is_gateway_timeout() {
        assert_eq!(AppError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
