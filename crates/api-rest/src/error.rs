//! Mapping core errors onto HTTP responses.

use api_shared::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use klinik_core::ClinicError;

/// A status code plus the message returned in an [`ErrorRes`] body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        let status = match &err {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            ClinicError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClinicError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ClinicError::SequenceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!("Request failed: {:?}", err);
            }
            _ => tracing::debug!("Request rejected: {}", err),
        }

        // Partial writes keep their full message; storage internals do not.
        let message = match &err {
            ClinicError::PartialRegistration { .. } | ClinicError::PartialReorder { .. } => {
                err.to_string()
            }
            ClinicError::Database(_)
            | ClinicError::Serialization(_)
            | ClinicError::Deserialization(_)
            | ClinicError::InvalidTimestamp(_)
            | ClinicError::FileRead(_)
            | ClinicError::FileWrite(_)
            | ClinicError::YamlSerialization(_)
            | ClinicError::YamlDeserialization(_)
            | ClinicError::LockPoisoned => "Internal error".to_string(),
            _ => err.to_string(),
        };

        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorRes {
                message: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
