use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::DbError;
use crate::geocode_error::GeocodeError;
use crate::services::report_service::ReportError;

/// JSON body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        // Details stay in the server log
        tracing::error!("{}", err);
        ApiError::Internal("Database error".to_string())
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::MissingPhoto
            | ReportError::MissingField { .. }
            | ReportError::InvalidField { .. }
            | ReportError::UnknownOption(_) => ApiError::BadRequest(err.to_string()),
            ReportError::PhotoStorage(_) => {
                ApiError::Internal("Error processing image or saving report".to_string())
            }
            ReportError::Database(_) => {
                ApiError::Internal("DB error while saving report".to_string())
            }
        }
    }
}

impl From<GeocodeError> for ApiError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::MissingCredentials => ApiError::Internal(err.to_string()),
            GeocodeError::Upstream { status } => ApiError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message: "Failed to fetch data from Naver API.".to_string(),
            },
            GeocodeError::Request(_) | GeocodeError::Parse(_) => {
                ApiError::Internal("Failed to fetch data from Naver API.".to_string())
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("Uploaded file is too large.".to_string())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_errors_map_to_client_errors() {
        assert_eq!(
            ApiError::from(ReportError::MissingPhoto).status(),
            StatusCode::BAD_REQUEST
        );
        let err = ApiError::from(ReportError::MissingField { field: "phoneNumber" });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "phoneNumber is required.");
    }

    #[test]
    fn test_geocode_errors_keep_upstream_status() {
        let err = ApiError::from(GeocodeError::Upstream { status: 401 });
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = ApiError::from(GeocodeError::MissingCredentials);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("credentials are not configured"));
    }
}
