//! HTTP error response handling for the API
//!
//! Converts domain errors into HTTP responses with a JSON [`ApiError`] body.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Pairs an [`ApiError`] body with the status it should be sent with
pub(crate) fn api_error_response(status: StatusCode, error: ApiError) -> Response {
    (status, Json(error)).into_response()
}
