//! HTTP mapping for `SseCastError` (non-stream responses).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use ssecast_core::error::SseCastError;

/// Error returned from HTTP handlers.
#[derive(Debug)]
pub struct ApiError(pub SseCastError);

impl From<SseCastError> for ApiError {
    fn from(e: SseCastError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SseCastError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SseCastError::Conflict(_) => StatusCode::CONFLICT,
            SseCastError::BrokerClosed => StatusCode::SERVICE_UNAVAILABLE,
            SseCastError::StreamingUnsupported
            | SseCastError::UnsupportedVersion
            | SseCastError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
