use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eyre::Report;
use serde_json::json;

/// Error returned by request handlers.
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(Report),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Report> for ApiError {
    #[inline]
    fn from(err: Report) -> Self {
        Self::Internal(err)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let msg = match self {
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Unavailable(msg) => msg,
            Self::Internal(err) => {
                error!("{:?}", err.wrap_err("Failed to handle request"));

                "internal server error".to_owned()
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}
