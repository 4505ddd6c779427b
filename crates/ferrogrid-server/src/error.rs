use crate::controller::ControlError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ferrogrid_core::FerroError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        if let Some(c) = self.0.downcast_ref::<ControlError>() {
            return match c {
                ControlError::Halted => StatusCode::SERVICE_UNAVAILABLE,
                ControlError::Rejected(e) => ferro_status(e),
            };
        }
        match self.0.downcast_ref::<FerroError>() {
            Some(e) => ferro_status(e),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn ferro_status(e: &FerroError) -> StatusCode {
    match e {
        FerroError::Addressing { .. } => StatusCode::NOT_FOUND,
        FerroError::Decode(_) => StatusCode::BAD_REQUEST,
        FerroError::InvalidConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FerroError::DriveFault { .. }
        | FerroError::Io(_)
        | FerroError::Yaml(_)
        | FerroError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
