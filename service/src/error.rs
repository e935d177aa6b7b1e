use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use redpacket_client::{ClientError, ErrorKind};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("{0} not found")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::Client(err) => {
                let status = match err.kind() {
                    ErrorKind::Validation | ErrorKind::UserRejected => StatusCode::BAD_REQUEST,
                    ErrorKind::NotConnected => StatusCode::CONFLICT,
                    ErrorKind::GasOrRevert | ErrorKind::Read => StatusCode::BAD_GATEWAY,
                };
                (status, json!(err.kind()))
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, json!("not_found")),
        };
        let body = Json(json!({ "error": error, "message": self.to_string() }));
        (status, body).into_response()
    }
}
