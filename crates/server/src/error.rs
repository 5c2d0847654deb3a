use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use chess_core::ChessError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Chess(#[from] ChessError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Chess(e) => {
                tracing::debug!("Rejected position: {e}");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
        };

        // {"detail": "message"}, the shape the page reads on non-2xx
        (status, Json(json!({ "detail": message }))).into_response()
    }
}
