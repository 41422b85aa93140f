use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
            }
        }

        // Report pages are HTML all the way down; so are their failures.
        // The SQL terminal bypasses this and returns the raw driver error.
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<html><body><h1>500 Internal Server Error</h1></body></html>".to_string()),
        )
            .into_response()
    }
}
