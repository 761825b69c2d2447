use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

const BAD_REQUEST_PAGE: &str = include_str!("../../templates/400.html");
const NOT_FOUND_PAGE: &str = include_str!("../../templates/404.html");
const SERVER_ERROR_PAGE: &str = include_str!("../../templates/500.html");

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn database(err: anyhow::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(err: handlebars::RenderError) -> Self {
        AppError::TemplateError(err.to_string())
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    AppError::NotFound("no route".to_string()).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, page) = match self {
            AppError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, NOT_FOUND_PAGE)
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, BAD_REQUEST_PAGE)
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_PAGE)
            }
            AppError::TemplateError(msg) => {
                tracing::error!("Template error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_PAGE)
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_PAGE)
            }
        };

        (status, Html(page)).into_response()
    }
}
