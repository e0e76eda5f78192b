use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use warbler_db::DbError;

const NOT_FOUND_PAGE: &str = "<!DOCTYPE html><html><head><title>Warbler</title></head>\
<body><h1>404</h1><p>Sorry, we couldn't find that page.</p><a href=\"/\">Go home</a></body></html>";

const INTERNAL_ERROR_PAGE: &str = "<!DOCTYPE html><html><head><title>Warbler</title></head>\
<body><h1>500</h1><p>Something went wrong.</p><a href=\"/\">Go home</a></body></html>";

/// Failures a handler cannot turn into a redirect.
///
/// Authorization problems never land here; they redirect with a flash.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("spawn_blocking join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response(),
            other => {
                error!("Internal error: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(INTERNAL_ERROR_PAGE)).into_response()
            }
        }
    }
}
