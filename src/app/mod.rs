use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::completion::CompletionClient;
use crate::error::LibraryError;
use crate::ingest::UploadIntake;
use crate::library::Library;

pub mod handlers;
pub mod view;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub library: Library,
    pub completion: Arc<CompletionClient>,
    pub uploads: UploadIntake,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/", get(handlers::library_page))
        .route("/api/books", get(handlers::list_books))
        .route(
            "/api/books/:book_id/chapters/:chapter_index",
            get(handlers::chapter_json),
        )
        .route("/read/:book_id", get(handlers::read_first_chapter))
        .route("/read/:book_id/:chapter_index", get(handlers::read_chapter))
        .route("/read/:book_id/images/:image_name", get(handlers::serve_image))
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl LibraryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LibraryError::BookNotFound(_)
            | LibraryError::ChapterOutOfRange { .. }
            | LibraryError::AssetNotFound(_) => StatusCode::NOT_FOUND,
            LibraryError::InvalidUpload(_) | LibraryError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            LibraryError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            LibraryError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            LibraryError::IngestionFailure(_) | LibraryError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LibraryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(%status, err = ?self, "request failed");
        } else {
            tracing::debug!(%status, err = %self, "request rejected");
        }

        let mut body = serde_json::json!({ "error": format!("{self:#}") });
        if let LibraryError::Upstream {
            details: Some(details),
            ..
        } = self
        {
            body["details"] = details;
        }
        (status, Json(body)).into_response()
    }
}
