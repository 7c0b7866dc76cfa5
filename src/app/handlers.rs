use axum::body::Body;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{Html, Json, Response};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::app::{AppState, view};
use crate::error::LibraryError;
use crate::formats::{BookSummary, ChapterContent};
use crate::{ingest, store};

pub async fn library_page(State(state): State<AppState>) -> Result<Html<String>, LibraryError> {
    let books = state.library.list_books().await?;
    Ok(Html(view::render_library(&books)))
}

pub async fn list_books(
    State(state): State<AppState>,
) -> Result<Json<Vec<BookSummary>>, LibraryError> {
    Ok(Json(state.library.list_books().await?))
}

fn path_params<T>(params: Result<Path<T>, PathRejection>) -> Result<T, LibraryError> {
    params
        .map(|Path(params)| params)
        .map_err(|rej| LibraryError::InvalidRequest(rej.body_text()))
}

pub async fn read_first_chapter(
    State(state): State<AppState>,
    params: Result<Path<String>, PathRejection>,
) -> Result<Html<String>, LibraryError> {
    let book_id = path_params(params)?;
    let reading = state.library.read_chapter(&book_id, None).await?;
    Ok(Html(view::render_reader(&reading)))
}

pub async fn read_chapter(
    State(state): State<AppState>,
    params: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Html<String>, LibraryError> {
    let (book_id, chapter_index) = path_params(params)?;
    let reading = state
        .library
        .read_chapter(&book_id, Some(chapter_index))
        .await?;
    Ok(Html(view::render_reader(&reading)))
}

#[derive(Debug, Serialize)]
pub struct ChapterPayload {
    pub book_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub chapter_index: usize,
    pub chapter_count: usize,
    pub prev_idx: Option<usize>,
    pub next_idx: Option<usize>,
    pub chapter: ChapterContent,
}

pub async fn chapter_json(
    State(state): State<AppState>,
    params: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Json<ChapterPayload>, LibraryError> {
    let (book_id, chapter_index) = path_params(params)?;
    let reading = state
        .library
        .read_chapter(&book_id, Some(chapter_index))
        .await?;
    let view = reading.view();

    Ok(Json(ChapterPayload {
        book_id: reading.book_id.clone(),
        title: reading.book.metadata.title.clone(),
        authors: reading.book.metadata.authors.clone(),
        chapter_index: view.chapter_index,
        chapter_count: reading.book.chapter_count(),
        prev_idx: view.prev_index,
        next_idx: view.next_index,
        chapter: view.chapter.clone(),
    }))
}

pub async fn serve_image(
    State(state): State<AppState>,
    params: Result<Path<(String, String)>, PathRejection>,
) -> Result<Response, LibraryError> {
    let (book_id, image_name) = path_params(params)?;
    let path = state.library.asset_path(&book_id, &image_name)?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| LibraryError::AssetNotFound(format!("{book_id}/{image_name}")))?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut resp = Response::new(body);
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(store::content_type_for(&path)),
    );
    Ok(resp)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// A missing key is reported before the body is looked at.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, LibraryError> {
    state.completion.require_api_key()?;
    let Json(req) = body.map_err(|rej| LibraryError::InvalidRequest(rej.body_text()))?;
    let response = state
        .completion
        .complete(req.model.as_deref(), &req.messages)
        .await?;
    Ok(Json(ChatResponse { response }))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub title: String,
    pub id: String,
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, LibraryError> {
    let invalid = |err: axum::extract::multipart::MultipartError| {
        LibraryError::InvalidUpload(err.body_text())
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| LibraryError::InvalidUpload("file field has no file name".to_owned()))?;
        ingest::upload_base_name(&file_name)?;
        let bytes = field.bytes().await.map_err(invalid)?;

        tracing::info!(file_name = %file_name, bytes = bytes.len(), "upload received");
        let ingested = state.uploads.ingest(&file_name, Vec::from(bytes)).await?;
        return Ok(Json(UploadResponse {
            success: true,
            title: ingested.title,
            id: ingested.id,
        }));
    }

    Err(LibraryError::InvalidUpload(
        "missing multipart field `file`".to_owned(),
    ))
}
