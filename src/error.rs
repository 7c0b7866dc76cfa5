use thiserror::Error;

/// Errors surfaced at the library's request boundary.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("book not found: {0}")]
    BookNotFound(String),

    #[error("chapter {index} is out of range (book has {len} chapters)")]
    ChapterOutOfRange { index: i64, len: usize },

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("not configured: {0}")]
    Configuration(String),

    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("ingestion failed: {0}")]
    IngestionFailure(String),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Failures while decoding a persisted `book.json`.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("read artifact")]
    Io(#[from] std::io::Error),

    #[error("parse artifact")]
    Parse(#[source] serde_json::Error),

    #[error("unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}
