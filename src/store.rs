use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio::fs;

use crate::error::{ArtifactError, LibraryError};
use crate::formats::{
    ARTIFACT_FILE_NAME, BOOK_FOLDER_SUFFIX, Book, BookArtifact, IMAGES_DIR_NAME,
};

/// Reduces untrusted input to its final path component.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// remains (`""`, `"."`, `".."`, or a trailing separator).
pub fn sanitize_component(raw: &str) -> Option<&str> {
    let last = raw.rsplit(['/', '\\']).next()?;
    match last {
        "" | "." | ".." => None,
        name if name.contains('\0') => None,
        name => Some(name),
    }
}

pub fn book_dir(root: &Path, identity: &str) -> Option<PathBuf> {
    sanitize_component(identity).map(|id| root.join(id))
}

pub fn artifact_path(root: &Path, identity: &str) -> Option<PathBuf> {
    book_dir(root, identity).map(|dir| dir.join(ARTIFACT_FILE_NAME))
}

pub fn book_folder_name(base_name: &str) -> String {
    format!("{base_name}{BOOK_FOLDER_SUFFIX}")
}

/// Lists the direct children of `root` that look like book folders.
///
/// A missing root is an empty store, not an error.
pub async fn list_candidates(root: &Path) -> anyhow::Result<Vec<String>> {
    let mut dir = match fs::read_dir(root).await {
        Ok(dir) => dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("read store root: {}", root.display()));
        }
    };

    let mut names = Vec::new();
    while let Some(entry) = dir.next_entry().await.context("read store entry")? {
        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!(path = %entry.path().display(), "skip non-utf8 folder name");
            continue;
        };
        if !name.ends_with(BOOK_FOLDER_SUFFIX) {
            continue;
        }
        // Follows symlinks, like the cache does when it opens the artifact.
        match fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_dir() => names.push(name),
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(path = %entry.path().display(), ?err, "skip unreadable store entry");
            }
        }
    }
    Ok(names)
}

/// Reads a book artifact. A missing file is `Ok(None)`.
pub async fn read_artifact(path: &Path) -> Result<Option<Book>, ArtifactError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let artifact = BookArtifact::decode(&bytes)?;
    Ok(Some(artifact.book))
}

/// Writes `book.json` into `book_dir` via a temp file and rename so readers
/// never observe a half-written artifact.
pub async fn write_artifact(book_dir: &Path, book: &Book) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(book_dir)
        .await
        .with_context(|| format!("create book dir: {}", book_dir.display()))?;

    let path = book_dir.join(ARTIFACT_FILE_NAME);
    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec(&BookArtifact::new(book.clone())).context("serialize book")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(path)
}

/// Resolves an image request to `root/<book>/images/<asset>`.
///
/// Both inputs are cut down to their final component before any joining, so
/// the result can never leave the book's images directory.
pub fn resolve_asset_path(
    root: &Path,
    book_id: &str,
    asset_name: &str,
) -> Result<PathBuf, LibraryError> {
    let not_found = || LibraryError::AssetNotFound(format!("{book_id}/{asset_name}"));

    let book = sanitize_component(book_id).ok_or_else(not_found)?;
    let asset = sanitize_component(asset_name).ok_or_else(not_found)?;

    let path = root.join(book).join(IMAGES_DIR_NAME).join(asset);
    if !path.is_file() {
        return Err(not_found());
    }
    Ok(path)
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "css" => "text/css; charset=utf-8",
        _ => "application/octet-stream",
    }
}
