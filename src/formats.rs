use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// Version written into every `book.json` envelope.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File name of the serialized book inside a book folder.
pub const ARTIFACT_FILE_NAME: &str = "book.json";

/// Suffix that marks a directory under the store root as a book folder.
pub const BOOK_FOLDER_SUFFIX: &str = "_data";

/// Subdirectory of a book folder that holds its images.
pub const IMAGES_DIR_NAME: &str = "images";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// One entry of the reading sequence. `content` is an HTML fragment that is
/// passed through to the view untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterContent {
    pub id: String,
    pub href: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub text: String,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
    #[serde(default)]
    pub file_href: String,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub children: Vec<TocEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub metadata: BookMetadata,
    pub spine: Vec<ChapterContent>,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
    /// Original EPUB href -> path relative to the book folder.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_time: Option<String>,
}

impl Book {
    pub fn chapter_count(&self) -> usize {
        self.spine.len()
    }

    pub fn author_line(&self) -> String {
        self.metadata.authors.join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookArtifact {
    pub format_version: u32,
    pub written_at: DateTime<Utc>,
    pub book: Book,
}

impl BookArtifact {
    pub fn new(book: Book) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            written_at: Utc::now(),
            book,
        }
    }

    /// Decodes an artifact, checking the version before touching the payload
    /// so that a future layout fails with a version error instead of a shape
    /// error.
    pub fn decode(bytes: &[u8]) -> Result<Self, ArtifactError> {
        #[derive(Deserialize)]
        struct Header {
            format_version: u32,
        }

        let header: Header = serde_json::from_slice(bytes).map_err(ArtifactError::Parse)?;
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: header.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        serde_json::from_slice(bytes).map_err(ArtifactError::Parse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub chapters: usize,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_other_format_versions() {
        let raw = serde_json::json!({
            "format_version": 7,
            "written_at": "2026-01-01T00:00:00Z",
            "book": {},
        });
        let err = BookArtifact::decode(raw.to_string().as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::UnsupportedVersion {
                found: 7,
                expected: ARTIFACT_FORMAT_VERSION
            }
        ));
    }

    #[test]
    fn decode_reports_malformed_json_as_parse_error() {
        let err = BookArtifact::decode(b"\x80\x04pickle").unwrap_err();
        assert!(matches!(err, ArtifactError::Parse(_)));
    }

    #[test]
    fn metadata_defaults_optional_fields() -> anyhow::Result<()> {
        let meta: BookMetadata = serde_json::from_str(r#"{"title":"Bare"}"#)?;
        assert_eq!(meta.title, "Bare");
        assert!(meta.authors.is_empty());
        assert!(meta.language.is_none());
        Ok(())
    }

    #[test]
    fn author_line_joins_with_comma() {
        let book = fixtures::book("Two Hands", &["A. Author", "B. Writer"], 1);
        assert_eq!(book.author_line(), "A. Author, B. Writer");
        assert_eq!(fixtures::book("Anon", &[], 1).author_line(), "");
    }
}
