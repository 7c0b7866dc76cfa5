use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::cache::{BookCache, DEFAULT_CAPACITY};
use crate::cli::IngestArgs;
use crate::error::LibraryError;
use crate::formats::Book;
use crate::store;

pub const UPLOAD_EXTENSION: &str = ".epub";

/// Turns an EPUB on disk into a structured book, writing any extracted
/// images under `out_dir/images`.
#[async_trait]
pub trait Ingestor: Send + Sync {
    async fn ingest(&self, epub_path: &Path, out_dir: &Path) -> anyhow::Result<Book>;
}

/// Runs an external converter as `program args... <epub_path> <out_dir>` and
/// reads the book as JSON from its stdout.
#[derive(Debug, Clone)]
pub struct CommandIngestor {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandIngestor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Reads `BOOKSHELF_INGEST_COMMAND`, split on whitespace.
    pub fn from_env() -> Option<Self> {
        let raw = std::env::var("BOOKSHELF_INGEST_COMMAND").ok()?;
        let mut parts = raw.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    fn run_blocking(&self, epub_path: &Path, out_dir: &Path) -> anyhow::Result<Book> {
        tracing::info!(
            program = %self.program,
            epub = %epub_path.display(),
            out = %out_dir.display(),
            "run ingest command"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(epub_path)
            .arg(out_dir)
            .env("BOOKSHELF_INGEST_EPUB", epub_path)
            .env("BOOKSHELF_INGEST_OUT", out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("spawn ingest command: {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!("ingest command failed: {} ({})", self.program, output.status);
        }

        serde_json::from_slice(&output.stdout).context("parse ingest command output as book json")
    }
}

#[async_trait]
impl Ingestor for CommandIngestor {
    async fn ingest(&self, epub_path: &Path, out_dir: &Path) -> anyhow::Result<Book> {
        let this = self.clone();
        let epub_path = epub_path.to_path_buf();
        let out_dir = out_dir.to_path_buf();
        tokio::task::spawn_blocking(move || this.run_blocking(&epub_path, &out_dir))
            .await
            .context("join ingest command task")?
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngestedBook {
    pub id: String,
    pub title: String,
}

/// Accepts uploaded EPUBs, hands them to the ingestor, persists the result and
/// clears the book cache.
#[derive(Clone)]
pub struct UploadIntake {
    root: PathBuf,
    cache: Arc<BookCache>,
    ingestor: Option<Arc<dyn Ingestor>>,
}

impl UploadIntake {
    pub fn new(
        root: impl Into<PathBuf>,
        cache: Arc<BookCache>,
        ingestor: Option<Arc<dyn Ingestor>>,
    ) -> Self {
        Self {
            root: root.into(),
            cache,
            ingestor,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.ingestor.is_some()
    }

    pub async fn ingest(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestedBook, LibraryError> {
        let base_name = upload_base_name(file_name)?;
        let Some(ingestor) = self.ingestor.as_deref() else {
            return Err(LibraryError::Configuration(
                "no ingest command configured (set BOOKSHELF_INGEST_COMMAND)".to_owned(),
            ));
        };

        let id = store::book_folder_name(base_name);
        let out_dir = self.root.join(&id);

        let book = run_ingestor(ingestor, bytes, &out_dir)
            .await
            .map_err(|err| LibraryError::IngestionFailure(format!("{err:#}")))?;
        store::write_artifact(&out_dir, &book)
            .await
            .map_err(|err| LibraryError::IngestionFailure(format!("{err:#}")))?;

        self.cache.invalidate_all();
        tracing::info!(book_id = %id, title = %book.metadata.title, "ingested upload");

        Ok(IngestedBook {
            id,
            title: book.metadata.title,
        })
    }
}

async fn run_ingestor(
    ingestor: &dyn Ingestor,
    bytes: Vec<u8>,
    out_dir: &Path,
) -> anyhow::Result<Book> {
    // Removed on drop, whichever way this function returns.
    let upload = tokio::task::spawn_blocking(move || spool_upload(&bytes))
        .await
        .context("join upload spool task")??;

    let book = ingestor
        .ingest(upload.path(), out_dir)
        .await
        .context("ingest epub")?;
    if book.spine.is_empty() {
        anyhow::bail!("ingested book has no chapters");
    }
    Ok(book)
}

fn spool_upload(bytes: &[u8]) -> anyhow::Result<NamedTempFile> {
    let mut upload = tempfile::Builder::new()
        .prefix("bookshelf-upload-")
        .suffix(UPLOAD_EXTENSION)
        .tempfile()
        .context("create upload temp file")?;
    upload.write_all(bytes).context("write upload temp file")?;
    upload.flush().context("flush upload temp file")?;
    Ok(upload)
}

pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let file_name = Path::new(&args.epub)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid epub path: {}", args.epub))?
        .to_owned();
    let bytes = tokio::fs::read(&args.epub)
        .await
        .with_context(|| format!("read epub: {}", args.epub))?;

    let root = PathBuf::from(&args.books_dir);
    let cache = Arc::new(BookCache::new(root.clone(), DEFAULT_CAPACITY));
    let ingestor: Arc<dyn Ingestor> =
        Arc::new(CommandIngestor::new(args.command, args.command_args));
    let intake = UploadIntake::new(root, cache, Some(ingestor));

    let ingested = intake.ingest(&file_name, bytes).await?;
    println!("{}", serde_json::to_string(&ingested)?);
    Ok(())
}

/// `My Book.epub` -> `My Book`. Directory parts of the client-supplied name
/// are dropped.
pub fn upload_base_name(file_name: &str) -> Result<&str, LibraryError> {
    if !file_name.ends_with(UPLOAD_EXTENSION) {
        return Err(LibraryError::InvalidUpload(
            "Only .epub files are allowed".to_owned(),
        ));
    }
    store::sanitize_component(file_name)
        .and_then(|name| name.strip_suffix(UPLOAD_EXTENSION))
        .filter(|base| !base.trim().is_empty())
        .ok_or_else(|| LibraryError::InvalidUpload(format!("invalid file name: {file_name:?}")))
}
