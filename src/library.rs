use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{BookCache, DEFAULT_CAPACITY};
use crate::cli::ReadArgs;
use crate::error::LibraryError;
use crate::formats::{Book, BookSummary};
use crate::navigator::{self, ChapterView};
use crate::{catalog, store};

/// Entry point for everything that reads the book store.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    cache: Arc<BookCache>,
}

/// A book plus a validated chapter position inside it.
#[derive(Debug, Clone)]
pub struct Reading {
    pub book_id: String,
    pub book: Arc<Book>,
    pub chapter_index: usize,
    pub prev_index: Option<usize>,
    pub next_index: Option<usize>,
}

impl Reading {
    pub fn view(&self) -> ChapterView<'_> {
        ChapterView {
            chapter: &self.book.spine[self.chapter_index],
            chapter_index: self.chapter_index,
            prev_index: self.prev_index,
            next_index: self.next_index,
        }
    }
}

impl Library {
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        let root = root.into();
        let cache = Arc::new(BookCache::new(root.clone(), capacity));
        Self { root, cache }
    }

    pub fn with_cache(cache: Arc<BookCache>) -> Self {
        Self {
            root: cache.root().to_path_buf(),
            cache,
        }
    }

    pub async fn list_books(&self) -> anyhow::Result<Vec<BookSummary>> {
        catalog::list_books(&self.root, &self.cache).await
    }

    pub async fn book(&self, book_id: &str) -> Result<Arc<Book>, LibraryError> {
        self.cache
            .get(book_id)
            .await
            .ok_or_else(|| LibraryError::BookNotFound(book_id.to_owned()))
    }

    /// Looks the book up first, then validates the index; `None` means the
    /// first chapter. The returned id is the folder name the book was loaded
    /// from, so links built from it stay inside `/read/{id}/`.
    pub async fn read_chapter(
        &self,
        book_id: &str,
        chapter_index: Option<i64>,
    ) -> Result<Reading, LibraryError> {
        let book = self.book(book_id).await?;
        let folder = store::sanitize_component(book_id)
            .ok_or_else(|| LibraryError::BookNotFound(book_id.to_owned()))?;
        let view = navigator::resolve(&book, chapter_index.unwrap_or(0))?;
        let (chapter_index, prev_index, next_index) =
            (view.chapter_index, view.prev_index, view.next_index);

        Ok(Reading {
            book_id: folder.to_owned(),
            book,
            chapter_index,
            prev_index,
            next_index,
        })
    }

    pub fn asset_path(&self, book_id: &str, asset_name: &str) -> Result<PathBuf, LibraryError> {
        store::resolve_asset_path(&self.root, book_id, asset_name)
    }
}

#[derive(Debug, Serialize)]
struct ReadOutput<'a> {
    book_id: &'a str,
    title: &'a str,
    chapter_index: usize,
    chapter_count: usize,
    prev_idx: Option<usize>,
    next_idx: Option<usize>,
    chapter_title: &'a str,
    text: &'a str,
}

pub async fn run_read(args: ReadArgs) -> anyhow::Result<()> {
    let library = Library::new(&args.books_dir, DEFAULT_CAPACITY);
    let reading = library.read_chapter(&args.book, Some(args.chapter)).await?;
    let view = reading.view();

    let out = ReadOutput {
        book_id: &reading.book_id,
        title: &reading.book.metadata.title,
        chapter_index: view.chapter_index,
        chapter_count: reading.book.chapter_count(),
        prev_idx: view.prev_index,
        next_idx: view.next_index,
        chapter_title: &view.chapter.title,
        text: &view.chapter.text,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
