use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::cache::{BookCache, DEFAULT_CAPACITY};
use crate::cli::ListArgs;
use crate::formats::BookSummary;
use crate::store;

pub async fn run(args: ListArgs) -> anyhow::Result<()> {
    let root = Path::new(&args.books_dir);
    let cache = BookCache::new(root, DEFAULT_CAPACITY);
    let books = list_books(root, &cache).await?;
    tracing::info!(books = books.len(), root = %root.display(), "listed catalog");

    let mut stdout = std::io::stdout().lock();
    for book in &books {
        let line = serde_json::to_string(book).context("serialize book summary")?;
        writeln!(stdout, "{line}").context("write stdout")?;
    }
    Ok(())
}

/// Builds the landing-page listing. Folders whose artifact is missing or
/// unreadable are skipped so one broken book cannot hide the others.
pub async fn list_books(root: &Path, cache: &BookCache) -> anyhow::Result<Vec<BookSummary>> {
    let candidates = store::list_candidates(root).await?;

    let mut books = Vec::with_capacity(candidates.len());
    for id in candidates {
        let Some(book) = cache.get(&id).await else {
            tracing::debug!(book_id = %id, "skip folder without loadable book");
            continue;
        };
        books.push(BookSummary {
            title: book.metadata.title.clone(),
            author: book.author_line(),
            chapters: book.chapter_count(),
            id,
        });
    }
    Ok(books)
}
