use serde::Serialize;

use crate::error::LibraryError;
use crate::formats::{Book, ChapterContent};

/// A validated position in a book's spine plus its neighbours.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChapterView<'a> {
    pub chapter: &'a ChapterContent,
    pub chapter_index: usize,
    pub prev_index: Option<usize>,
    pub next_index: Option<usize>,
}

pub fn resolve(book: &Book, requested_index: i64) -> Result<ChapterView<'_>, LibraryError> {
    let len = book.spine.len();
    let out_of_range = || LibraryError::ChapterOutOfRange {
        index: requested_index,
        len,
    };

    let index = usize::try_from(requested_index).map_err(|_| out_of_range())?;
    let chapter = book.spine.get(index).ok_or_else(out_of_range)?;

    Ok(ChapterView {
        chapter,
        chapter_index: index,
        prev_index: index.checked_sub(1),
        next_index: (index + 1 < len).then_some(index + 1),
    })
}
