use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use bookshelf::formats::{Book, BookArtifact, BookMetadata, ChapterContent};

pub fn book(title: &str, authors: &[&str], chapters: usize) -> Book {
    let spine = (0..chapters)
        .map(|idx| ChapterContent {
            id: format!("ch{idx:02}"),
            href: format!("text/ch{idx:02}.xhtml"),
            title: format!("Chapter {}", idx + 1),
            content: format!("<p>Body of chapter {}</p>", idx + 1),
            text: format!("Body of chapter {}", idx + 1),
            order: idx,
        })
        .collect();

    Book {
        metadata: BookMetadata {
            title: title.to_owned(),
            authors: authors.iter().map(|a| (*a).to_owned()).collect(),
            language: None,
            description: None,
            publisher: None,
            date: None,
            identifiers: Vec::new(),
            subjects: Vec::new(),
        },
        spine,
        toc: Vec::new(),
        images: BTreeMap::new(),
        source_file: None,
        processed_time: None,
    }
}

pub fn write_book(root: &Path, id: &str, book: &Book) -> anyhow::Result<()> {
    let dir = root.join(id);
    std::fs::create_dir_all(dir.join("images")).context("create book dir")?;
    let data = serde_json::to_vec(&BookArtifact::new(book.clone()))?;
    std::fs::write(dir.join("book.json"), data).context("write book.json")?;
    Ok(())
}

#[allow(dead_code)]
pub fn write_image(root: &Path, id: &str, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = root.join(id).join("images");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(name), bytes)?;
    Ok(())
}
