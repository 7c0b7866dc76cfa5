use crate::formats::BookSummary;
use crate::library::Reading;

const STYLE: &str = "body{font-family:Georgia,serif;max-width:48rem;margin:2rem auto;padding:0 1rem;line-height:1.6}\
nav.chapters{font-size:.9rem}nav.pager{display:flex;justify-content:space-between;margin:2rem 0}\
img{max-width:100%}";

pub fn render_library(books: &[BookSummary]) -> String {
    let mut body = String::new();
    body.push_str("<h1>Library</h1>\n");
    if books.is_empty() {
        body.push_str("<p>No books yet. Upload an EPUB to get started.</p>\n");
    } else {
        body.push_str("<ul class=\"books\">\n");
        for book in books {
            body.push_str(&format!(
                "  <li><a href=\"/read/{}\">{}</a> <span class=\"author\">{}</span> <span class=\"chapters\">({} chapters)</span></li>\n",
                html_escape(&book.id),
                html_escape(&book.title),
                html_escape(&book.author),
                book.chapters
            ));
        }
        body.push_str("</ul>\n");
    }
    body.push_str(
        "<form method=\"post\" action=\"/api/upload\" enctype=\"multipart/form-data\">\n  \
         <input type=\"file\" name=\"file\" accept=\".epub\" />\n  \
         <button type=\"submit\">Upload</button>\n</form>\n",
    );

    wrap_document("Library", None, &body)
}

/// Chapter HTML is inserted as-is; it comes from the ingested artifact.
/// A `<base>` of `/read/{id}/` makes relative `images/...` references work on
/// both reader routes.
pub fn render_reader(reading: &Reading) -> String {
    let book = &reading.book;
    let view = reading.view();
    let id = html_escape(&reading.book_id);

    let mut body = String::new();
    body.push_str("<header>\n");
    body.push_str(&format!(
        "  <a href=\"/\">Library</a> / <strong>{}</strong>",
        html_escape(&book.metadata.title)
    ));
    let authors = book.author_line();
    if !authors.is_empty() {
        body.push_str(&format!(" by {}", html_escape(&authors)));
    }
    body.push_str("\n</header>\n");

    body.push_str("<nav class=\"chapters\"><ol start=\"0\">\n");
    for (idx, chapter) in book.spine.iter().enumerate() {
        let label = if chapter.title.trim().is_empty() {
            format!("Chapter {}", idx + 1)
        } else {
            chapter.title.clone()
        };
        if idx == view.chapter_index {
            body.push_str(&format!("  <li><strong>{}</strong></li>\n", html_escape(&label)));
        } else {
            body.push_str(&format!(
                "  <li><a href=\"/read/{id}/{idx}\">{}</a></li>\n",
                html_escape(&label)
            ));
        }
    }
    body.push_str("</ol></nav>\n");

    body.push_str("<article>\n");
    body.push_str(&view.chapter.content);
    if !view.chapter.content.ends_with('\n') {
        body.push('\n');
    }
    body.push_str("</article>\n");

    body.push_str("<nav class=\"pager\">\n");
    match view.prev_index {
        Some(prev) => body.push_str(&format!("  <a rel=\"prev\" href=\"/read/{id}/{prev}\">Previous</a>\n")),
        None => body.push_str("  <span></span>\n"),
    }
    if let Some(next) = view.next_index {
        body.push_str(&format!("  <a rel=\"next\" href=\"/read/{id}/{next}\">Next</a>\n"));
    }
    body.push_str("</nav>\n");

    wrap_document(&book.metadata.title, Some(&format!("/read/{id}/")), &body)
}

fn wrap_document(title: &str, base_href: Option<&str>, body: &str) -> String {
    let mut out = String::new();
    out.push_str("<!doctype html>\n<html>\n<head>\n");
    out.push_str("  <meta charset=\"utf-8\" />\n");
    out.push_str(&format!("  <title>{}</title>\n", html_escape(title)));
    if let Some(base) = base_href {
        out.push_str(&format!("  <base href=\"{base}\" />\n"));
    }
    out.push_str(&format!("  <style>{STYLE}</style>\n"));
    out.push_str("</head>\n<body>\n");
    out.push_str(body);
    out.push_str("</body>\n</html>\n");
    out
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::formats::fixtures;

    fn reading_at(index: usize, chapters: usize) -> Reading {
        Reading {
            book_id: "Sample_data".to_owned(),
            book: Arc::new(fixtures::book("Sample <1>", &["A. Author"], chapters)),
            chapter_index: index,
            prev_index: index.checked_sub(1),
            next_index: (index + 1 < chapters).then_some(index + 1),
        }
    }

    #[test]
    fn library_escapes_titles() {
        let html = render_library(&[BookSummary {
            id: "Tom_data".to_owned(),
            title: "Tom & <Jerry>".to_owned(),
            author: "A".to_owned(),
            chapters: 2,
        }]);
        assert!(html.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(html.contains("href=\"/read/Tom_data\""));
    }

    #[test]
    fn reader_links_neighbours_only_when_present() {
        let first = render_reader(&reading_at(0, 3));
        assert!(!first.contains("rel=\"prev\""));
        assert!(first.contains("href=\"/read/Sample_data/1\">Next"));
        assert!(first.contains("<p>Body of chapter 1</p>"));
        assert!(first.contains("Sample &lt;1&gt;"));

        let last = render_reader(&reading_at(2, 3));
        assert!(last.contains("href=\"/read/Sample_data/1\">Previous"));
        assert!(!last.contains("rel=\"next\""));
    }

    #[test]
    fn reader_sets_base_for_relative_images() {
        let html = render_reader(&reading_at(1, 3));
        assert!(html.contains("<base href=\"/read/Sample_data/\" />"));
        assert!(!render_library(&[]).contains("<base"));
    }
}
