//! Turn decoded metadata and assembled chapters into a [`Document`].

use std::fmt::Write as _;

use serde::Deserialize;

use crate::model::{BookMetadata, Chapter};
use crate::text::{escape_html, to_xhtml_text};

use super::{Document, DocumentChapter};

/// User-visible strings inserted into composed documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub info_chapter: String,
    pub title: String,
    pub page_count: String,
    pub author: String,
    pub description: String,
    pub info: String,
    pub cover_chapter: String,
    pub cover_alt: String,
    /// Abbreviation for "volume" in page markers.
    pub volume: String,
    /// Abbreviation for "page" in page markers.
    pub page: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            info_chapter: "بطاقة الكتاب".into(),
            title: "عنوان الكتاب: ".into(),
            page_count: "عدد الصفحات: ".into(),
            author: "المؤلف: ".into(),
            description: "وصف الكتاب: ".into(),
            info: "حول الكتاب: ".into(),
            cover_chapter: "الغلاف".into(),
            cover_alt: "غلاف الكتاب".into(),
            volume: "م".into(),
            page: "ص".into(),
        }
    }
}

/// Options for [`compose_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    pub language: String,
    pub labels: Labels,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            language: "ar".into(),
            labels: Labels::default(),
        }
    }
}

/// Compose a document from book metadata and assembled chapters.
///
/// The result starts with a book-info chapter, followed by a cover chapter
/// when the book has a cover that decodes, followed by `chapters` in order.
/// Each page becomes one paragraph ending in a `[volume N page M ]` marker.
pub fn compose_document(
    meta: &BookMetadata,
    page_count: usize,
    chapters: &[Chapter],
    opts: &ComposeOptions,
) -> Document {
    let labels = &opts.labels;

    let cover = meta.cover.as_ref().and_then(|cover| match cover.decode() {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("Dropping cover of \"{}\": {}", meta.title, e);
            None
        }
    });

    let mut doc = Document {
        title: meta.title.clone(),
        author: meta.author.clone(),
        language: opts.language.clone(),
        cover,
        chapters: Vec::with_capacity(chapters.len() + 2),
    };

    doc.chapters.push(DocumentChapter {
        title: labels.info_chapter.clone(),
        body: info_body(meta, page_count, labels),
    });

    if let Some(href) = doc.cover_href() {
        doc.chapters.push(DocumentChapter {
            title: labels.cover_chapter.clone(),
            body: format!(
                "<img src=\"{}\" alt=\"{}\"/>",
                escape_html(&href),
                escape_html(&labels.cover_alt)
            ),
        });
    }

    for chapter in chapters {
        doc.chapters.push(DocumentChapter {
            title: chapter.title.clone(),
            body: chapter_body(chapter, labels),
        });
    }

    log::debug!(
        "Composed \"{}\": {} chapters, cover: {}",
        doc.title,
        doc.chapters.len(),
        doc.cover.is_some()
    );
    doc
}

fn info_body(meta: &BookMetadata, page_count: usize, labels: &Labels) -> String {
    let mut lines = vec![
        (labels.title.as_str(), meta.title.clone()),
        (labels.page_count.as_str(), page_count.to_string()),
        (labels.author.as_str(), meta.author.clone()),
    ];
    if let Some(description) = &meta.description {
        lines.push((labels.description.as_str(), description.clone()));
    }
    if let Some(info) = &meta.info {
        lines.push((labels.info.as_str(), info.clone()));
    }

    let mut body = String::from("<p>");
    for (label, value) in lines {
        body.push_str(&to_xhtml_text(label));
        body.push_str(&to_xhtml_text(&value));
        body.push_str("<br/>");
    }
    body.push_str("</p>");
    body
}

fn chapter_body(chapter: &Chapter, labels: &Labels) -> String {
    let volume = escape_html(&labels.volume);
    let page_label = escape_html(&labels.page);

    let mut body = String::new();
    for page in &chapter.pages {
        body.push_str("<p>");
        body.push_str(&to_xhtml_text(&page.content));
        // Writing to a String cannot fail
        let _ = write!(body, " [{} {} {} {} ]", volume, page.part, page_label, page.page);
        body.push_str("</p><br/>");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookPage, CoverImage};

    fn meta() -> BookMetadata {
        BookMetadata {
            title: "A & B".into(),
            author: "Author".into(),
            ..Default::default()
        }
    }

    fn english() -> ComposeOptions {
        ComposeOptions {
            language: "en".into(),
            labels: Labels {
                info_chapter: "About".into(),
                title: "Title: ".into(),
                page_count: "Pages: ".into(),
                author: "Author: ".into(),
                description: "Description: ".into(),
                info: "Info: ".into(),
                cover_chapter: "Cover".into(),
                cover_alt: "Cover image".into(),
                volume: "v".into(),
                page: "p".into(),
            },
        }
    }

    #[test]
    fn test_info_chapter_comes_first() {
        let chapters = vec![Chapter::new("One", vec![BookPage::new(1, "x")])];
        let doc = compose_document(&meta(), 1, &chapters, &english());

        assert_eq!(doc.chapters.len(), 2);
        assert_eq!(doc.chapters[0].title, "About");
        assert_eq!(
            doc.chapters[0].body,
            "<p>Title: A &amp; B<br/>Pages: 1<br/>Author: Author<br/></p>"
        );
        assert_eq!(doc.chapters[1].title, "One");
    }

    #[test]
    fn test_optional_info_lines() {
        let meta = BookMetadata {
            description: Some("line1\nline2".into()),
            info: Some("<info>".into()),
            ..meta()
        };
        let doc = compose_document(&meta, 0, &[], &english());
        let body = &doc.chapters[0].body;
        assert!(body.contains("Description: line1<br/>line2<br/>"));
        assert!(body.contains("Info: &lt;info&gt;<br/>"));
    }

    #[test]
    fn test_page_markers() {
        let mut page = BookPage::new(1, "first\nsecond");
        page.part = 2;
        page.page = 7;
        let chapters = vec![Chapter::new("One", vec![page])];
        let doc = compose_document(&meta(), 1, &chapters, &english());
        assert_eq!(doc.chapters[1].body, "<p>first<br/>second [v 2 p 7 ]</p><br/>");
    }

    #[test]
    fn test_cover_chapter_is_second() {
        // PNG signature only
        let meta = BookMetadata {
            cover: CoverImage::from_payload(Some("iVBORw0KGgo=".into())),
            ..meta()
        };
        let chapters = vec![Chapter::new("One", vec![BookPage::new(1, "x")])];
        let doc = compose_document(&meta, 1, &chapters, &english());

        let titles: Vec<_> = doc.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["About", "Cover", "One"]);
        assert_eq!(doc.cover.as_ref().unwrap().media_type, "image/png");
        assert_eq!(doc.chapters[1].body, "<img src=\"images/cover.png\" alt=\"Cover image\"/>");
    }

    #[test]
    fn test_undecodable_cover_is_dropped() {
        let meta = BookMetadata {
            cover: CoverImage::from_payload(Some("not base64!".into())),
            ..meta()
        };
        let doc = compose_document(&meta, 0, &[], &english());
        assert!(doc.cover.is_none());
        assert_eq!(doc.chapters.len(), 1);
    }

    #[test]
    fn test_default_labels_are_arabic() {
        let doc = compose_document(&meta(), 0, &[], &ComposeOptions::default());
        assert_eq!(doc.language, "ar");
        assert_eq!(doc.chapters[0].title, "بطاقة الكتاب");
    }
}
