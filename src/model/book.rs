//! Book-level records produced by the decoders.

use std::fmt;

use crate::error::{Error, Result};

use super::CoverImage;

/// Part number used when a record does not carry a resolvable one.
pub const DEFAULT_PART: u32 = 1;

/// Catalog identifier of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(pub u64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which rendition of a book a download produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookType {
    Epub(BookId),
    Pdf(BookId),
}

impl BookType {
    pub const EPUB: &'static str = "EPUB";
    pub const PDF: &'static str = "PDF";

    /// Parse a stored type name back into a `BookType` (case-insensitive).
    pub fn from_name(name: &str, book_id: BookId) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            Self::EPUB => Ok(BookType::Epub(book_id)),
            Self::PDF => Ok(BookType::Pdf(book_id)),
            _ => Err(Error::UnknownBookType(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BookType::Epub(_) => Self::EPUB,
            BookType::Pdf(_) => Self::PDF,
        }
    }

    pub fn book_id(&self) -> BookId {
        match self {
            BookType::Epub(id) | BookType::Pdf(id) => *id,
        }
    }

    /// File extension of the produced document.
    pub fn extension(&self) -> &'static str {
        match self {
            BookType::Epub(_) => "epub",
            BookType::Pdf(_) => "pdf",
        }
    }
}

/// One table-of-contents entry.
///
/// `page_id` is the identifier of the first content page the entry covers
/// and is the ordering key; `page` is only a display number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookIndex {
    pub title: String,
    pub page_id: u64,
    pub page: u32,
    pub part: u32,
}

impl BookIndex {
    pub fn new(title: impl Into<String>, page_id: u64) -> Self {
        Self {
            title: title.into(),
            page_id,
            page: 0,
            part: DEFAULT_PART,
        }
    }
}

/// One unit of book content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPage {
    /// Ordering key. Monotonic but not necessarily contiguous.
    pub id: u64,
    pub part: u32,
    pub page: u32,
    /// Plain text, already stripped of markup.
    pub content: String,
}

impl BookPage {
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            part: DEFAULT_PART,
            page: 0,
            content: content.into(),
        }
    }
}

/// Everything in a book payload except its pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub cover: Option<CoverImage>,
    pub description: Option<String>,
    pub info: Option<String>,
    /// Download URL of the alternate (PDF) rendition, if the book has one.
    pub pdf_url: Option<String>,
}

/// A fully decoded book payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookData {
    pub metadata: BookMetadata,
    pub pages: Vec<BookPage>,
}

impl BookData {
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn author(&self) -> &str {
        &self.metadata.author
    }

    /// Split into metadata and pages so the pages can be moved into the
    /// assembler without cloning.
    pub fn into_parts(self) -> (BookMetadata, Vec<BookPage>) {
        (self.metadata, self.pages)
    }
}
