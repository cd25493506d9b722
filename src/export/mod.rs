//! Document composition and output writers.
//!
//! Assembled chapters are first composed into a [`Document`]: a flat list
//! of titled XHTML bodies plus book metadata, with a book-info chapter and
//! an optional cover chapter in front. A [`DocumentWriter`] then serializes
//! the document into a container format.
//!
//! # Architecture
//!
//! Writers follow a builder pattern:
//! - `new()` creates a writer with default configuration
//! - `with_config()` allows customization
//! - `write()` targets any `Write + Seek` destination
//!
//! # Example
//!
//! ```no_run
//! use ketab2epub::export::{ComposeOptions, DocumentWriter, EpubWriter, compose_document};
//! use ketab2epub::model::BookMetadata;
//! use std::fs::File;
//!
//! let meta = BookMetadata { title: "Kitab".into(), ..Default::default() };
//! let doc = compose_document(&meta, 0, &[], &ComposeOptions::default());
//! let mut file = File::create("output.epub")?;
//! EpubWriter::new().write(&doc, &mut file)?;
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io::{self, Seek, Write};

use crate::model::DecodedCover;

mod compose;
mod epub;
mod pdf;

pub use compose::{ComposeOptions, Labels, compose_document};
pub use epub::{EpubConfig, EpubWriter};
pub use pdf::StampedPdf;

/// A composed book, ready for a container writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub author: String,
    /// BCP 47 language tag, e.g. `ar`.
    pub language: String,
    pub cover: Option<DecodedCover>,
    /// In reading order. Writers must keep this order in both the spine and
    /// the navigation.
    pub chapters: Vec<DocumentChapter>,
}

impl Document {
    /// Path of the cover image relative to the chapter files, as referenced
    /// by the cover chapter.
    pub fn cover_href(&self) -> Option<String> {
        self.cover
            .as_ref()
            .map(|cover| format!("images/cover.{}", cover.extension()))
    }
}

/// One chapter of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChapter {
    pub title: String,
    /// XHTML fragment placed inside the chapter's `<body>`.
    pub body: String,
}

/// Trait for serializing composed documents into a specific format.
///
/// The writer can be:
/// - `std::fs::File` for disk output
/// - `std::io::Cursor<Vec<u8>>` for in-memory output
/// - Any other type implementing `Write + Seek`
pub trait DocumentWriter {
    /// Write `doc` to `out`.
    fn write<W: Write + Seek>(&self, doc: &Document, out: &mut W) -> io::Result<()>;
}
