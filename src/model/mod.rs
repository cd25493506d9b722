//! Core data model.
//!
//! This module contains:
//! - Book identifiers and download kinds
//! - Index entries, content pages and book payload metadata
//! - Chapters produced by the assembler
//! - Cover images and search results

mod book;
mod chapter;
mod cover;
mod search;

pub use book::{
    BookData, BookId, BookIndex, BookMetadata, BookPage, BookType, DEFAULT_PART,
};
pub use chapter::Chapter;
pub use cover::{CoverImage, DecodedCover};
pub use search::{PdfPayload, SearchItem};
