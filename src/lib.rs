//! # ketab2epub
//!
//! Turn online book catalog payloads into EPUB documents.
//!
//! ## Features
//!
//! - Stream-decode book data, index, search and PDF payloads without
//!   building a JSON tree of the document
//! - Merge a sparse table of contents with content pages into chapters
//! - Strip page markup to plain text
//! - Write EPUB 3 (with NCX) through a pluggable [`DocumentWriter`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use ketab2epub::{BookId, ConvertConfig, Converter, Sources};
//! use std::path::Path;
//!
//! let sources = Sources {
//!     data: "1207.data.zip".into(),
//!     index: vec!["1207.index.json".into()],
//!     pdf: None,
//! };
//! let converter = Converter::new(ConvertConfig::default());
//! let path = converter.convert_epub(BookId(1207), &sources, Path::new("."))?;
//! println!("wrote {}", path.display());
//! # Ok::<(), ketab2epub::Error>(())
//! ```
//!
//! ## Working with the pieces
//!
//! Each stage is usable on its own:
//!
//! ```
//! use ketab2epub::{BookIndex, assemble_chapters, decode_book_data};
//! use ketab2epub::decode::DecodeOptions;
//!
//! let json = r#"{"title": "Kitab", "pages": [{"id": 1, "content": "<p>a</p>"}, {"id": 9}]}"#;
//! let book = decode_book_data(json.as_bytes(), &DecodeOptions::new("Unknown"))?;
//!
//! let chapters = assemble_chapters(vec![BookIndex::new("Two", 9)], book.pages, "Untitled");
//! assert_eq!(chapters.len(), 2);
//! assert_eq!(chapters[0].title, "Untitled");
//! # Ok::<(), ketab2epub::Error>(())
//! ```

pub mod assemble;
pub mod config;
pub mod decode;
pub mod endpoints;
pub mod error;
pub mod export;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod status;
pub mod text;

pub use assemble::assemble_chapters;
pub use config::ConvertConfig;
pub use decode::{CancelToken, decode_book_data, decode_index, decode_search, resolve_part};
pub use endpoints::{Endpoints, file_name_from_url};
pub use error::{Error, Result};
pub use export::{Document, DocumentWriter, EpubWriter, compose_document};
pub use model::{BookData, BookId, BookIndex, BookPage, BookType, Chapter, SearchItem};
pub use pipeline::{Converter, Sources, persist_atomically};
pub use status::{DownloadTracker, FlagWatch};
