//! One conversion request, end to end.
//!
//! ```text
//! payload ─ io ─ decode ─┬─ assemble ─ compose ─ EpubWriter ─┐
//! index  ─ io ─ decode ──┘                                    ├─ persist_atomically
//! pdf    ─ io ─ decode_pdf_payload ──────────────────────────┘
//! ```

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::assemble::assemble_chapters;
use crate::config::ConvertConfig;
use crate::decode::{
    CancelToken, DecodeOptions, decode_book_data, decode_book_with, decode_pdf_payload,
    fetch_paged_index,
};
use crate::error::{Error, Result};
use crate::export::{Document, DocumentWriter, EpubWriter, StampedPdf, compose_document};
use crate::io::open_payload;
use crate::model::{BookData, BookId, BookIndex, BookMetadata, BookType};

/// Local copies of the payloads a conversion reads.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    /// Book data payload (raw or zipped JSON).
    pub data: PathBuf,
    /// Index responses, one per part, in part order.
    pub index: Vec<PathBuf>,
    /// Alternate-format payload; required for PDF extraction.
    pub pdf: Option<PathBuf>,
}

/// Runs conversions with one configuration.
pub struct Converter {
    config: ConvertConfig,
    cancel: Option<CancelToken>,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Abort decoding when `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    fn decode_options(&self) -> DecodeOptions {
        let opts = self.config.decode_options();
        match &self.cancel {
            Some(token) => opts.with_cancel(token.clone()),
            None => opts,
        }
    }

    /// Decode the book payload at `path`.
    pub fn load_book(&self, path: &Path) -> Result<BookData> {
        let opts = self.decode_options();
        open_payload(path, |reader| decode_book_data(reader, &opts))
    }

    /// Decode only the metadata of the book payload at `path`.
    pub fn load_metadata(&self, path: &Path) -> Result<BookMetadata> {
        let opts = self.decode_options();
        open_payload(path, |reader| decode_book_with(reader, &opts, |_| {}))
    }

    /// Decode index responses, `paths[n - 1]` holding part `n`.
    ///
    /// A missing index is not an error; the book is then assembled into a
    /// single chapter.
    pub fn load_index(&self, paths: &[PathBuf]) -> Result<Vec<BookIndex>> {
        let max_parts = self.config.max_index_parts.min(paths.len() as u32);
        fetch_paged_index(
            |part| {
                let Some(path) = paths.get(part as usize - 1) else {
                    return Ok(None);
                };
                File::open(path)
                    .map(Some)
                    .map_err(|source| Error::ResourceUnavailable {
                        path: path.clone(),
                        source,
                    })
            },
            max_parts,
        )
    }

    /// Assemble and compose a decoded book.
    pub fn build_document(&self, book: BookData, index: Vec<BookIndex>) -> Document {
        let (metadata, pages) = book.into_parts();
        let page_count = pages.len();
        let chapters = assemble_chapters(index, pages, &self.config.default_title);
        compose_document(&metadata, page_count, &chapters, &self.config.compose_options())
    }

    /// Write the EPUB rendition of book `id` into `out_dir`.
    pub fn convert_epub(&self, id: BookId, sources: &Sources, out_dir: &Path) -> Result<PathBuf> {
        let book = self.load_book(&sources.data)?;
        let index = self.load_index(&sources.index)?;
        log::info!(
            "Converting \"{}\": {} pages, {} index entries",
            book.title(),
            book.pages.len(),
            index.len()
        );

        let dest = out_dir.join(output_file_name(book.title(), "epub"));
        let doc = self.build_document(book, index);

        let writer = EpubWriter::new().with_config(
            self.config
                .epub_config()
                .with_identifier(format!("urn:ketabonline:book:{id}")),
        );
        persist_atomically(&dest, |file| writer.write(&doc, file))?;

        log::info!("Wrote {}", dest.display());
        Ok(dest)
    }

    /// Write the PDF rendition of a book into `out_dir`.
    ///
    /// The book payload must advertise a PDF download; the downloaded PDF
    /// payload itself is read from `sources.pdf`. The payload's title,
    /// author and producer become the PDF's document information.
    pub fn extract_pdf(&self, sources: &Sources, out_dir: &Path) -> Result<PathBuf> {
        let meta = self.load_metadata(&sources.data)?;
        let url = meta.pdf_url.as_deref().ok_or(Error::MissingPdfUrl)?;
        let pdf_path = sources.pdf.as_deref().ok_or_else(|| Error::ResourceUnavailable {
            path: PathBuf::from(url),
            source: io::Error::new(io::ErrorKind::NotFound, "PDF payload was not provided"),
        })?;

        let pdf = open_payload(pdf_path, |reader| decode_pdf_payload(reader))?;
        let mut stamped = StampedPdf::new(&pdf)?;
        let dest = out_dir.join(output_file_name(&meta.title, "pdf"));
        persist_atomically(&dest, |file| stamped.save_to(file))?;

        log::info!("Wrote {} (payload {} bytes)", dest.display(), pdf.bytes.len());
        Ok(dest)
    }

    /// Produce the requested rendition.
    pub fn convert(&self, book: BookType, sources: &Sources, out_dir: &Path) -> Result<PathBuf> {
        match book {
            BookType::Epub(id) => self.convert_epub(id, sources, out_dir),
            BookType::Pdf(_) => self.extract_pdf(sources, out_dir),
        }
    }
}

/// Write `dest` through a temporary file in the same directory.
///
/// The file appears under its final name only once `write` has succeeded;
/// on failure nothing is left behind.
pub fn persist_atomically<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(Error::Sink)?;
    write(tmp.as_file_mut()).map_err(Error::Sink)?;
    tmp.as_file_mut().sync_all().map_err(Error::Sink)?;
    tmp.persist(dest).map_err(|e| Error::Sink(e.error))?;
    Ok(())
}

/// A file name for `title` with extension `ext`.
///
/// Path separators and control characters become `_`.
pub fn output_file_name(title: &str, ext: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        format!("book.{ext}")
    } else {
        format!("{stem}.{ext}")
    }
}
