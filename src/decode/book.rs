//! Book data payload: metadata plus the (possibly huge) `pages` array.

use std::fmt;
use std::io::Read;

use serde::Deserialize;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{BookData, BookMetadata, BookPage, CoverImage, DEFAULT_PART};
use crate::text::{PlainTextOptions, to_plain_text};

use super::part::resolve_part;
use super::{DecodeContext, DecodeOptions, LenientInt, run_seed};

/// Decode a whole book payload.
///
/// Pages are appended one by one as the array is read; the raw payload is
/// never held in memory.
pub fn decode_book_data<R: Read>(reader: R, opts: &DecodeOptions) -> Result<BookData> {
    let mut pages = Vec::new();
    let metadata = decode_book_with(reader, opts, |page| pages.push(page))?;
    log::debug!(
        "Decoded \"{}\" with {} pages",
        metadata.title,
        pages.len()
    );
    Ok(BookData { metadata, pages })
}

/// Decode a book payload, handing each page to `on_page` as soon as it is
/// decoded.
///
/// Fails with [`Error::MissingTitle`] when `title` is absent, null or empty.
/// On any error the pages already delivered must be discarded by the caller.
pub fn decode_book_with<R, F>(reader: R, opts: &DecodeOptions, mut on_page: F) -> Result<BookMetadata>
where
    R: Read,
    F: FnMut(BookPage),
{
    let ctx = DecodeContext::new(opts.cancel.as_ref());
    let seed = BookSeed {
        ctx: &ctx,
        opts,
        on_page: &mut on_page,
    };
    let raw = run_seed(reader, &ctx, seed)?;

    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or(Error::MissingTitle)?;

    Ok(BookMetadata {
        title,
        author: raw.author,
        cover: CoverImage::from_payload(raw.cover),
        description: raw.description,
        info: raw.info,
        pdf_url: raw.pdf_url.filter(|u| !u.is_empty()),
    })
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum BookField {
    Title,
    Description,
    Info,
    ImageFile,
    Authors,
    Pages,
    Files,
    #[serde(other)]
    Other,
}

#[derive(Default)]
struct RawBook {
    title: Option<String>,
    author: String,
    cover: Option<String>,
    description: Option<String>,
    info: Option<String>,
    pdf_url: Option<String>,
}

struct BookSeed<'c, 'o, 'f> {
    ctx: &'c DecodeContext<'c>,
    opts: &'o DecodeOptions,
    on_page: &'f mut dyn FnMut(BookPage),
}

impl<'de> DeserializeSeed<'de> for BookSeed<'_, '_, '_> {
    type Value = RawBook;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<RawBook, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for BookSeed<'_, '_, '_> {
    type Value = RawBook;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a book object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawBook, A::Error> {
        let ctx = self.ctx;
        let mut raw = RawBook::default();

        loop {
            ctx.at(super::DOCUMENT);
            let Some(field) = map.next_key::<BookField>()? else {
                break;
            };
            match field {
                BookField::Title => {
                    ctx.at("title");
                    raw.title = map.next_value()?;
                }
                BookField::Description => {
                    ctx.at("description");
                    raw.description = map.next_value()?;
                }
                BookField::Info => {
                    ctx.at("info");
                    raw.info = map.next_value()?;
                }
                BookField::ImageFile => {
                    ctx.at("image_file");
                    raw.cover = map.next_value()?;
                }
                BookField::Authors => {
                    ctx.at("authors");
                    raw.author = map.next_value_seed(AuthorsSeed {
                        ctx,
                        unknown: &self.opts.unknown_author,
                        paths: &BOOK_AUTHORS,
                    })?;
                }
                BookField::Pages => {
                    ctx.at("pages");
                    map.next_value_seed(PagesSeed {
                        ctx,
                        text: &self.opts.text,
                        on_page: &mut *self.on_page,
                    })?;
                }
                BookField::Files => {
                    ctx.at("files");
                    raw.pdf_url = map.next_value_seed(FilesSeed {
                        ctx,
                        paths: &BOOK_FILES,
                    })?;
                }
                BookField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(raw)
    }
}

// ============================================================================
// Authors
// ============================================================================

/// Error-context labels for an authors list at some position.
pub(super) struct AuthorPaths {
    pub(super) list: &'static str,
    pub(super) name: &'static str,
}

const BOOK_AUTHORS: AuthorPaths = AuthorPaths {
    list: "authors",
    name: "authors.name",
};

/// `[{"name": ...}, ...]` joined into one display string.
pub(super) struct AuthorsSeed<'c, 'u> {
    pub(super) ctx: &'c DecodeContext<'c>,
    pub(super) unknown: &'u str,
    pub(super) paths: &'static AuthorPaths,
}

impl<'de> DeserializeSeed<'de> for AuthorsSeed<'_, '_> {
    type Value = String;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<String, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for AuthorsSeed<'_, '_> {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of authors")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<String, E> {
        Ok(String::new())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<String, A::Error> {
        let mut names = Vec::new();
        loop {
            self.ctx.at(self.paths.list);
            let Some(name) = seq.next_element_seed(AuthorSeed {
                ctx: self.ctx,
                name_path: self.paths.name,
            })?
            else {
                break;
            };
            names.push(name.unwrap_or_else(|| self.unknown.to_string()));
        }
        Ok(names.join(", "))
    }
}

struct AuthorSeed<'c> {
    ctx: &'c DecodeContext<'c>,
    name_path: &'static str,
}

impl<'de> DeserializeSeed<'de> for AuthorSeed<'_> {
    type Value = Option<String>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Option<String>, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for AuthorSeed<'_> {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an author object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Option<String>, A::Error> {
        let mut name = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "name" {
                self.ctx.at(self.name_path);
                name = map.next_value::<Option<String>>()?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(name)
    }
}

// ============================================================================
// Pages
// ============================================================================

struct PagesSeed<'c, 'o, 'f> {
    ctx: &'c DecodeContext<'c>,
    text: &'o PlainTextOptions,
    on_page: &'f mut dyn FnMut(BookPage),
}

impl<'de> DeserializeSeed<'de> for PagesSeed<'_, '_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for PagesSeed<'_, '_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of pages")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let mut count = 0usize;
        loop {
            self.ctx.check_cancelled()?;
            self.ctx.at("pages");
            let seed = PageSeed {
                ctx: self.ctx,
                text: self.text,
            };
            let Some(page) = seq.next_element_seed(seed)? else {
                break;
            };
            (self.on_page)(page);
            count += 1;
        }
        log::trace!("Streamed {count} pages");
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum PageField {
    Id,
    Page,
    Part,
    Content,
    #[serde(other)]
    Other,
}

struct PageSeed<'c, 'o> {
    ctx: &'c DecodeContext<'c>,
    text: &'o PlainTextOptions,
}

impl<'de> DeserializeSeed<'de> for PageSeed<'_, '_> {
    type Value = BookPage;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<BookPage, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for PageSeed<'_, '_> {
    type Value = BookPage;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a page object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<BookPage, A::Error> {
        let ctx = self.ctx;
        let mut id = None;
        let mut page = 0;
        let mut part = None;
        let mut content = String::new();

        loop {
            ctx.at("pages");
            let Some(field) = map.next_key::<PageField>()? else {
                break;
            };
            match field {
                PageField::Id => {
                    ctx.at("pages.id");
                    id = Some(map.next_value::<LenientInt>()?.0);
                }
                PageField::Page => {
                    ctx.at("pages.page");
                    if let Some(value) = map.next_value::<Option<LenientInt>>()? {
                        page = value.into_u32::<A::Error>()?;
                    }
                }
                PageField::Part => {
                    ctx.at("pages.part");
                    let value = map.next_value::<Option<Value>>()?;
                    part = resolve_part(value.as_ref());
                    if part.is_none() && value.is_some_and(|v| !v.is_null()) {
                        log::trace!("Unresolvable part on page, using {DEFAULT_PART}");
                    }
                }
                PageField::Content => {
                    ctx.at("pages.content");
                    if let Some(raw) = map.next_value::<Option<String>>()? {
                        content = to_plain_text(&raw, self.text);
                    }
                }
                PageField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        ctx.at("pages.id");
        let id = id.ok_or_else(|| <A::Error as de::Error>::missing_field("id"))?;

        Ok(BookPage {
            id,
            part: part.unwrap_or(DEFAULT_PART),
            page,
            content,
        })
    }
}

// ============================================================================
// Files (alternate formats)
// ============================================================================

/// `{"pdf": {"url": ...}}`, yielding the PDF URL if present.
///
/// Some backends encode an empty object as `[]`; arrays and null mean "no
/// alternate format".
pub(super) struct FilesSeed<'c> {
    pub(super) ctx: &'c DecodeContext<'c>,
    pub(super) paths: &'static FilePaths,
}

/// Error-context labels for a files object at some position.
pub(super) struct FilePaths {
    pub(super) pdf: &'static str,
    pub(super) url: &'static str,
}

const BOOK_FILES: FilePaths = FilePaths {
    pdf: "files.pdf",
    url: "files.pdf.url",
};

impl<'de> DeserializeSeed<'de> for FilesSeed<'_> {
    type Value = Option<String>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Option<String>, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for FilesSeed<'_> {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a files object")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Option<String>, E> {
        Ok(None)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Option<String>, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Option<String>, A::Error> {
        let mut url = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "pdf" {
                self.ctx.at(self.paths.pdf);
                url = map.next_value_seed(PdfLinkSeed {
                    ctx: self.ctx,
                    url_path: self.paths.url,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(url)
    }
}

struct PdfLinkSeed<'c> {
    ctx: &'c DecodeContext<'c>,
    url_path: &'static str,
}

impl<'de> DeserializeSeed<'de> for PdfLinkSeed<'_> {
    type Value = Option<String>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Option<String>, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for PdfLinkSeed<'_> {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a file link object")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Option<String>, E> {
        Ok(None)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Option<String>, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Option<String>, A::Error> {
        let mut url = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "url" {
                self.ctx.at(self.url_path);
                url = map.next_value::<Option<String>>()?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(url)
    }
}
