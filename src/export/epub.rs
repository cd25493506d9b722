//! EPUB writer.
//!
//! Creates EPUB 3 files (with an NCX for EPUB 2 readers) from composed
//! documents. Every chapter becomes one XHTML file; spine and navigation
//! both follow chapter order.

use std::io::{self, Seek, Write};

use quick_xml::escape::escape;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{Document, DocumentChapter, DocumentWriter};

/// Configuration for EPUB output.
#[derive(Debug, Clone, Default)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
    /// `dc:identifier` of the package. A placeholder URN is used when unset.
    pub identifier: Option<String>,
    /// `dcterms:modified` timestamp (`YYYY-MM-DDThh:mm:ssZ`).
    pub modified: Option<String>,
}

impl EpubConfig {
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9));
        self
    }
}

/// EPUB format writer.
///
/// # Example
///
/// ```no_run
/// use ketab2epub::export::{Document, DocumentWriter, EpubConfig, EpubWriter};
/// use std::io::Cursor;
///
/// let doc = Document {
///     title: "Kitab".into(),
///     author: String::new(),
///     language: "ar".into(),
///     cover: None,
///     chapters: Vec::new(),
/// };
/// let mut out = Cursor::new(Vec::new());
/// EpubWriter::new()
///     .with_config(EpubConfig::default().with_identifier("urn:example:1"))
///     .write(&doc, &mut out)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct EpubWriter {
    config: EpubConfig,
}

impl EpubWriter {
    /// Create a new writer with default configuration.
    pub fn new() -> Self {
        Self {
            config: EpubConfig::default(),
        }
    }

    /// Configure the writer with custom settings.
    pub fn with_config(mut self, config: EpubConfig) -> Self {
        self.config = config;
        self
    }

    fn identifier(&self) -> &str {
        self.config
            .identifier
            .as_deref()
            .unwrap_or("urn:uuid:00000000-0000-0000-0000-000000000000")
    }
}

impl Default for EpubWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter for EpubWriter {
    fn write<W: Write + Seek>(&self, doc: &Document, out: &mut W) -> io::Result<()> {
        let mut zip = ZipWriter::new(out);

        let compression_level = self.config.compression_level.unwrap_or(6);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level as i64));

        // 1. Write mimetype (must be first, uncompressed)
        zip.start_file("mimetype", stored).map_err(io_error)?;
        zip.write_all(b"application/epub+zip")?;

        // 2. Write container.xml
        zip.start_file("META-INF/container.xml", deflated)
            .map_err(io_error)?;
        zip.write_all(CONTAINER_XML)?;

        // 3. Build manifest
        let mut manifest_items = vec![ManifestItem {
            id: "nav".to_string(),
            href: "nav.xhtml".to_string(),
            media_type: "application/xhtml+xml",
            properties: Some("nav"),
        }];
        let cover_href = doc.cover_href();
        if let (Some(cover), Some(href)) = (&doc.cover, &cover_href) {
            manifest_items.push(ManifestItem {
                id: "cover-image".to_string(),
                href: href.clone(),
                media_type: cover.media_type,
                properties: Some("cover-image"),
            });
        }
        let mut spine_refs = Vec::with_capacity(doc.chapters.len());
        for i in 0..doc.chapters.len() {
            let id = chapter_id(i);
            manifest_items.push(ManifestItem {
                id: id.clone(),
                href: chapter_href(i),
                media_type: "application/xhtml+xml",
                properties: None,
            });
            spine_refs.push(id);
        }

        // 4. Write content.opf
        let opf = generate_opf(doc, self.identifier(), self.modified(), &manifest_items, &spine_refs);
        zip.start_file("OEBPS/content.opf", deflated)
            .map_err(io_error)?;
        zip.write_all(opf.as_bytes())?;

        // 5. Write toc.ncx and nav.xhtml
        let ncx = generate_ncx(doc, self.identifier());
        zip.start_file("OEBPS/toc.ncx", deflated)
            .map_err(io_error)?;
        zip.write_all(ncx.as_bytes())?;

        let nav = generate_nav(doc);
        zip.start_file("OEBPS/nav.xhtml", deflated)
            .map_err(io_error)?;
        zip.write_all(nav.as_bytes())?;

        // 6. Write chapters
        for (i, chapter) in doc.chapters.iter().enumerate() {
            let zip_path = format!("OEBPS/{}", chapter_href(i));
            zip.start_file(&zip_path, deflated).map_err(io_error)?;
            zip.write_all(chapter_xhtml(chapter, &doc.language).as_bytes())?;
        }

        // 7. Write cover image (already compressed, store as-is)
        if let (Some(cover), Some(href)) = (&doc.cover, &cover_href) {
            zip.start_file(format!("OEBPS/{href}"), stored)
                .map_err(io_error)?;
            zip.write_all(&cover.bytes)?;
        }

        zip.finish().map_err(io_error)?;
        Ok(())
    }
}

impl EpubWriter {
    fn modified(&self) -> &str {
        self.config
            .modified
            .as_deref()
            .unwrap_or("2024-01-01T00:00:00Z")
    }
}

/// Convert zip error to io error.
fn io_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::other(e)
}

/// Container.xml template.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Stylesheet embedded in every chapter.
const CHAPTER_CSS: &str = r#"body { direction: DIR; text-align: ALIGN; unicode-bidi: isolate; }
      p, h1, h2 { direction: DIR; text-align: ALIGN; unicode-bidi: plaintext; }
      span[dir="ltr"] { direction: ltr; unicode-bidi: embed; }
      img { max-width: 100%; }"#;

struct ManifestItem {
    id: String,
    /// Relative to `OEBPS/`.
    href: String,
    media_type: &'static str,
    properties: Option<&'static str>,
}

fn chapter_id(index: usize) -> String {
    format!("chapter_{}", index)
}

fn chapter_href(index: usize) -> String {
    format!("chapter_{}.xhtml", index)
}

/// Whether `language` is written right to left.
pub(crate) fn is_rtl(language: &str) -> bool {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(
        primary.as_str(),
        "ar" | "fa" | "he" | "ur" | "ps" | "yi" | "ckb" | "dv" | "sd" | "ug"
    )
}

/// Generate content.opf.
fn generate_opf(
    doc: &Document,
    identifier: &str,
    modified: &str,
    manifest: &[ManifestItem],
    spine_refs: &[String],
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape(&doc.title)));
    if !doc.author.is_empty() {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape(&doc.author)
        ));
    }
    let language = if doc.language.is_empty() {
        "en"
    } else {
        doc.language.as_str()
    };
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape(language)
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape(identifier)
    ));
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        escape(modified)
    ));
    if doc.cover.is_some() {
        // EPUB 2 readers look for the cover here
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }
    opf.push_str("  </metadata>\n");

    // Manifest
    opf.push_str("  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    for item in manifest {
        let properties = item
            .properties
            .map(|p| format!(" properties=\"{}\"", p))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape(&item.id),
            escape(&item.href),
            item.media_type,
            properties
        ));
    }
    opf.push_str("  </manifest>\n");

    // Spine
    let direction = if is_rtl(language) { "rtl" } else { "ltr" };
    opf.push_str(&format!(
        "  <spine toc=\"ncx\" page-progression-direction=\"{}\">\n",
        direction
    ));
    for id in spine_refs {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape(id)));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

/// Generate toc.ncx with one flat navPoint per chapter.
fn generate_ncx(doc: &Document, identifier: &str) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape(identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape(&doc.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, chapter) in doc.chapters.iter().enumerate() {
        let play_order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navPoint-{}\" playOrder=\"{}\">\n",
            play_order, play_order
        ));
        ncx.push_str(&format!(
            "      <navLabel><text>{}</text></navLabel>\n",
            escape(&chapter.title)
        ));
        ncx.push_str(&format!("      <content src=\"{}\"/>\n", chapter_href(i)));
        ncx.push_str("    </navPoint>\n");
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

/// Generate the EPUB 3 navigation document.
fn generate_nav(doc: &Document) -> String {
    let mut nav = xhtml_head(&doc.title, &doc.language);
    nav.push_str("    <nav epub:type=\"toc\" id=\"toc\">\n      <ol>\n");
    for (i, chapter) in doc.chapters.iter().enumerate() {
        nav.push_str(&format!(
            "        <li><a href=\"{}\">{}</a></li>\n",
            chapter_href(i),
            escape(&chapter.title)
        ));
    }
    nav.push_str("      </ol>\n    </nav>\n  </body>\n</html>\n");
    nav
}

fn chapter_xhtml(chapter: &DocumentChapter, language: &str) -> String {
    let mut xhtml = xhtml_head(&chapter.title, language);
    xhtml.push_str("    <section epub:type=\"chapter\">\n      ");
    xhtml.push_str(&chapter.body);
    xhtml.push_str("\n    </section>\n  </body>\n</html>\n");
    xhtml
}

/// Everything up to and including `<body>`.
fn xhtml_head(title: &str, language: &str) -> String {
    let (dir, align) = if is_rtl(language) {
        ("rtl", "right")
    } else {
        ("ltr", "left")
    };
    let css = CHAPTER_CSS.replace("DIR", dir).replace("ALIGN", align);
    let language = escape(language);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{language}" lang="{language}" dir="{dir}">
  <head>
    <meta charset="UTF-8"/>
    <title>{title}</title>
    <style>
      {css}
    </style>
  </head>
  <body>
"#,
        title = escape(title),
    )
}
