//! End-to-end conversion tests.
//!
//! Payloads are written to a temp directory the way a downloader would leave
//! them (zipped data, raw JSON index), converted, and the produced EPUB is
//! read back.

use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lopdf::{Object, dictionary};
use quick_xml::Reader;
use quick_xml::events::Event;
use tempfile::TempDir;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use ketab2epub::{BookId, BookType, ConvertConfig, Converter, DownloadTracker, Error, Sources};

const BOOK_JSON: &str = r#"{
    "title": "Kitab al-Test",
    "description": "A short book",
    "authors": [{"name": "Ibn Test"}, {"name": "Abu Sample"}],
    "files": {"pdf": {"url": "https://files.example.org/pdf/42.zip"}},
    "pages": [
        {"id": 10, "part": 1, "page": 1, "content": "<p>one</p>"},
        {"id": 11, "part": 1, "page": 2, "content": "<p>two</p>"},
        {"id": 20, "part": 1, "page": 3, "content": "<p>three</p>"},
        {"id": 30, "part": 2, "page": 1, "content": "<p>four</p>"}
    ]
}"#;

const INDEX_PART_1: &str = r#"{
    "status": true,
    "code": 200,
    "data": [
        {"title": "Second", "page_id": 20, "page": 3},
        {"title": "First", "page_id": 10, "page": 1}
    ]
}"#;

const INDEX_PART_2: &str = r#"{
    "status": true,
    "code": 200,
    "data": [{"title": "Third", "page_id": "30", "page": 1}]
}"#;

// ============================================================================
// Helpers
// ============================================================================

fn write_zipped(path: &Path, entry: &str, contents: &str) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    zip.start_file(entry, SimpleFileOptions::default()).unwrap();
    zip.write_all(contents.as_bytes()).unwrap();
    zip.finish().unwrap();
}

fn sources(dir: &TempDir) -> Sources {
    let data = dir.path().join("42.data.zip");
    write_zipped(&data, "42.json", BOOK_JSON);

    let part1 = dir.path().join("42.index.1.json");
    let part2 = dir.path().join("42.index.2.json");
    fs::write(&part1, INDEX_PART_1).unwrap();
    fs::write(&part2, INDEX_PART_2).unwrap();

    Sources {
        data,
        index: vec![part1, part2],
        pdf: None,
    }
}

fn open_epub(path: &Path) -> ZipArchive<Cursor<Vec<u8>>> {
    ZipArchive::new(Cursor::new(fs::read(path).unwrap())).unwrap()
}

fn read_entry(zip: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut out = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut out).unwrap();
    out
}

/// `idref`s of the spine, in order.
fn spine_idrefs(opf: &str) -> Vec<String> {
    let mut reader = Reader::from_str(opf);
    reader.config_mut().trim_text(true);
    let mut refs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"itemref" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"idref" {
                        refs.push(String::from_utf8(attr.value.to_vec()).unwrap());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => panic!("bad OPF: {e}"),
            _ => {}
        }
    }
    refs
}

fn english() -> ConvertConfig {
    ConvertConfig::from_toml(
        r#"
        language = "en"
        default_title = "Untitled"

        [epub]
        modified = "2024-01-01T00:00:00Z"
        "#,
    )
    .unwrap()
}

// ============================================================================
// EPUB
// ============================================================================

#[test]
fn test_convert_epub_writes_ordered_chapters() {
    let dir = TempDir::new().unwrap();
    let sources = sources(&dir);
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();

    let converter = Converter::new(english());
    let path = converter.convert(BookType::Epub(BookId(42)), &sources, &out).unwrap();
    assert_eq!(path, out.join("Kitab al-Test.epub"));

    let mut zip = open_epub(&path);
    assert_eq!(zip.by_index(0).unwrap().name(), "mimetype");

    // Info chapter, then one chapter per index entry in page order
    let opf = read_entry(&mut zip, "OEBPS/content.opf");
    assert_eq!(
        spine_idrefs(&opf),
        vec!["chapter_0", "chapter_1", "chapter_2", "chapter_3"]
    );
    assert!(opf.contains("urn:ketabonline:book:42"));
    assert!(opf.contains("<dc:creator>Ibn Test, Abu Sample</dc:creator>"));
    assert!(opf.contains("page-progression-direction=\"ltr\""));

    let first = read_entry(&mut zip, "OEBPS/chapter_1.xhtml");
    assert!(first.contains("<title>First</title>"));
    assert!(first.contains("one"));
    assert!(first.contains("two"));
    assert!(!first.contains("three"));

    let second = read_entry(&mut zip, "OEBPS/chapter_2.xhtml");
    assert!(second.contains("<title>Second</title>"));
    assert!(second.contains("three"));

    let third = read_entry(&mut zip, "OEBPS/chapter_3.xhtml");
    assert!(third.contains("<title>Third</title>"));
    assert!(third.contains("four"));

    let nav = read_entry(&mut zip, "OEBPS/nav.xhtml");
    let positions: Vec<usize> = ["First", "Second", "Third"]
        .iter()
        .map(|t| nav.find(t).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_convert_epub_without_index_is_single_chapter() {
    let dir = TempDir::new().unwrap();
    let mut sources = sources(&dir);
    sources.index.clear();

    let converter = Converter::new(english());
    let path = converter
        .convert_epub(BookId(42), &sources, dir.path())
        .unwrap();

    let mut zip = open_epub(&path);
    let opf = read_entry(&mut zip, "OEBPS/content.opf");
    assert_eq!(spine_idrefs(&opf).len(), 2);

    let body = read_entry(&mut zip, "OEBPS/chapter_1.xhtml");
    assert!(body.contains("<title>Untitled</title>"));
    for text in ["one", "two", "three", "four"] {
        assert!(body.contains(text), "missing {text}");
    }
}

#[test]
fn test_rejected_index_part_stops_paging() {
    let dir = TempDir::new().unwrap();
    let sources = sources(&dir);
    fs::write(&sources.index[1], r#"{"status": false, "code": 404, "data": []}"#).unwrap();

    let index = Converter::new(english()).load_index(&sources.index).unwrap();
    let titles: Vec<&str> = index.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Second", "First"]);
}

#[test]
fn test_arabic_defaults_are_rtl() {
    let dir = TempDir::new().unwrap();
    let sources = sources(&dir);

    let path = Converter::new(ConvertConfig::default())
        .convert_epub(BookId(42), &sources, dir.path())
        .unwrap();

    let mut zip = open_epub(&path);
    let opf = read_entry(&mut zip, "OEBPS/content.opf");
    assert!(opf.contains("page-progression-direction=\"rtl\""));
    let chapter = read_entry(&mut zip, "OEBPS/chapter_1.xhtml");
    assert!(chapter.contains("dir=\"rtl\""));
    assert!(chapter.contains("[م 1 ص 1 ]"));
}

#[test]
fn test_failed_decode_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let mut sources = sources(&dir);
    let broken = dir.path().join("broken.json");
    fs::write(&broken, r#"{"title": "Broken", "pages": [{"id": 1, "content": "x"}, {"id":"#).unwrap();
    sources.data = broken;

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let err = Converter::new(english())
        .convert_epub(BookId(1), &sources, &out)
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }), "{err:?}");
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_missing_data_file() {
    let dir = TempDir::new().unwrap();
    let sources = Sources {
        data: dir.path().join("nope.json"),
        ..Sources::default()
    };
    let err = Converter::new(english())
        .convert_epub(BookId(1), &sources, dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::ResourceUnavailable { .. }));
}

// ============================================================================
// PDF
// ============================================================================

/// A one-page PDF.
fn minimal_pdf() -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn pdf_sources(dir: &TempDir) -> Sources {
    let mut sources = sources(dir);
    let pdf = dir.path().join("42.pdf.zip");
    let encoded = STANDARD.encode(minimal_pdf());
    write_zipped(
        &pdf,
        "42.json",
        &format!(
            r#"[{{"id": 42, "title": "Kitab", "author": "Ibn Test", "producer": "ketabonline", "pdf_file": "data:application/pdf;base64,{encoded}"}}]"#
        ),
    );
    sources.pdf = Some(pdf);
    sources
}

fn info_string(doc: &lopdf::Document, key: &[u8]) -> String {
    let id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_object(id).unwrap().as_dict().unwrap();
    match info.get(key).unwrap() {
        Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
        other => panic!("unexpected {key:?}: {other:?}"),
    }
}

#[test]
fn test_extract_pdf_sets_document_info() {
    let dir = TempDir::new().unwrap();
    let sources = pdf_sources(&dir);

    let path = Converter::new(english())
        .convert(BookType::Pdf(BookId(42)), &sources, dir.path())
        .unwrap();
    assert_eq!(path, dir.path().join("Kitab al-Test.pdf"));

    let doc = lopdf::Document::load(&path).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(info_string(&doc, b"Title"), "Kitab");
    assert_eq!(info_string(&doc, b"Author"), "Ibn Test");
    assert_eq!(info_string(&doc, b"Producer"), "ketabonline");
    assert_eq!(info_string(&doc, b"OriginalID"), "42");
}

#[test]
fn test_extract_pdf_rejects_corrupt_pdf() {
    let dir = TempDir::new().unwrap();
    let mut sources = sources(&dir);
    let pdf = dir.path().join("bad.json");
    // "not a pdf" in base64
    fs::write(&pdf, r#"[{"id": 1, "pdf_file": "bm90IGEgcGRm"}]"#).unwrap();
    sources.pdf = Some(pdf);

    let err = Converter::new(english())
        .extract_pdf(&sources, dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::Pdf(_)), "{err:?}");
    assert!(!dir.path().join("Kitab al-Test.pdf").exists());
}

#[test]
fn test_extract_pdf_requires_payload() {
    let dir = TempDir::new().unwrap();
    let sources = sources(&dir);

    let err = Converter::new(english())
        .extract_pdf(&sources, dir.path())
        .unwrap_err();
    assert!(
        matches!(&err, Error::ResourceUnavailable { path, .. }
            if *path == PathBuf::from("https://files.example.org/pdf/42.zip")),
        "{err:?}"
    );
}

#[test]
fn test_extract_pdf_without_url() {
    let dir = TempDir::new().unwrap();
    let mut sources = pdf_sources(&dir);
    let data = dir.path().join("plain.json");
    fs::write(&data, r#"{"title": "No PDF", "pages": []}"#).unwrap();
    sources.data = data;

    let err = Converter::new(english())
        .extract_pdf(&sources, dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::MissingPdfUrl));
}

// ============================================================================
// Download status
// ============================================================================

#[test]
fn test_tracker_records_conversion() {
    let dir = TempDir::new().unwrap();
    let sources = sources(&dir);
    let tracker = DownloadTracker::open(dir.path().join("status.json")).unwrap();
    let book = BookType::Epub(BookId(42));
    let updates = tracker.observe(book);

    Converter::new(english())
        .convert(book, &sources, dir.path())
        .unwrap();
    tracker.mark_downloaded(book, true).unwrap();

    assert_eq!(updates.try_iter().collect::<Vec<_>>(), vec![false, true]);
    let reopened = DownloadTracker::open(tracker.path()).unwrap();
    assert!(reopened.is_downloaded(book));
    assert!(!reopened.is_downloaded(BookType::Pdf(BookId(42))));
}
