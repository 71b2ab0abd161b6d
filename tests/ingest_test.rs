//! Parse-level properties of the ingestion pipeline.

mod common;

use std::io::Cursor;

use common::{EpubBuilder, NavKind};
use folio::{ImportWarning, read_book, read_book_from_reader};

fn parse(builder: &EpubBuilder) -> folio::BookContent {
    read_book_from_reader(Cursor::new(builder.build()), "fixture.epub").unwrap()
}

#[test]
fn chapters_match_reading_sequence() {
    let builder = EpubBuilder::new()
        .title("Three Chapters")
        .author("A. Writer")
        .chapter("ch1", "One", "first")
        .chapter("ch2", "Two", "second")
        .chapter("ch3", "Three", "third");
    let book = parse(&builder);

    assert_eq!(book.chapters.len(), book.descriptor.spine.len());
    assert_eq!(book.chapters.len(), 3);
    // Order indices are 0..n-1 with no gaps.
    for (i, chapter) in book.chapters.iter().enumerate() {
        assert_eq!(chapter.order, i);
    }
    assert_eq!(book.chapters[0].title, "One");
    assert!(book.chapters[1].content.contains("second"));
}

#[test]
fn chapter_content_is_sanitized() {
    let builder = EpubBuilder::new()
        .title("Sanitized")
        .chapter("ch1", "One", "text<script>alert(1)</script> more");
    let book = parse(&builder);
    // Body markup survives, script subtrees do not.
    assert!(book.chapters[0].content.contains("text"));
    assert!(book.chapters[0].content.contains("more"));
    assert!(!book.chapters[0].content.contains("script"));
    assert!(!book.chapters[0].content.contains("alert"));
}

#[test]
fn missing_nav_yields_empty_toc_and_full_chapters() {
    let builder = EpubBuilder::new()
        .title("No TOC")
        .nav(NavKind::None)
        .chapter("ch1", "One", "body");
    let book = parse(&builder);

    assert!(book.toc.is_empty());
    assert_eq!(book.chapters.len(), 1);
    assert!(!book.chapters[0].content.is_empty());
}

#[test]
fn ncx_and_nav_doc_produce_equivalent_tocs() {
    let ncx = parse(
        &EpubBuilder::new()
            .title("T")
            .nav(NavKind::Ncx)
            .chapter("ch1", "One", "a")
            .chapter("ch2", "Two", "b"),
    );
    let nav = parse(
        &EpubBuilder::new()
            .title("T")
            .nav(NavKind::NavDoc)
            .chapter("ch1", "One", "a")
            .chapter("ch2", "Two", "b"),
    );

    assert_eq!(ncx.toc, nav.toc);
    assert_eq!(ncx.toc.len(), 2);
    assert_eq!(ncx.toc[0].title, "One");
    assert_eq!(ncx.toc[0].href, "ch1.xhtml");
    assert_eq!(ncx.toc[0].level, 0);
}

#[test]
fn broken_chapter_keeps_slot_with_warning() {
    let builder = EpubBuilder::new()
        .title("Partial")
        .chapter("ch1", "One", "fine")
        .broken_chapter("ch2", "Gone")
        .chapter("ch3", "Three", "also fine");
    let book = parse(&builder);

    assert_eq!(book.chapters.len(), 3);
    assert!(!book.chapters[0].warning);
    assert!(book.chapters[1].warning);
    assert!(book.chapters[1].content.is_empty());
    assert!(!book.chapters[2].warning);
    assert_eq!(book.chapters[2].order, 2);
    assert!(
        book.warnings
            .iter()
            .any(|w| matches!(w, ImportWarning::PartialContent { href } if href == "ch2.xhtml"))
    );
}

#[test]
fn metadata_fallbacks_apply() {
    let builder = EpubBuilder::new().chapter("ch1", "One", "body");
    let book = read_book_from_reader(Cursor::new(builder.build()), "the_lost_title.epub").unwrap();

    assert_eq!(book.descriptor.title, "the lost title");
    assert_eq!(book.author(), "Unknown");
    assert_eq!(book.descriptor.language, "en");
}

#[test]
fn isbn_is_harvested_from_identifiers() {
    let builder = EpubBuilder::new()
        .title("With ISBN")
        .isbn("978-0-345-39180-3")
        .chapter("ch1", "One", "body");
    let book = parse(&builder);
    assert_eq!(book.descriptor.isbn.as_deref(), Some("9780345391803"));
}

#[test]
fn cover_bytes_are_extracted() {
    let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    let builder = EpubBuilder::new()
        .title("Covered")
        .cover("cover.png", &png)
        .chapter("ch1", "One", "body");
    let book = parse(&builder);
    assert_eq!(book.cover.as_deref(), Some(&png[..]));
}

#[test]
fn read_book_from_disk() {
    let builder = EpubBuilder::new()
        .title("On Disk")
        .author("A. Writer")
        .chapter("ch1", "One", "body");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("on_disk.epub");
    std::fs::write(&path, builder.build()).unwrap();

    let book = read_book(&path).unwrap();
    assert_eq!(book.descriptor.title, "On Disk");
    assert_eq!(book.chapters.len(), 1);
}

#[test]
fn junk_bytes_are_a_corrupt_archive() {
    let result = read_book_from_reader(Cursor::new(b"garbage".to_vec()), "junk.epub");
    assert!(matches!(result, Err(folio::Error::CorruptArchive(_))));
}
