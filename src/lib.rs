//! # folio
//!
//! An EPUB ingestion and library consistency engine: parse publications
//! into a normalized book representation, detect duplicate acquisitions
//! across import paths, and aggregate reading-session telemetry.
//!
//! ## Features
//!
//! - Read EPUB 2/3 containers: metadata, chapter sequence, table of
//!   contents, cover image
//! - Multi-signal duplicate detection (ISBN, content hash, normalized
//!   title/author) with caller-visible verdicts
//! - Import orchestration with force-override policy and atomic
//!   check-then-insert
//! - Append-only reading-session log with range-filtered queries
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use folio::{Importer, MemoryStore, read_book};
//!
//! // Parse a book without touching any library.
//! let book = read_book("input.epub").unwrap();
//! println!("{} chapters", book.chapters.len());
//!
//! // Import into a library.
//! let importer = Importer::new(Arc::new(MemoryStore::new()));
//! let report = importer.import_from_path("input.epub", false).unwrap();
//! ```
//!
//! ## Working with sessions
//!
//! ```
//! use folio::{BookId, ReadingSession, SessionFilter, SessionLog};
//!
//! let log = SessionLog::new();
//! log.record(ReadingSession { book_id: BookId(1), start: 100, end: 160, pages: Some(4) }).unwrap();
//! assert_eq!(log.total_seconds(&SessionFilter::default()), 60);
//! ```

pub mod book;
pub mod epub;
pub mod error;
pub mod library;
pub(crate) mod util;

pub use book::{BookContent, Chapter, ImportWarning, PackageDescriptor, SuppliedMeta, TocEntry};
pub use epub::{read_book, read_book_from_reader};
pub use error::{Error, Result};
pub use library::{
    BookId, BookPatch, BookRecord, BookStatus, DuplicateVerdict, Fingerprint, Folder, FolderId,
    ImportReport, ImportStatus, Importer, LibraryStore, MatchSignal, MemoryStore, ReadingSession,
    SessionFilter, SessionLog, SignalQuery, StatusCounts, Verdict,
};
