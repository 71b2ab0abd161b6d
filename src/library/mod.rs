//! Library-side model and engine: persisted records, the store seam, the
//! duplicate resolver, the import orchestrator, and reading sessions.

pub mod fingerprint;
pub mod import;
pub mod sessions;
pub mod store;

pub use fingerprint::{DuplicateVerdict, Fingerprint, MatchSignal, Verdict, resolve};
pub use import::{ImportReport, ImportStatus, Importer};
pub use sessions::{ReadingSession, SessionFilter, SessionLog};
pub use store::{LibraryStore, MemoryStore, SignalQuery};

/// Persisted identity of a book. Assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BookId(pub i64);

/// Persisted identity of a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct FolderId(pub i64);

/// Reading status of a book in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum BookStatus {
    #[default]
    Unread,
    Reading,
    OnHold,
    Finished,
}

/// Per-status book counts across the library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct StatusCounts {
    pub unread: usize,
    pub reading: usize,
    pub on_hold: usize,
    pub finished: usize,
}

/// A book as persisted by the library store.
///
/// The engine produces and validates these; their storage lifetime is owned
/// by the store.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BookRecord {
    pub id: BookId,
    pub identifier: String,
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    pub published: Option<String>,
    /// Source file location.
    pub file_path: String,
    /// Source file size in bytes.
    pub file_size: u64,
    /// SHA-1 of the raw file bytes, hex-encoded.
    pub file_hash: String,
    /// Persisted cover image location, if a cover was extracted.
    pub cover_path: Option<String>,
    /// Reading progress in `[0.0, 1.0]`.
    pub progress: f64,
    pub status: BookStatus,
    /// Optional folder membership. Cleared, never cascaded, when the folder
    /// is deleted.
    pub folder_id: Option<FolderId>,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
    pub updated_at: i64,
}

impl BookRecord {
    /// Primary author, or "Unknown" when the record names none.
    pub fn author(&self) -> &str {
        self.authors.first().map(String::as_str).unwrap_or("Unknown")
    }
}

/// Fields the caller may change on an existing book. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub progress: Option<f64>,
    pub status: Option<BookStatus>,
    /// `Some(None)` clears the folder, `Some(Some(id))` moves the book.
    pub folder_id: Option<Option<FolderId>>,
}

/// A named folder grouping books. Names are unique per library.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
}
