//! Error types for folio operations.

use thiserror::Error;

/// Errors that can occur while ingesting a publication or recording
/// reading telemetry.
///
/// Parser and archive failures are mapped into this closed set at the
/// boundary so callers can branch on kind rather than message text.
#[derive(Error, Debug)]
pub enum Error {
    /// The container's central directory could not be located or an entry
    /// failed its checksum. Fatal for the import.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// A named entry does not exist in the container.
    #[error("missing entry: {0}")]
    MissingEntry(String),

    /// The package descriptor is structurally invalid (no rootfile, spine
    /// reference without a manifest entry, unparseable XML).
    #[error("malformed package: {0}")]
    MalformedPackage(String),

    /// A reading session whose end precedes its start.
    #[error("invalid interval: end {end} precedes start {start}")]
    InvalidInterval { start: i64, end: i64 },

    /// Persistence failed after a successful parse. No partial record is
    /// left visible to the caller.
    #[error("import failed: {0}")]
    ImportFailed(String),

    /// A store-level failure outside the import path (folder or book CRUD).
    #[error("store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
