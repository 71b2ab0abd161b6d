//! Multi-signal fingerprinting and duplicate resolution.
//!
//! ISBN and whole-file content hash are unambiguous signals; a normalized
//! title/author pair alone is weak (reprints and re-encodings share titles
//! but differ materially), so it caps out at probable with reduced
//! confidence and the classification is always surfaced to the caller.

use crate::book::BookContent;
use crate::error::Result;
use crate::library::BookId;
use crate::library::store::{LibraryStore, SignalQuery};

/// The tuple used to recognize the same publication across imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub isbn: Option<String>,
    /// `lowercase+trim+collapse-whitespace(title) + "|" + lowercase+trim(author)`.
    pub normalized_title_author: String,
    /// SHA-1 of the raw file bytes, hex-encoded.
    pub file_hash: String,
    pub file_size: u64,
}

impl Fingerprint {
    /// Compute a candidate fingerprint from parsed content and the raw
    /// container bytes.
    pub fn of(book: &BookContent, file_bytes: &[u8]) -> Self {
        Self {
            isbn: book.descriptor.isbn.clone(),
            normalized_title_author: normalize_title_author(
                &book.descriptor.title,
                book.author(),
            ),
            file_hash: hash_bytes(file_bytes),
            file_size: file_bytes.len() as u64,
        }
    }
}

/// Hex-encoded SHA-1 of raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut sha = sha1_smol::Sha1::new();
    sha.update(bytes);
    sha.digest().to_string()
}

/// Normalize a title/author pair into the weak-match key.
pub fn normalize_title_author(title: &str, author: &str) -> String {
    let title = title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let author = author.trim().to_lowercase();
    format!("{title}|{author}")
}

/// Duplicate classification for a candidate import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum Verdict {
    None,
    Exact,
    Probable,
}

/// Which fingerprint signals matched an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "snake_case"))]
pub enum MatchSignal {
    Isbn,
    TitleAuthorNormalized,
    FileHash,
    FileSizeAndTitle,
}

/// The resolver's answer for one candidate against one library snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct DuplicateVerdict {
    pub verdict: Verdict,
    /// The existing record this candidate collides with, if any.
    pub matched: Option<BookId>,
    pub signals: Vec<MatchSignal>,
    /// In `[0.0, 1.0]`.
    pub confidence: f64,
}

impl DuplicateVerdict {
    pub fn none() -> Self {
        Self {
            verdict: Verdict::None,
            matched: None,
            signals: Vec::new(),
            confidence: 0.0,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.verdict != Verdict::None
    }
}

/// Classify a candidate against the current library snapshot.
///
/// Signals are checked in strict priority order and the first hit wins:
/// ISBN, then file hash (both exact, confidence 1.0), then normalized
/// title/author with equal file size (probable, 0.7), then title/author
/// alone (probable, 0.4). A hash match on one record therefore dominates a
/// title match on another.
///
/// Pure with respect to the store snapshot: two calls without an
/// intervening library mutation yield identical verdicts.
pub fn resolve(candidate: &Fingerprint, store: &dyn LibraryStore) -> Result<DuplicateVerdict> {
    if let Some(isbn) = candidate.isbn.as_deref()
        && let Some(existing) = store.find_by_signal(&SignalQuery::Isbn(isbn))?
    {
        return Ok(DuplicateVerdict {
            verdict: Verdict::Exact,
            matched: Some(existing.id),
            signals: vec![MatchSignal::Isbn],
            confidence: 1.0,
        });
    }

    if let Some(existing) =
        store.find_by_signal(&SignalQuery::FileHash(&candidate.file_hash))?
    {
        return Ok(DuplicateVerdict {
            verdict: Verdict::Exact,
            matched: Some(existing.id),
            signals: vec![MatchSignal::FileHash],
            confidence: 1.0,
        });
    }

    if let Some(existing) = store.find_by_signal(&SignalQuery::TitleAuthor(
        &candidate.normalized_title_author,
    ))? {
        if existing.file_size == candidate.file_size {
            return Ok(DuplicateVerdict {
                verdict: Verdict::Probable,
                matched: Some(existing.id),
                signals: vec![
                    MatchSignal::TitleAuthorNormalized,
                    MatchSignal::FileSizeAndTitle,
                ],
                confidence: 0.7,
            });
        }
        return Ok(DuplicateVerdict {
            verdict: Verdict::Probable,
            matched: Some(existing.id),
            signals: vec![MatchSignal::TitleAuthorNormalized],
            confidence: 0.4,
        });
    }

    Ok(DuplicateVerdict::none())
}
