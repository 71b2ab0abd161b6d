//! Import orchestration: parse, duplicate-check, persist.
//!
//! One request moves through `Pending -> Parsing -> DuplicateCheck ->
//! {Blocked | Persisting} -> Done`, with `Failed` reachable from any state.
//! Parsing runs outside the import lock and touches no shared state, so an
//! abandoned request before Persisting leaves no persisted side effects.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::book::{BookContent, ImportWarning, SuppliedMeta};
use crate::epub::read_book_from_reader;
use crate::error::{Error, Result};
use crate::library::fingerprint::{self, DuplicateVerdict, Fingerprint, MatchSignal, Verdict};
use crate::library::store::LibraryStore;
use crate::library::{BookId, BookRecord, BookStatus};
use crate::util::{detect_image_format, time_now_secs};

/// Terminal outcome of an import request.
#[derive(Debug, Clone)]
pub enum ImportStatus {
    /// The book was persisted.
    Done(BookRecord),
    /// The candidate collides with an existing record. Not an error: the
    /// verdict is surfaced so the caller can offer an informed override.
    Blocked(DuplicateVerdict),
}

/// Result of one import request.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub status: ImportStatus,
    /// Non-fatal extraction problems (broken chapters, missing cover).
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    pub fn book(&self) -> Option<&BookRecord> {
        match &self.status {
            ImportStatus::Done(book) => Some(book),
            ImportStatus::Blocked(_) => None,
        }
    }

    pub fn verdict(&self) -> Option<&DuplicateVerdict> {
        match &self.status {
            ImportStatus::Blocked(verdict) => Some(verdict),
            ImportStatus::Done(_) => None,
        }
    }
}

/// Orchestrates single imports against an injected store handle.
///
/// The whole DuplicateCheck -> Persisting sequence runs under one lock, so
/// concurrent imports of the same file cannot both pass the check; the
/// store's file-hash uniqueness constraint backs this up.
pub struct Importer {
    store: Arc<dyn LibraryStore>,
    covers_dir: Option<PathBuf>,
    import_lock: Mutex<()>,
}

impl Importer {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self {
            store,
            covers_dir: None,
            import_lock: Mutex::new(()),
        }
    }

    /// Persist extracted covers into `dir` (created on demand).
    pub fn with_covers_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.covers_dir = Some(dir.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn LibraryStore> {
        &self.store
    }

    /// Import a publication from disk.
    pub fn import_from_path<P: AsRef<Path>>(&self, path: P, force: bool) -> Result<ImportReport> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.import(
            bytes,
            path.to_string_lossy().into_owned(),
            &file_name,
            SuppliedMeta::default(),
            force,
        )
    }

    /// Import a publication from an in-memory buffer, with optional
    /// caller-supplied metadata overriding the parsed fields.
    pub fn import_from_buffer(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        supplied: SuppliedMeta,
        force: bool,
    ) -> Result<ImportReport> {
        self.import(bytes, file_name.to_string(), file_name, supplied, force)
    }

    /// Classify a candidate fingerprint against the current library
    /// snapshot without importing anything.
    pub fn check_duplicate(&self, candidate: &Fingerprint) -> Result<DuplicateVerdict> {
        fingerprint::resolve(candidate, self.store.as_ref())
    }

    fn import(
        &self,
        bytes: Vec<u8>,
        file_path: String,
        file_name: &str,
        supplied: SuppliedMeta,
        force: bool,
    ) -> Result<ImportReport> {
        log::debug!("import {file_path}: Pending -> Parsing");
        let mut book = read_book_from_reader(Cursor::new(&bytes), file_name)?;
        apply_supplied_meta(&mut book, supplied);
        let candidate = Fingerprint::of(&book, &bytes);

        // DuplicateCheck and Persisting are atomic with respect to other
        // imports; the verdict is always computed fresh under the lock.
        let _guard = self.import_lock.lock().unwrap_or_else(|e| e.into_inner());
        log::debug!("import {file_path}: Parsing -> DuplicateCheck");
        let verdict = fingerprint::resolve(&candidate, self.store.as_ref())?;

        if verdict.is_duplicate() && !force {
            log::warn!(
                "import {file_path}: DuplicateCheck -> Blocked ({:?}, confidence {})",
                verdict.verdict,
                verdict.confidence
            );
            return Ok(ImportReport {
                status: ImportStatus::Blocked(verdict),
                warnings: book.warnings.clone(),
            });
        }

        log::debug!("import {file_path}: DuplicateCheck -> Persisting");
        let record = self.persist(&book, &candidate, &file_path, force, &verdict)?;
        log::debug!("import {file_path}: Persisting -> Done");

        Ok(ImportReport {
            status: ImportStatus::Done(record),
            warnings: book.warnings.clone(),
        })
    }

    /// Storage write plus cover extraction as a single logical unit: if
    /// either sub-step fails, no partial record stays visible.
    fn persist(
        &self,
        book: &BookContent,
        candidate: &Fingerprint,
        file_path: &str,
        force: bool,
        verdict: &DuplicateVerdict,
    ) -> Result<BookRecord> {
        // A forced re-import of byte-identical content replaces the matched
        // record in place: the id stays stable, so sessions and folder
        // membership keyed on it survive.
        let replaced = if force
            && verdict.verdict == Verdict::Exact
            && verdict.signals.contains(&MatchSignal::FileHash)
            && let Some(old_id) = verdict.matched
        {
            Some(self.record_by_id(old_id)?)
        } else {
            None
        };

        let cover_path = self.write_cover(book, candidate)?;

        let now = time_now_secs();
        let record = BookRecord {
            id: BookId(0),
            identifier: book.descriptor.identifier.clone(),
            title: book.descriptor.title.clone(),
            authors: book.descriptor.authors.clone(),
            language: book.descriptor.language.clone(),
            description: book.descriptor.description.clone(),
            publisher: book.descriptor.publisher.clone(),
            isbn: book.descriptor.isbn.clone(),
            published: book.descriptor.published.clone(),
            file_path: file_path.to_string(),
            file_size: candidate.file_size,
            file_hash: candidate.file_hash.clone(),
            cover_path: cover_path.clone(),
            progress: 0.0,
            status: BookStatus::Unread,
            folder_id: None,
            created_at: now,
            updated_at: now,
        };

        let stored = match &replaced {
            Some(old) => {
                // Reading state is part of the record's identity, not of the
                // source file; it carries over to the replacement.
                let merged = BookRecord {
                    id: old.id,
                    progress: old.progress,
                    status: old.status,
                    folder_id: old.folder_id,
                    created_at: old.created_at,
                    ..record
                };
                self.store
                    .replace_book(old.id, merged.clone())
                    .map(|()| merged)
            }
            None => self
                .store
                .insert_book(record.clone())
                .map(|id| BookRecord { id, ..record }),
        };

        match stored {
            Ok(saved) => Ok(saved),
            Err(e) => {
                // The cover file must not outlive a failed write, unless the
                // replaced record already owned that same file.
                let owned_by_old = replaced
                    .as_ref()
                    .and_then(|old| old.cover_path.as_deref())
                    == cover_path.as_deref();
                if let Some(path) = &cover_path
                    && !owned_by_old
                {
                    let _ = std::fs::remove_file(path);
                }
                Err(Error::ImportFailed(e.to_string()))
            }
        }
    }

    fn record_by_id(&self, id: BookId) -> Result<BookRecord> {
        let books = self
            .store
            .books(None)
            .map_err(|e| Error::ImportFailed(e.to_string()))?;
        books
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::ImportFailed(format!("matched record {} vanished", id.0)))
    }

    /// Write the extracted cover (if any) into the covers directory, named
    /// by file hash with a sniffed extension.
    fn write_cover(&self, book: &BookContent, candidate: &Fingerprint) -> Result<Option<String>> {
        let (Some(dir), Some(cover)) = (&self.covers_dir, &book.cover) else {
            return Ok(None);
        };

        let href = book.descriptor.cover_href().unwrap_or_default();
        let format = detect_image_format(href, cover);
        let path = dir.join(format!("{}.{}", candidate.file_hash, format.extension()));

        std::fs::create_dir_all(dir).map_err(|e| Error::ImportFailed(e.to_string()))?;
        std::fs::write(&path, cover).map_err(|e| Error::ImportFailed(e.to_string()))?;
        Ok(Some(path.to_string_lossy().into_owned()))
    }
}

fn apply_supplied_meta(book: &mut BookContent, supplied: SuppliedMeta) {
    if let Some(title) = supplied.title {
        book.descriptor.title = title;
    }
    if let Some(author) = supplied.author {
        book.descriptor.authors = vec![author];
    }
}
