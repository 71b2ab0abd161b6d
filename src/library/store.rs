//! The library store seam.
//!
//! Persistence is an external concern: the engine talks to any
//! [`LibraryStore`] handle injected into it, never to a singleton.
//! [`MemoryStore`] is the reference implementation, used directly in tests
//! and as the backing for ephemeral libraries.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::library::fingerprint::normalize_title_author;
use crate::library::{BookId, BookPatch, BookRecord, BookStatus, Folder, FolderId, StatusCounts};
use crate::util::time_now_secs;

/// A fingerprint signal the store can look up directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQuery<'a> {
    Isbn(&'a str),
    FileHash(&'a str),
    /// Normalized `title|author` key (see
    /// [`normalize_title_author`](crate::library::fingerprint::normalize_title_author)).
    TitleAuthor(&'a str),
}

/// Abstract relational backend for books and folders.
///
/// Implementations must uphold two invariants: deleting a folder clears the
/// `folder_id` of its books rather than deleting them, and `insert_book`
/// rejects a second record with an already-stored file hash (the uniqueness
/// backstop behind the orchestrator's import lock).
pub trait LibraryStore: Send + Sync {
    fn folders(&self) -> Result<Vec<Folder>>;
    fn add_folder(&self, name: &str) -> Result<Folder>;
    fn delete_folder(&self, id: FolderId) -> Result<()>;
    fn rename_folder(&self, id: FolderId, name: &str) -> Result<()>;

    /// All books, or only those in `folder`. Ordered by id.
    fn books(&self, folder: Option<FolderId>) -> Result<Vec<BookRecord>>;
    fn book_counts(&self) -> Result<StatusCounts>;
    /// Insert a record; the store assigns and returns the id (the record's
    /// own `id` field is ignored).
    fn insert_book(&self, book: BookRecord) -> Result<BookId>;
    /// Overwrite the record at `id` wholesale, keeping the id. The file-hash
    /// uniqueness backstop applies against all other records.
    fn replace_book(&self, id: BookId, book: BookRecord) -> Result<()>;
    fn update_book(&self, id: BookId, patch: BookPatch) -> Result<()>;
    fn delete_book(&self, id: BookId) -> Result<()>;

    /// First record matching the given fingerprint signal.
    fn find_by_signal(&self, signal: &SignalQuery<'_>) -> Result<Option<BookRecord>>;
}

#[derive(Default)]
struct Inner {
    books: BTreeMap<i64, BookRecord>,
    folders: Vec<Folder>,
    next_book_id: i64,
    next_folder_id: i64,
}

/// In-memory [`LibraryStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-mutation; propagating the panic
        // is the only sound option for an in-memory store.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LibraryStore for MemoryStore {
    fn folders(&self) -> Result<Vec<Folder>> {
        Ok(self.lock().folders.clone())
    }

    fn add_folder(&self, name: &str) -> Result<Folder> {
        let mut inner = self.lock();
        if inner.folders.iter().any(|f| f.name == name) {
            return Err(Error::Store(format!("folder name already in use: {name}")));
        }
        inner.next_folder_id += 1;
        let folder = Folder {
            id: FolderId(inner.next_folder_id),
            name: name.to_string(),
        };
        inner.folders.push(folder.clone());
        Ok(folder)
    }

    fn delete_folder(&self, id: FolderId) -> Result<()> {
        let mut inner = self.lock();
        let before = inner.folders.len();
        inner.folders.retain(|f| f.id != id);
        if inner.folders.len() == before {
            return Err(Error::Store(format!("no such folder: {}", id.0)));
        }
        // Book existence is independent of folder existence: membership is
        // cleared, never cascaded.
        for book in inner.books.values_mut() {
            if book.folder_id == Some(id) {
                book.folder_id = None;
            }
        }
        Ok(())
    }

    fn rename_folder(&self, id: FolderId, name: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.folders.iter().any(|f| f.name == name && f.id != id) {
            return Err(Error::Store(format!("folder name already in use: {name}")));
        }
        match inner.folders.iter_mut().find(|f| f.id == id) {
            Some(folder) => {
                folder.name = name.to_string();
                Ok(())
            }
            None => Err(Error::Store(format!("no such folder: {}", id.0))),
        }
    }

    fn books(&self, folder: Option<FolderId>) -> Result<Vec<BookRecord>> {
        let inner = self.lock();
        Ok(inner
            .books
            .values()
            .filter(|b| folder.is_none() || b.folder_id == folder)
            .cloned()
            .collect())
    }

    fn book_counts(&self) -> Result<StatusCounts> {
        let inner = self.lock();
        let mut counts = StatusCounts::default();
        for book in inner.books.values() {
            match book.status {
                BookStatus::Unread => counts.unread += 1,
                BookStatus::Reading => counts.reading += 1,
                BookStatus::OnHold => counts.on_hold += 1,
                BookStatus::Finished => counts.finished += 1,
            }
        }
        Ok(counts)
    }

    fn insert_book(&self, mut book: BookRecord) -> Result<BookId> {
        let mut inner = self.lock();
        if inner
            .books
            .values()
            .any(|b| !b.file_hash.is_empty() && b.file_hash == book.file_hash)
        {
            log::warn!("insert rejected by file-hash uniqueness backstop");
            return Err(Error::Store("duplicate file hash".into()));
        }
        inner.next_book_id += 1;
        let id = BookId(inner.next_book_id);
        book.id = id;
        inner.books.insert(id.0, book);
        Ok(id)
    }

    fn replace_book(&self, id: BookId, mut book: BookRecord) -> Result<()> {
        let mut inner = self.lock();
        if inner
            .books
            .values()
            .any(|b| b.id != id && !b.file_hash.is_empty() && b.file_hash == book.file_hash)
        {
            log::warn!("replace rejected by file-hash uniqueness backstop");
            return Err(Error::Store("duplicate file hash".into()));
        }
        if !inner.books.contains_key(&id.0) {
            return Err(Error::Store(format!("no such book: {}", id.0)));
        }
        book.id = id;
        inner.books.insert(id.0, book);
        Ok(())
    }

    fn update_book(&self, id: BookId, patch: BookPatch) -> Result<()> {
        let mut inner = self.lock();
        let book = inner
            .books
            .get_mut(&id.0)
            .ok_or_else(|| Error::Store(format!("no such book: {}", id.0)))?;

        if let Some(title) = patch.title {
            book.title = title;
        }
        if let Some(authors) = patch.authors {
            book.authors = authors;
        }
        if let Some(progress) = patch.progress {
            book.progress = progress.clamp(0.0, 1.0);
        }
        if let Some(status) = patch.status {
            book.status = status;
        }
        if let Some(folder_id) = patch.folder_id {
            book.folder_id = folder_id;
        }
        book.updated_at = time_now_secs();
        Ok(())
    }

    fn delete_book(&self, id: BookId) -> Result<()> {
        match self.lock().books.remove(&id.0) {
            Some(_) => Ok(()),
            None => Err(Error::Store(format!("no such book: {}", id.0))),
        }
    }

    fn find_by_signal(&self, signal: &SignalQuery<'_>) -> Result<Option<BookRecord>> {
        let inner = self.lock();
        let found = inner.books.values().find(|b| match signal {
            SignalQuery::Isbn(isbn) => b.isbn.as_deref() == Some(*isbn),
            SignalQuery::FileHash(hash) => !hash.is_empty() && b.file_hash == *hash,
            SignalQuery::TitleAuthor(key) => {
                normalize_title_author(&b.title, b.author()) == **key
            }
        });
        Ok(found.cloned())
    }
}
