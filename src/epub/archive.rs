//! Lazy, name-addressed access to an EPUB's zip container.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Error, Result};
use crate::util::{decode_text, extract_xml_encoding, strip_bom};

/// A handle over an open container.
///
/// Entries are fetched lazily by name, in arbitrary order; the archive is
/// never materialized in full. The underlying reader is released when the
/// handle is dropped, on success and error paths alike.
pub struct ArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl ArchiveReader<std::fs::File> {
    /// Open a container from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }
}

impl ArchiveReader<Cursor<Vec<u8>>> {
    /// Open a container over an in-memory buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Open a container from any [`Read`] + [`Seek`] source.
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::CorruptArchive(e.to_string()))?;
        Ok(Self { archive })
    }

    /// Whether an entry with this exact name exists.
    pub fn has_entry(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    /// Read an entry's raw bytes.
    ///
    /// Falls back to the percent-decoded name, since real-world packages
    /// sometimes reference entries by their URL-encoded href.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.read_entry_exact(name) {
            Err(Error::MissingEntry(_)) => {}
            other => return other,
        }

        let decoded = percent_encoding::percent_decode_str(name)
            .decode_utf8()
            .map_err(|_| Error::MissingEntry(name.to_string()))?;
        self.read_entry_exact(&decoded)
    }

    /// Read an entry as text, stripping any BOM and falling back through
    /// the declared encoding to Windows-1252.
    pub fn read_entry_text(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_entry(name)?;
        let bytes = strip_bom(&bytes);
        let hint = extract_xml_encoding(bytes).map(str::to_owned);
        Ok(decode_text(bytes, hint.as_deref()).into_owned())
    }

    fn read_entry_exact(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(Error::MissingEntry(name.to_string()));
            }
            Err(e) => return Err(Error::CorruptArchive(e.to_string())),
        };
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| Error::CorruptArchive(format!("{name}: {e}")))?;
        Ok(contents)
    }
}
