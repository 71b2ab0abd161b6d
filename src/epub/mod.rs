//! EPUB container reading: archive access, package descriptor parsing, and
//! content extraction, composed into [`read_book`].

pub mod archive;
pub mod content;
pub mod package;

use std::io::{Read, Seek};
use std::path::Path;

use crate::book::{BookContent, ImportWarning};
use crate::error::Result;

pub use archive::ArchiveReader;
pub use package::{NavResource, locate_package, nav_resource, parse_package};

/// Read an EPUB from disk into a fully extracted [`BookContent`].
///
/// # Example
///
/// ```no_run
/// let book = folio::read_book("path/to/book.epub")?;
/// println!("Title: {}", book.descriptor.title);
/// # Ok::<(), folio::Error>(())
/// ```
pub fn read_book<P: AsRef<Path>>(path: P) -> Result<BookContent> {
    let path = path.as_ref();
    let fallback_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let archive = ArchiveReader::open(path)?;
    read_book_from_archive(archive, &fallback_name)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
///
/// `fallback_name` seeds the filename-derived title when the package
/// metadata omits one.
pub fn read_book_from_reader<R: Read + Seek>(reader: R, fallback_name: &str) -> Result<BookContent> {
    let archive = ArchiveReader::from_reader(reader)?;
    read_book_from_archive(archive, fallback_name)
}

fn read_book_from_archive<R: Read + Seek>(
    mut archive: ArchiveReader<R>,
    fallback_name: &str,
) -> Result<BookContent> {
    // 1. Pointer entry -> package document location.
    let opf_path = locate_package(&mut archive)?;
    let opf_dir = Path::new(&opf_path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    // 2. Descriptor.
    let opf_content = archive.read_entry_text(&opf_path)?;
    let descriptor = parse_package(&opf_content, fallback_name)?;

    // 3. Chapter and navigation passes.
    let (chapters, toc, mut warnings) =
        content::extract_content(&mut archive, &descriptor, &opf_dir);

    // 4. Cover bytes, if declared.
    let cover = match descriptor.cover_href() {
        Some(href) => {
            let full_path = resolve_path(&opf_dir, href);
            match archive.read_entry(&full_path) {
                Ok(bytes) => Some(bytes),
                Err(_) => {
                    warnings.push(ImportWarning::MissingCover {
                        href: href.to_string(),
                    });
                    None
                }
            }
        }
        None => None,
    };

    Ok(BookContent {
        descriptor,
        chapters,
        toc,
        cover,
        warnings,
    })
}

/// Join an href onto the package document's directory.
pub(crate) fn resolve_path(base: &str, href: &str) -> String {
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{base}/{href}")
    }
}
