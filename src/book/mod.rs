use std::collections::HashMap;

/// Normalized package descriptor: the typed view of an EPUB's OPF package
/// document (metadata block, manifest, ordered reading sequence).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct PackageDescriptor {
    /// Unique identifier from the metadata block (may be a urn:uuid or ISBN).
    pub identifier: String,
    pub title: String,
    /// Ordered; may be empty for anonymous works.
    pub authors: Vec<String>,
    /// BCP 47 language code; defaults to "en" when the package omits it.
    pub language: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    /// ISBN harvested from identifier elements, digits and X only.
    pub isbn: Option<String>,
    pub published: Option<String>,
    /// Maps manifest id -> manifest item (href, media-type, properties).
    pub manifest: HashMap<String, ManifestItem>,
    /// Reading sequence (spine): manifest ids in linear reading order.
    /// Every id here resolves in `manifest`.
    pub spine: Vec<String>,
    /// Manifest id of the cover image, if declared.
    pub cover_id: Option<String>,
}

impl PackageDescriptor {
    /// Resolve a spine id to its manifest item.
    pub fn spine_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.get(id)
    }

    /// Href of the declared cover image, if any.
    pub fn cover_href(&self) -> Option<&str> {
        self.cover_id
            .as_deref()
            .and_then(|id| self.manifest.get(id))
            .map(|item| item.href.as_str())
    }
}

/// A single manifest entry.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
    /// Space-separated EPUB3 properties ("nav", "cover-image", ...).
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == name))
    }
}

/// One extracted chapter. Created once per import, immutable afterward;
/// re-imports regenerate the whole sequence.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Chapter {
    /// Manifest id of the source resource.
    pub id: String,
    /// Derived from the TOC, a leading heading, or the file name.
    pub title: String,
    /// Resource path inside the container.
    pub href: String,
    /// 0-based position in the reading sequence; contiguous, no gaps.
    pub order: usize,
    /// Sanitized HTML fragment (script/style stripped). Empty when the
    /// resource could not be fetched; `warning` is set in that case.
    pub content: String,
    /// Set when extraction of this chapter failed and the content is empty.
    pub warning: bool,
}

/// A flattened table-of-contents entry.
///
/// Entries appear in document order of the navigation resource; `level` is
/// the nesting depth (0 for top-level entries).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct TocEntry {
    pub title: String,
    /// Resource path plus optional `#fragment`.
    pub href: String,
    pub level: usize,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>, level: usize) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            level,
        }
    }
}

/// The full parsed book: descriptor plus extracted reading content.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct BookContent {
    pub descriptor: PackageDescriptor,
    /// One per spine entry, in spine order.
    pub chapters: Vec<Chapter>,
    /// Flattened TOC; empty when the book has no navigation resource.
    pub toc: Vec<TocEntry>,
    /// Raw bytes of the cover image, if the descriptor declares one and the
    /// resource exists.
    #[cfg_attr(feature = "cli", serde(skip))]
    pub cover: Option<Vec<u8>>,
    /// Non-fatal problems encountered during extraction.
    pub warnings: Vec<ImportWarning>,
}

impl BookContent {
    /// Primary author, or "Unknown" when the package names none.
    pub fn author(&self) -> &str {
        self.descriptor
            .authors
            .first()
            .map(String::as_str)
            .unwrap_or("Unknown")
    }
}

/// Non-fatal problems attached to an otherwise successful parse or import.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum ImportWarning {
    /// A chapter resource could not be fetched or decoded; the chapter was
    /// kept with empty content.
    PartialContent { href: String },
    /// The declared cover resource is missing from the archive.
    MissingCover { href: String },
}

/// Caller-supplied metadata overrides for buffer imports. Parsed metadata
/// fills whatever the caller leaves as `None`.
#[derive(Debug, Clone, Default)]
pub struct SuppliedMeta {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Derive a human-readable title from a file name: strip the extension,
/// turn `_` and `-` separators into spaces.
pub fn title_from_filename(name: &str) -> String {
    let stem = std::path::Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let cleaned: String = stem
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        "Untitled".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("war_and_peace.epub"), "war and peace");
        assert_eq!(title_from_filename("Moby-Dick.epub"), "Moby Dick");
        assert_eq!(title_from_filename("plain.epub"), "plain");
        assert_eq!(title_from_filename(""), "Untitled");
    }

    #[test]
    fn test_manifest_properties() {
        let item = ManifestItem {
            href: "nav.xhtml".into(),
            media_type: "application/xhtml+xml".into(),
            properties: Some("nav scripted".into()),
        };
        assert!(item.has_property("nav"));
        assert!(!item.has_property("cover-image"));
    }

    #[test]
    fn test_cover_href_resolution() {
        let mut descriptor = PackageDescriptor::default();
        descriptor.manifest.insert(
            "cov".into(),
            ManifestItem {
                href: "images/cover.jpg".into(),
                media_type: "image/jpeg".into(),
                properties: None,
            },
        );
        descriptor.cover_id = Some("cov".into());
        assert_eq!(descriptor.cover_href(), Some("images/cover.jpg"));

        descriptor.cover_id = Some("nope".into());
        assert_eq!(descriptor.cover_href(), None);
    }

    #[test]
    fn test_author_fallback() {
        let book = BookContent::default();
        assert_eq!(book.author(), "Unknown");
    }
}
