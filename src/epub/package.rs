//! Package descriptor parsing: container.xml pointer plus the OPF package
//! document (metadata block, manifest, spine, cover declaration).

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{ManifestItem, PackageDescriptor, title_from_filename};
use crate::epub::archive::ArchiveReader;
use crate::error::{Error, Result};

/// The navigation resource a package declares, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavResource {
    /// EPUB 3 navigation document (`properties="nav"`).
    NavDoc(String),
    /// EPUB 2 NCX document.
    Ncx(String),
}

/// Locate the OPF path via the fixed-name pointer entry
/// `META-INF/container.xml`.
pub fn locate_package<R: Read + Seek>(archive: &mut ArchiveReader<R>) -> Result<String> {
    let container = archive.read_entry_text("META-INF/container.xml")?;

    let mut reader = Reader::from_str(&container);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::MalformedPackage(e.to_string())),
            _ => {}
        }
    }

    Err(Error::MalformedPackage(
        "no rootfile found in container.xml".into(),
    ))
}

/// Parse an OPF package document into a [`PackageDescriptor`].
///
/// Missing title falls back to a name derived from `fallback_name`; a
/// missing language code defaults to `"en"`. A spine reference that does
/// not resolve in the manifest is a [`Error::MalformedPackage`], since it
/// indicates a structurally broken book.
pub fn parse_package(content: &str, fallback_name: &str) -> Result<PackageDescriptor> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut descriptor = PackageDescriptor::default();
    let mut manifest: HashMap<String, ManifestItem> = HashMap::new();
    let mut spine: Vec<String> = Vec::new();
    let mut identifiers: Vec<(Option<String>, String)> = Vec::new();
    let mut epub2_cover_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut current_scheme: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"language" | b"identifier" | b"publisher"
                    | b"description" | b"date" => {
                        if in_metadata {
                            current_element = Some(String::from_utf8_lossy(local).into_owned());
                            buf_text.clear();
                            current_scheme = None;
                            if local == b"identifier" {
                                for attr in e.attributes().flatten() {
                                    if local_name(attr.key.as_ref()) == b"scheme" {
                                        current_scheme =
                                            Some(String::from_utf8_lossy(&attr.value).into_owned());
                                    }
                                }
                            }
                        }
                    }
                    // item/itemref/meta also appear in the non-self-closed
                    // <item ...></item> form.
                    b"item" => {
                        if let Some((id, item)) = manifest_item(&e) {
                            manifest.insert(id, item);
                        }
                    }
                    b"itemref" => {
                        if let Some(idref) = spine_idref(&e) {
                            spine.push(idref);
                        }
                    }
                    b"meta" => {
                        if let Some(id) = cover_meta(&e) {
                            epub2_cover_id = Some(id);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"item" => {
                        if let Some((id, item)) = manifest_item(&e) {
                            manifest.insert(id, item);
                        }
                    }
                    b"itemref" => {
                        if let Some(idref) = spine_idref(&e) {
                            spine.push(idref);
                        }
                    }
                    b"meta" => {
                        if let Some(id) = cover_meta(&e) {
                            epub2_cover_id = Some(id);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(resolve_entity(&String::from_utf8_lossy(e.as_ref())));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"metadata" {
                    in_metadata = false;
                }

                if let Some(ref elem) = current_element {
                    let text = buf_text.trim().to_string();
                    match elem.as_str() {
                        "title" => {
                            if descriptor.title.is_empty() {
                                descriptor.title = text;
                            }
                        }
                        "creator" => {
                            if !text.is_empty() {
                                descriptor.authors.push(text);
                            }
                        }
                        "language" => descriptor.language = text,
                        "identifier" => identifiers.push((current_scheme.take(), text)),
                        "publisher" => descriptor.publisher = Some(text),
                        "description" => descriptor.description = Some(text),
                        "date" => descriptor.published = Some(text),
                        _ => {}
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::MalformedPackage(e.to_string())),
            _ => {}
        }
    }

    // Primary identifier is the first one; ISBN is harvested from any.
    if let Some((_, first)) = identifiers.first() {
        descriptor.identifier = first.clone();
    }
    descriptor.isbn = identifiers
        .iter()
        .find_map(|(scheme, value)| extract_isbn(scheme.as_deref(), value));

    // Cover: EPUB 3 "cover-image" property takes priority over EPUB 2 meta.
    descriptor.cover_id = manifest
        .iter()
        .find(|(_, item)| item.has_property("cover-image"))
        .map(|(id, _)| id.clone())
        .or_else(|| epub2_cover_id.filter(|id| manifest.contains_key(id)));

    // Documented fallbacks for the many real-world files that omit fields.
    if descriptor.title.is_empty() {
        descriptor.title = title_from_filename(fallback_name);
    }
    if descriptor.language.is_empty() {
        descriptor.language = "en".to_string();
    }

    // Reading-sequence invariant: every spine id resolves in the manifest.
    for id in &spine {
        if !manifest.contains_key(id) {
            return Err(Error::MalformedPackage(format!(
                "spine references unknown manifest id: {id}"
            )));
        }
    }
    if spine.is_empty() {
        return Err(Error::MalformedPackage("package has an empty spine".into()));
    }

    descriptor.manifest = manifest;
    descriptor.spine = spine;
    Ok(descriptor)
}

/// Manifest `<item>`: id plus href, media type, and properties.
fn manifest_item(e: &BytesStart<'_>) -> Option<(String, ManifestItem)> {
    let mut id = String::new();
    let mut item = ManifestItem::default();

    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"id" => id = value,
            b"href" => item.href = value,
            b"media-type" => item.media_type = value,
            b"properties" => item.properties = Some(value),
            _ => {}
        }
    }

    (!id.is_empty()).then_some((id, item))
}

fn spine_idref(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"idref")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// EPUB 2 cover declaration: `<meta name="cover" content="id"/>`.
fn cover_meta(e: &BytesStart<'_>) -> Option<String> {
    let mut is_cover = false;
    let mut cover_id = String::new();

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"name" if attr.value.as_ref() == b"cover" => is_cover = true,
            b"content" => cover_id = String::from_utf8_lossy(&attr.value).into_owned(),
            _ => {}
        }
    }

    (is_cover && !cover_id.is_empty()).then_some(cover_id)
}

/// Find the navigation resource a package declares: the EPUB 3 nav document
/// by manifest property, an NCX by media type, or `toc.ncx` by convention.
/// `None` means the book simply has no table of contents.
pub fn nav_resource(descriptor: &PackageDescriptor) -> Option<NavResource> {
    if let Some(item) = descriptor.manifest.values().find(|i| i.has_property("nav")) {
        return Some(NavResource::NavDoc(item.href.clone()));
    }
    if let Some(item) = descriptor
        .manifest
        .values()
        .find(|i| i.media_type == "application/x-dtbncx+xml")
    {
        return Some(NavResource::Ncx(item.href.clone()));
    }
    None
}

/// Pull an ISBN out of a Dublin Core identifier element: the scheme
/// attribute, a `urn:isbn:` prefix, or a bare 10/13-digit form.
fn extract_isbn(scheme: Option<&str>, value: &str) -> Option<String> {
    let candidate = if scheme.is_some_and(|s| s.eq_ignore_ascii_case("isbn")) {
        value
    } else if let Some(rest) = value
        .strip_prefix("urn:isbn:")
        .or_else(|| value.strip_prefix("URN:ISBN:"))
    {
        rest
    } else {
        value
    };

    let normalized: String = candidate
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let explicit = scheme.is_some_and(|s| s.eq_ignore_ascii_case("isbn"))
        || value.len() != candidate.len();
    let plausible = normalized.len() == 10 || normalized.len() == 13;

    if plausible && (explicit || candidate.chars().all(|c| !c.is_ascii_alphabetic() || c == 'X' || c == 'x')) {
        Some(normalized)
    } else {
        None
    }
}

/// Extract the local name from a potentially namespaced XML name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve the predefined XML entities. Anything else collapses to "".
pub(crate) fn resolve_entity(entity: &str) -> &'static str {
    match entity {
        "apos" => "'",
        "quot" => "\"",
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        _ => "",
    }
}
