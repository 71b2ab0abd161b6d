//! Content extraction: the chapter pass over the reading sequence and the
//! navigation pass over the TOC resource.
//!
//! The two passes are independent orderings: chapters strictly follow spine
//! order, TOC entries follow document order of the navigation resource.

use std::io::{Cursor, Read, Seek};

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::book::{Chapter, ImportWarning, PackageDescriptor, TocEntry, title_from_filename};
use crate::epub::archive::ArchiveReader;
use crate::epub::package::{NavResource, local_name, nav_resource, resolve_entity};
use crate::epub::resolve_path;

/// Run both passes and return `(chapters, toc, warnings)`.
///
/// One unfetchable chapter resource does not abort the book: the chapter is
/// kept with empty content and a warning marker. A missing navigation
/// resource yields an empty TOC.
pub fn extract_content<R: Read + Seek>(
    archive: &mut ArchiveReader<R>,
    descriptor: &PackageDescriptor,
    opf_dir: &str,
) -> (Vec<Chapter>, Vec<TocEntry>, Vec<ImportWarning>) {
    let toc = extract_toc(archive, descriptor, opf_dir);
    let (chapters, warnings) = extract_chapters(archive, descriptor, opf_dir, &toc);
    (chapters, toc, warnings)
}

/// Chapter pass: one [`Chapter`] per spine entry, in spine order.
pub fn extract_chapters<R: Read + Seek>(
    archive: &mut ArchiveReader<R>,
    descriptor: &PackageDescriptor,
    opf_dir: &str,
    toc: &[TocEntry],
) -> (Vec<Chapter>, Vec<ImportWarning>) {
    let mut chapters = Vec::with_capacity(descriptor.spine.len());
    let mut warnings = Vec::new();

    for (order, id) in descriptor.spine.iter().enumerate() {
        let href = descriptor
            .spine_item(id)
            .map(|item| item.href.clone())
            .unwrap_or_default();
        let full_path = resolve_path(opf_dir, &href);

        let extracted = archive
            .read_entry_text(&full_path)
            .ok()
            .and_then(|text| sanitize_fragment(&text));

        let (content, heading, warning) = match extracted {
            Some((fragment, heading)) => (fragment, heading, false),
            None => {
                log::warn!("chapter resource {full_path} could not be extracted");
                warnings.push(ImportWarning::PartialContent { href: href.clone() });
                (String::new(), None, true)
            }
        };

        let title = toc_title_for(toc, &href)
            .or(heading)
            .unwrap_or_else(|| title_from_filename(&href));

        chapters.push(Chapter {
            id: id.clone(),
            title,
            href,
            order,
            content,
            warning,
        });
    }

    (chapters, warnings)
}

/// Navigation pass: parse the declared navigation resource into a flat,
/// depth-levelled TOC. Absence of a navigation resource is not an error.
pub fn extract_toc<R: Read + Seek>(
    archive: &mut ArchiveReader<R>,
    descriptor: &PackageDescriptor,
    opf_dir: &str,
) -> Vec<TocEntry> {
    let Some(nav) = nav_resource(descriptor) else {
        return Vec::new();
    };

    let (href, is_ncx) = match &nav {
        NavResource::NavDoc(href) => (href, false),
        NavResource::Ncx(href) => (href, true),
    };

    let full_path = resolve_path(opf_dir, href);
    let Ok(content) = archive.read_entry_text(&full_path) else {
        log::warn!("navigation resource {full_path} could not be read");
        return Vec::new();
    };

    let parsed = if is_ncx {
        parse_ncx(&content)
    } else {
        parse_nav_doc(&content)
    };
    parsed.unwrap_or_default()
}

/// Title of the TOC entry pointing at `href`, fragment links included.
fn toc_title_for(toc: &[TocEntry], href: &str) -> Option<String> {
    toc.iter()
        .find(|entry| {
            let path = entry.href.split('#').next().unwrap_or(&entry.href);
            path == href
        })
        .map(|entry| entry.title.clone())
}

/// Strip `script`/`style` subtrees and return the body's inner markup plus
/// the text of the first heading element, if any.
///
/// Returns `None` when the document cannot be parsed as XML at all, which
/// the caller treats the same as a fetch failure.
fn sanitize_fragment(document: &str) -> Option<(String, Option<String>)> {
    let mut reader = Reader::from_str(document);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut in_body = false;
    let mut skip_depth = 0usize;
    let mut heading: Option<String> = None;
    let mut heading_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = local_name(e.name().as_ref()).to_ascii_lowercase();

                if skip_depth > 0 || matches!(local.as_slice(), b"script" | b"style") {
                    skip_depth += 1;
                    continue;
                }
                if local == b"body" {
                    in_body = true;
                    continue;
                }
                if in_body {
                    if heading.is_none() && heading_depth == 0 && is_heading(&local) {
                        heading_depth = 1;
                        heading = Some(String::new());
                    } else if heading_depth > 0 {
                        heading_depth += 1;
                    }
                    writer.write_event(Event::Start(e)).ok()?;
                }
            }
            Ok(Event::End(e)) => {
                let local = local_name(e.name().as_ref()).to_ascii_lowercase();

                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                if local == b"body" {
                    in_body = false;
                    continue;
                }
                if heading_depth > 0 {
                    heading_depth -= 1;
                }
                if in_body {
                    writer.write_event(Event::End(e)).ok()?;
                }
            }
            Ok(Event::Empty(e)) => {
                let local = local_name(e.name().as_ref()).to_ascii_lowercase();
                if skip_depth > 0 || matches!(local.as_slice(), b"script" | b"style") {
                    continue;
                }
                if in_body {
                    writer.write_event(Event::Empty(e)).ok()?;
                }
            }
            Ok(Event::Text(e)) => {
                if skip_depth > 0 {
                    continue;
                }
                if heading_depth > 0
                    && let Some(h) = heading.as_mut()
                {
                    h.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                if in_body {
                    writer.write_event(Event::Text(e)).ok()?;
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if skip_depth > 0 {
                    continue;
                }
                let resolved = resolve_entity(&String::from_utf8_lossy(e.as_ref()));
                if heading_depth > 0
                    && let Some(h) = heading.as_mut()
                {
                    h.push_str(resolved);
                }
                if in_body {
                    writer
                        .write_event(Event::Text(quick_xml::events::BytesText::new(resolved)))
                        .ok()?;
                }
            }
            Ok(Event::CData(e)) => {
                if skip_depth == 0 && in_body {
                    writer.write_event(Event::CData(e)).ok()?;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            // Comments, declarations, processing instructions, doctypes.
            Ok(_) => {}
        }
    }

    let bytes = writer.into_inner().into_inner();
    let fragment = String::from_utf8_lossy(&bytes).trim().to_string();
    let heading = heading
        .map(|h| h.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|h| !h.is_empty());
    Some((fragment, heading))
}

fn is_heading(local: &[u8]) -> bool {
    matches!(local, b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6")
}

/// Parse an EPUB 3 navigation document: the `<nav>` with `epub:type="toc"`
/// (or the first untyped one), nested `<ol>` lists, `<a>` leaves.
fn parse_nav_doc(content: &str) -> Option<Vec<TocEntry>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut in_toc_nav = false;
    let mut done = false;
    let mut ol_depth = 0usize;
    let mut link_href: Option<String> = None;
    let mut link_text = String::new();
    let mut link_level = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"nav" if !done && !in_toc_nav => {
                        let mut nav_type: Option<String> = None;
                        for attr in e.attributes().flatten() {
                            if local_name(attr.key.as_ref()) == b"type" {
                                nav_type = Some(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                        in_toc_nav = match nav_type.as_deref() {
                            Some(t) => t.split_ascii_whitespace().any(|t| t == "toc"),
                            None => true,
                        };
                    }
                    b"ol" if in_toc_nav => ol_depth += 1,
                    b"a" if in_toc_nav && ol_depth > 0 => {
                        link_href = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"href")
                            .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                        link_text.clear();
                        link_level = ol_depth - 1;
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if in_toc_nav && link_href.is_some() {
                    link_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_toc_nav && link_href.is_some() {
                    link_text.push_str(resolve_entity(&String::from_utf8_lossy(e.as_ref())));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"nav" if in_toc_nav => {
                        in_toc_nav = false;
                        done = true;
                        ol_depth = 0;
                    }
                    b"ol" if in_toc_nav => ol_depth = ol_depth.saturating_sub(1),
                    b"a" if in_toc_nav => {
                        if let Some(href) = link_href.take() {
                            let title =
                                link_text.split_whitespace().collect::<Vec<_>>().join(" ");
                            if !title.is_empty() {
                                entries.push(TocEntry::new(title, href, link_level));
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    Some(entries)
}

/// Parse an EPUB 2 NCX document: nested `navPoint` elements flattened with
/// level = nesting depth.
fn parse_ncx(content: &str) -> Option<Vec<TocEntry>> {
    struct Frame {
        level: usize,
        title: String,
        src: Option<String>,
        emitted: bool,
    }

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut in_text = false;

    // In well-formed NCX, navLabel and content precede any child navPoint,
    // so flushing on <content> keeps entries in document order.
    let flush = |frames: &mut Vec<Frame>, entries: &mut Vec<TocEntry>| {
        if let Some(frame) = frames.last_mut()
            && !frame.emitted
            && !frame.title.is_empty()
            && let Some(src) = frame.src.clone()
        {
            entries.push(TocEntry::new(frame.title.trim(), src, frame.level));
            frame.emitted = true;
        }
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    flush(&mut frames, &mut entries);
                    frames.push(Frame {
                        level: frames.len(),
                        title: String::new(),
                        src: None,
                        emitted: false,
                    });
                }
                b"text" => in_text = true,
                // Non-self-closed <content></content> form.
                b"content" => {
                    if let Some(frame) = frames.last_mut() {
                        frame.src = content_src(&e);
                    }
                    flush(&mut frames, &mut entries);
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content" {
                    if let Some(frame) = frames.last_mut() {
                        frame.src = content_src(&e);
                    }
                    flush(&mut frames, &mut entries);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(frame) = frames.last_mut() {
                    frame.title.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(frame) = frames.last_mut() {
                    frame
                        .title
                        .push_str(resolve_entity(&String::from_utf8_lossy(e.as_ref())));
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navPoint" => {
                    flush(&mut frames, &mut entries);
                    frames.pop();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    Some(entries)
}

fn content_src(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"src")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}
