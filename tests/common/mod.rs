//! Shared helper for synthesizing EPUB containers in memory.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum NavKind {
    None,
    Ncx,
    NavDoc,
}

pub struct ChapterSpec {
    pub id: String,
    pub href: String,
    pub title: String,
    pub body: String,
    /// When false, the chapter is declared in the manifest/spine but its
    /// resource is left out of the archive.
    pub present: bool,
}

/// Builds small but structurally valid EPUB containers.
pub struct EpubBuilder {
    title: Option<String>,
    author: Option<String>,
    language: Option<String>,
    isbn: Option<String>,
    chapters: Vec<ChapterSpec>,
    nav: NavKind,
    cover: Option<(String, Vec<u8>)>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self {
            title: None,
            author: None,
            language: None,
            isbn: None,
            chapters: Vec::new(),
            nav: NavKind::Ncx,
            cover: None,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn isbn(mut self, isbn: &str) -> Self {
        self.isbn = Some(isbn.to_string());
        self
    }

    pub fn nav(mut self, nav: NavKind) -> Self {
        self.nav = nav;
        self
    }

    pub fn cover(mut self, href: &str, bytes: &[u8]) -> Self {
        self.cover = Some((href.to_string(), bytes.to_vec()));
        self
    }

    pub fn chapter(mut self, id: &str, title: &str, body: &str) -> Self {
        self.chapters.push(ChapterSpec {
            id: id.to_string(),
            href: format!("{id}.xhtml"),
            title: title.to_string(),
            body: body.to_string(),
            present: true,
        });
        self
    }

    /// Declare a chapter whose resource is missing from the archive.
    pub fn broken_chapter(mut self, id: &str, title: &str) -> Self {
        self.chapters.push(ChapterSpec {
            id: id.to_string(),
            href: format!("{id}.xhtml"),
            title: title.to_string(),
            body: String::new(),
            present: false,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
        )
        .unwrap();

        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(self.generate_opf().as_bytes()).unwrap();

        match self.nav {
            NavKind::Ncx => {
                zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
                zip.write_all(self.generate_ncx().as_bytes()).unwrap();
            }
            NavKind::NavDoc => {
                zip.start_file("OEBPS/nav.xhtml", deflated).unwrap();
                zip.write_all(self.generate_nav_doc().as_bytes()).unwrap();
            }
            NavKind::None => {}
        }

        for chapter in self.chapters.iter().filter(|c| c.present) {
            zip.start_file(format!("OEBPS/{}", chapter.href), deflated)
                .unwrap();
            zip.write_all(
                format!(
                    "<?xml version=\"1.0\"?><html xmlns=\"http://www.w3.org/1999/xhtml\">\
<head><title>{t}</title></head><body><h1>{t}</h1><p>{b}</p></body></html>",
                    t = chapter.title,
                    b = chapter.body
                )
                .as_bytes(),
            )
            .unwrap();
        }

        if let Some((href, bytes)) = &self.cover {
            zip.start_file(format!("OEBPS/{href}"), deflated).unwrap();
            zip.write_all(bytes).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn generate_opf(&self) -> String {
        let mut opf = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
        );
        if let Some(title) = &self.title {
            opf.push_str(&format!("    <dc:title>{title}</dc:title>\n"));
        }
        if let Some(author) = &self.author {
            opf.push_str(&format!("    <dc:creator>{author}</dc:creator>\n"));
        }
        if let Some(language) = &self.language {
            opf.push_str(&format!("    <dc:language>{language}</dc:language>\n"));
        }
        opf.push_str("    <dc:identifier id=\"BookId\">urn:uuid:00000000-0000-4000-8000-000000000000</dc:identifier>\n");
        if let Some(isbn) = &self.isbn {
            opf.push_str(&format!("    <dc:identifier>urn:isbn:{isbn}</dc:identifier>\n"));
        }
        opf.push_str("  </metadata>\n  <manifest>\n");

        match self.nav {
            NavKind::Ncx => opf.push_str(
                "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
            ),
            NavKind::NavDoc => opf.push_str(
                "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
            ),
            NavKind::None => {}
        }
        if let Some((href, _)) = &self.cover {
            opf.push_str(&format!(
                "    <item id=\"cover-image\" href=\"{href}\" media-type=\"image/png\" properties=\"cover-image\"/>\n"
            ));
        }
        for chapter in &self.chapters {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                chapter.id, chapter.href
            ));
        }

        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
        for chapter in &self.chapters {
            opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", chapter.id));
        }
        opf.push_str("  </spine>\n</package>\n");
        opf
    }

    fn generate_ncx(&self) -> String {
        let mut ncx = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
"#,
        );
        for (i, chapter) in self.chapters.iter().enumerate() {
            ncx.push_str(&format!(
                "    <navPoint id=\"navpoint-{i}\" playOrder=\"{}\">\n      <navLabel><text>{}</text></navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n",
                i + 1,
                chapter.title,
                chapter.href
            ));
        }
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }

    fn generate_nav_doc(&self) -> String {
        let mut nav = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body><nav epub:type="toc"><ol>
"#,
        );
        for chapter in &self.chapters {
            nav.push_str(&format!(
                "  <li><a href=\"{}\">{}</a></li>\n",
                chapter.href, chapter.title
            ));
        }
        nav.push_str("</ol></nav></body></html>\n");
        nav
    }
}
