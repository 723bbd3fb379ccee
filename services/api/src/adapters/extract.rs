//! services/api/src/adapters/extract.rs
//!
//! This module contains the document text extractor. It implements the
//! `DocumentExtractor` port for PDF files, Office Open XML slide decks and word
//! documents, and plain text.

use async_trait::async_trait;
use courseware_core::ingest::FileKind;
use courseware_core::{DocumentExtractor, MediaFile, PortError, PortResult};
use regex::Regex;
use std::io::{Cursor, Read};
use std::sync::OnceLock;
use zip::ZipArchive;

fn slide_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("static extraction pattern"))
}

fn slide_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<a:t>([^<]*)</a:t>").expect("static extraction pattern"))
}

fn word_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("static extraction pattern"))
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Extracts text from uploaded documents on the blocking thread pool.
#[derive(Clone, Default)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentExtractor for FileTextExtractor {
    async fn extract(&self, kind: FileKind, file: &MediaFile) -> PortResult<String> {
        let data = file.data.clone();
        let text = tokio::task::spawn_blocking(move || match kind {
            FileKind::Pdf => pdf_text(&data),
            FileKind::SlideDeck => slide_deck_text(&data),
            FileKind::Document => word_document_text(&data),
            FileKind::LegacySlideDeck | FileKind::PlainText => {
                Ok(String::from_utf8_lossy(&data).into_owned())
            }
            FileKind::Media => Err(PortError::Unsupported(
                "media files are described by the generation service".to_string(),
            )),
        })
        .await
        .map_err(|e| PortError::Unexpected(format!("Extraction task failed: {}", e)))??;

        Ok(text.trim().to_string())
    }
}

//=========================================================================================
// Format Readers
//=========================================================================================

fn pdf_text(data: &[u8]) -> PortResult<String> {
    pdf_extract::extract_text_from_mem(data)
        .map_err(|e| PortError::Unsupported(format!("Unreadable PDF: {}", e)))
}

fn open_archive(data: &[u8]) -> PortResult<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(data))
        .map_err(|e| PortError::Unsupported(format!("Not an Office Open XML package: {}", e)))
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> PortResult<String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| PortError::Unsupported(format!("Missing {}: {}", name, e)))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    Ok(xml)
}

/// One `[Slide N]: ...` block per slide, in slide order.
fn slide_deck_text(data: &[u8]) -> PortResult<String> {
    let mut archive = open_archive(data)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = slide_name_re().captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    // Lexical order would put slide10 before slide2.
    slides.sort_by_key(|(number, _)| *number);

    let mut text = String::new();
    for (number, name) in slides {
        let xml = read_entry(&mut archive, &name)?;
        let runs: Vec<String> = slide_text_re()
            .captures_iter(&xml)
            .map(|c| unescape_xml(&c[1]))
            .collect();
        text.push_str(&format!("[Slide {}]: {}\n\n", number, runs.join(" ")));
    }
    Ok(text)
}

fn word_document_text(data: &[u8]) -> PortResult<String> {
    let mut archive = open_archive(data)?;
    let xml = read_entry(&mut archive, "word/document.xml")?;

    let paragraphs: Vec<String> = xml
        .split("</w:p>")
        .map(|paragraph| {
            word_text_re()
                .captures_iter(paragraph)
                .map(|c| unescape_xml(&c[1]))
                .collect::<String>()
        })
        .filter(|p| !p.trim().is_empty())
        .collect();
    Ok(paragraphs.join("\n"))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn package(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn slides_are_read_in_numeric_order() {
        let deck = package(&[
            ("ppt/slides/slide10.xml", "<p:sld><a:t>Ten</a:t></p:sld>"),
            ("ppt/slides/slide2.xml", "<p:sld><a:t>Two</a:t><a:t>Parts</a:t></p:sld>"),
            ("ppt/slides/_rels/slide2.xml.rels", "<Relationships/>"),
        ]);

        let text = slide_deck_text(&deck).unwrap();
        assert_eq!(text, "[Slide 2]: Two Parts\n\n[Slide 10]: Ten\n\n");
    }

    #[test]
    fn word_paragraphs_become_lines() {
        let doc = package(&[(
            "word/document.xml",
            "<w:body><w:p><w:r><w:t>Cells &amp; </w:t></w:r><w:r><w:t xml:space=\"preserve\">tissues</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Organs</w:t></w:r></w:p></w:body>",
        )]);

        assert_eq!(word_document_text(&doc).unwrap(), "Cells & tissues\nOrgans");
    }

    #[test]
    fn non_zip_documents_are_unsupported() {
        assert!(matches!(
            word_document_text(b"\xD0\xCF\x11\xE0legacy"),
            Err(PortError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn plain_text_is_decoded_lossily() {
        let file = MediaFile {
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            data: b"  photosynthesis \xFF ".to_vec(),
        };
        let text = FileTextExtractor::new()
            .extract(FileKind::PlainText, &file)
            .await
            .unwrap();
        assert_eq!(text, "photosynthesis \u{FFFD}");
    }
}
