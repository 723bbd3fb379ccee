//! crates/courseware_core/src/ingest.rs
//!
//! File ingestion into the course context. Documents go through a
//! `DocumentExtractor`, media through the generation service. A failing file is
//! recorded inline with an error marker and never stops the remaining files.

use crate::context_files::{append_file, append_file_error};
use crate::domain::MediaFile;
use crate::ports::{DocumentExtractor, GenerationService, PortResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const EXTRACTION_FAILED_NOTE: &str =
    "[System note: this file could not be parsed. It may be encrypted or in an unusual format.]";

const MEDIA_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "mp4", "mov", "avi", "wmv"];

/// How an uploaded file is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    SlideDeck,
    LegacySlideDeck,
    Document,
    Media,
    PlainText,
}

impl FileKind {
    pub fn classify(name: &str, mime_type: &str) -> Self {
        let lower = name.to_lowercase();
        let extension = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

        if mime_type == "application/pdf" || extension == "pdf" {
            FileKind::Pdf
        } else if extension == "pptx" {
            FileKind::SlideDeck
        } else if extension == "ppt" {
            FileKind::LegacySlideDeck
        } else if extension == "docx" || extension == "doc" {
            FileKind::Document
        } else if mime_type.starts_with("image/")
            || mime_type.starts_with("video/")
            || mime_type.starts_with("audio/")
            || MEDIA_EXTENSIONS.contains(&extension)
        {
            FileKind::Media
        } else {
            FileKind::PlainText
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub ingested: Vec<String>,
    pub failed: Vec<String>,
}

pub struct Ingestor {
    extractor: Arc<dyn DocumentExtractor>,
    generator: Arc<dyn GenerationService>,
}

impl Ingestor {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, generator: Arc<dyn GenerationService>) -> Self {
        Self { extractor, generator }
    }

    /// Extracts every file in order and appends it to `field` under its marker.
    pub async fn ingest(&self, field: &mut String, files: &[MediaFile]) -> IngestReport {
        let mut report = IngestReport::default();
        for (i, file) in files.iter().enumerate() {
            info!(file = %file.name, "Ingesting file {}/{}", i + 1, files.len());
            match self.extract(file).await {
                Ok(text) => {
                    append_file(field, &file.name, &text);
                    report.ingested.push(file.name.clone());
                }
                Err(e) => {
                    warn!(file = %file.name, "Failed to extract file: {}", e);
                    append_file_error(field, &file.name, EXTRACTION_FAILED_NOTE);
                    report.failed.push(file.name.clone());
                }
            }
        }
        report
    }

    async fn extract(&self, file: &MediaFile) -> PortResult<String> {
        let kind = FileKind::classify(&file.name, &file.mime_type);
        match kind {
            FileKind::Media => self.generator.describe_media(file).await,
            FileKind::LegacySlideDeck => {
                let text = self.extractor.extract(kind, file).await?;
                Ok(format!(
                    "[Note: {} is a legacy PPT file and could only be partially parsed. Save it as .pptx for better results.]{}",
                    file.name, text
                ))
            }
            _ => self.extractor.extract(kind, file).await,
        }
    }
}
