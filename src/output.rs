//! Result types: the rendered representation of one document and the
//! per-document / per-batch reports.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of a conversion engine for one document.
///
/// Lives only for the duration of a single
/// [`crate::pipeline::markdown::convert_document`] call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderedDocument {
    /// Engine that produced this document (`"vision"`, `"text_layer"`, …).
    pub engine: String,
    /// Pages in document order. Skipped pages are absent.
    pub pages: Vec<RenderedPage>,
    /// Pages the engine was unable to convert.
    pub skipped_pages: usize,
}

/// One converted page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Cleaned Markdown for this page.
    pub markdown: String,
    /// Prompt tokens billed for this page (0 for offline engines).
    pub input_tokens: usize,
    /// Completion tokens billed for this page (0 for offline engines).
    pub output_tokens: usize,
    /// Wall-clock time spent on this page.
    pub duration_ms: u64,
}

impl RenderedDocument {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            pages: Vec::new(),
            skipped_pages: 0,
        }
    }
}

/// What the Document Converter achieved for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Text was written to the Markdown file.
    Converted { pages: usize, chars: usize },
    /// Conversion failed softly; the Markdown file is empty.
    Failed { reason: String },
    /// The converter never ran because an earlier step failed.
    NotAttempted,
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }
}

/// Everything that happened to one input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub markdown_path: PathBuf,
    /// Generated image file names, in page-then-index order.
    pub images: Vec<String>,
    pub conversion: ConversionOutcome,
    /// Set when image extraction or reference appending failed.
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DocumentReport {
    pub fn new(source: PathBuf, markdown_path: PathBuf) -> Self {
        Self {
            source,
            markdown_path,
            images: Vec::new(),
            conversion: ConversionOutcome::NotAttempted,
            error: None,
            duration_ms: 0,
        }
    }

    /// `true` when the document hit a hard failure.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary of a full batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn discovered(&self) -> usize {
        self.documents.len()
    }

    /// Documents whose text was converted and that hit no hard failure.
    pub fn converted(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| !d.is_failed() && d.conversion.is_converted())
            .count()
    }

    /// Documents whose conversion failed softly.
    pub fn soft_failed(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| !d.is_failed() && matches!(d.conversion, ConversionOutcome::Failed { .. }))
            .count()
    }

    /// Documents with a hard failure (extraction or append).
    pub fn failed(&self) -> usize {
        self.documents.iter().filter(|d| d.is_failed()).count()
    }

    pub fn total_images(&self) -> usize {
        self.documents.iter().map(|d| d.images.len()).sum()
    }
}
