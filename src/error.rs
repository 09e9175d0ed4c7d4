//! Error types for the pdf2md-batch library.
//!
//! Two error types mirror two failure scopes:
//!
//! * [`Pdf2MdError`]: a step of the batch could not complete: the output
//!   directory cannot be created, a document cannot be parsed, an engine
//!   cannot be built. Whether it aborts the batch or only one document is
//!   decided by the caller ([`crate::batch`] catches it per document).
//!
//! * [`PageError`]: a single page was skipped by a conversion engine. The
//!   rest of the document is still converted.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2md-batch library.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Directory errors ──────────────────────────────────────────────────
    /// The input directory does not exist or cannot be listed.
    #[error("Cannot read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output or image directory could not be created.
    #[error("Cannot create directory '{path}': {source}")]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be opened or its object graph parsed.
    #[error("PDF '{path}' cannot be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium failed to rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// pdfium could not read the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// The engine produced no usable page at all.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory), place the\n\
library next to the working directory, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// An extracted image could not be written.
    #[error("Failed to write image '{path}': {source}")]
    ImageWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create, write or append to a Markdown output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Engines log it and move on to the next page; the document only fails
/// when every page ends up here.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation or PNG encoding failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The single LLM call for this page failed.
    #[error("Page {page}: LLM call failed: {detail}")]
    LlmFailed { page: usize, detail: String },
}
