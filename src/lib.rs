//! # pdf2md-batch
//!
//! Batch-convert a directory of PDF documents into Markdown, extracting every
//! embedded image alongside.
//!
//! ## Layout
//!
//! ```text
//! input/                       markdown/
//!  ├─ report.pdf      ──▶       ├─ report.md
//!  └─ slides.pdf      ──▶       ├─ slides.md
//!                               └─ images/
//!                                   ├─ report_p1_0.png
//!                                   ├─ report_p3_0.jpeg
//!                                   └─ slides_p2_1.png
//! ```
//!
//! Every `.md` file holds the converted text of its document, followed by one
//! `![Image](images/<name>)` block per extracted image in page order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! for each input/*.pdf (sorted):
//!  ├─ 1. Images   lopdf walks image XObjects → markdown/images/
//!  ├─ 2. Convert  pdfium + VLM (or pdfium text layer) → markdown/<stem>.md
//!  │              failures are soft: logged, the .md stays empty
//!  └─ 3. Append   image references, one block per image
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_batch::{run_batch, BatchConfig, EngineKind, ProcessEnvironment};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     ProcessEnvironment::single_threaded().apply();
//!
//!     let config = BatchConfig::builder()
//!         .engine(EngineKind::TextLayer)
//!         .build()?;
//!     let report = run_batch(&config)?;
//!     eprintln!("{} converted, {} images", report.converted(), report.total_images());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-batch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! pdf2md-batch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod environment;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{run_batch, run_batch_with};
pub use config::{BatchConfig, BatchConfigBuilder, EngineKind, VisionOptions};
pub use environment::ProcessEnvironment;
pub use error::{PageError, Pdf2MdError};
pub use output::{BatchReport, ConversionOutcome, DocumentReport, RenderedDocument, RenderedPage};
pub use pipeline::engine::{
    text_from_rendered, ConversionEngine, DefaultEngineFactory, EngineFactory, TextLayerEngine, VisionEngine,
};
pub use pipeline::images::extract_images;
pub use pipeline::markdown::{append_image_references, convert_document};
pub use pipeline::render::bind_pdfium;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
