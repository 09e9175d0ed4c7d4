//! Batch orchestration: every PDF in the input directory, one after another.
//!
//! For each document the steps are strictly ordered:
//!
//! ```text
//! extract_images ──▶ convert_document ──▶ append_image_references
//!   (hard error)        (soft, never errors)   (hard error, skipped if no images)
//! ```
//!
//! A hard error stops the remaining steps of that document only. It is logged,
//! recorded in the document's [`DocumentReport::error`], and the batch carries
//! on with the next file. Only setup failures (output directories, reading the
//! input directory) make the whole run return `Err`.

use crate::config::BatchConfig;
use crate::error::Pdf2MdError;
use crate::output::{BatchReport, DocumentReport};
use crate::pipeline::engine::{DefaultEngineFactory, EngineFactory};
use crate::pipeline::images::extract_images;
use crate::pipeline::input::{discover_inputs, prepare_directories};
use crate::pipeline::markdown::{append_image_references, convert_document};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Run the batch with engines built from `config`.
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport, Pdf2MdError> {
    let factory = DefaultEngineFactory::from_config(config);
    run_batch_with(config, &factory)
}

/// Run the batch with a caller-supplied engine factory.
pub fn run_batch_with(config: &BatchConfig, factory: &dyn EngineFactory) -> Result<BatchReport, Pdf2MdError> {
    let start = Instant::now();
    let image_dir = config.image_dir();
    prepare_directories(&config.output_dir, &image_dir)?;
    let inputs = discover_inputs(&config.input_dir)?;

    let callback: ProgressCallback = config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback));
    let total = inputs.len();
    let mut report = BatchReport::default();

    if inputs.is_empty() {
        warn!("No PDF files found in {}", config.input_dir.display());
    } else {
        info!(
            "Found {} PDF(s) in {} → {} (engine: {})",
            total,
            config.input_dir.display(),
            config.output_dir.display(),
            config.engine.as_str()
        );
    }
    callback.on_batch_start(total);

    for (i, pdf_path) in inputs.iter().enumerate() {
        let index = i + 1;
        let name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("[{}/{}] Processing {}", index, total, name);
        callback.on_document_start(index, total, &name);

        let document = process_document(config, factory, pdf_path, &image_dir);
        match document.error {
            Some(ref e) => callback.on_document_error(index, total, e),
            None => callback.on_document_complete(index, total, &document),
        }
        report.documents.push(document);
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    if total > 0 {
        info!(
            "Batch finished in {:.1}s: {} converted, {} conversion failure(s), {} aborted, {} image(s)",
            report.duration_ms as f64 / 1000.0,
            report.converted(),
            report.soft_failed(),
            report.failed(),
            report.total_images()
        );
    }
    callback.on_batch_complete(&report);
    Ok(report)
}

fn process_document(
    config: &BatchConfig,
    factory: &dyn EngineFactory,
    pdf_path: &Path,
    image_dir: &Path,
) -> DocumentReport {
    let start = Instant::now();
    let md_path = config.markdown_path_for(pdf_path);
    let mut report = DocumentReport::new(pdf_path.to_path_buf(), md_path);

    if let Err(e) = run_steps(factory, pdf_path, image_dir, &mut report) {
        error!("Error processing {}: {}", pdf_path.display(), e);
        report.error = Some(e.to_string());
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    report
}

fn run_steps(
    factory: &dyn EngineFactory,
    pdf_path: &Path,
    image_dir: &Path,
    report: &mut DocumentReport,
) -> Result<(), Pdf2MdError> {
    report.images = extract_images(pdf_path, image_dir)?;
    report.conversion = convert_document(factory, pdf_path, &report.markdown_path);
    if !report.images.is_empty() {
        append_image_references(&report.markdown_path, &report.images)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ConversionOutcome;
    use crate::pipeline::engine::ConversionEngine;
    use crate::progress::BatchProgressCallback;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn never_called() -> Result<Box<dyn ConversionEngine>, Pdf2MdError> {
        Err(Pdf2MdError::Internal("engine should not be built".into()))
    }

    fn config_in(dir: &TempDir) -> BatchConfig {
        BatchConfig::builder()
            .input_dir(dir.path().join("input"))
            .output_dir(dir.path().join("markdown"))
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl BatchProgressCallback for EventLog {
        fn on_batch_start(&self, total: usize) {
            self.0.lock().unwrap().push(format!("start {total}"));
        }
        fn on_document_start(&self, index: usize, _total: usize, name: &str) {
            self.0.lock().unwrap().push(format!("doc {index} {name}"));
        }
        fn on_document_complete(&self, index: usize, _total: usize, _report: &DocumentReport) {
            self.0.lock().unwrap().push(format!("ok {index}"));
        }
        fn on_document_error(&self, index: usize, _total: usize, _error: &str) {
            self.0.lock().unwrap().push(format!("err {index}"));
        }
        fn on_batch_complete(&self, report: &BatchReport) {
            self.0.lock().unwrap().push(format!("done {}", report.discovered()));
        }
    }

    #[test]
    fn empty_input_yields_empty_report_and_layout() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("input")).unwrap();
        let config = config_in(&dir);

        let report = run_batch_with(&config, &never_called).unwrap();
        assert_eq!(report.discovered(), 0);
        assert!(dir.path().join("markdown/images").is_dir());
    }

    #[test]
    fn missing_input_dir_aborts_batch() {
        let dir = TempDir::new().unwrap();
        let err = run_batch_with(&config_in(&dir), &never_called).unwrap_err();
        assert!(matches!(err, Pdf2MdError::InputDirUnreadable { .. }));
    }

    #[test]
    fn unreadable_documents_are_recorded_and_skipped() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.pdf"), b"not a pdf").unwrap();
        fs::write(input.join("b.pdf"), b"also not a pdf").unwrap();

        let log = Arc::new(EventLog::default());
        let config = BatchConfig::builder()
            .input_dir(&input)
            .output_dir(dir.path().join("markdown"))
            .progress_callback(log.clone())
            .build()
            .unwrap();

        let report = run_batch_with(&config, &never_called).unwrap();
        assert_eq!(report.failed(), 2);
        assert!(report
            .documents
            .iter()
            .all(|d| d.conversion == ConversionOutcome::NotAttempted));
        // Extraction failed first, so no Markdown file was opened.
        assert!(!dir.path().join("markdown/a.md").exists());

        let events = log.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start 2", "doc 1 a.pdf", "err 1", "doc 2 b.pdf", "err 2", "done 2"]
        );
    }
}
