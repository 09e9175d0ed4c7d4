//! Markdown output: write converted text and append image references.

use crate::config::IMAGE_SUBDIR;
use crate::error::Pdf2MdError;
use crate::output::ConversionOutcome;
use crate::pipeline::engine::{text_from_rendered, EngineFactory};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// Convert `pdf_path` and write its text to `md_path`.
///
/// The output file is created or truncated before the engine runs, so a
/// failed conversion always leaves an empty file. Every failure is logged
/// and returned as [`ConversionOutcome::Failed`]; this function never errors.
pub fn convert_document(factory: &dyn EngineFactory, pdf_path: &Path, md_path: &Path) -> ConversionOutcome {
    let file = match create_output(md_path) {
        Ok(file) => file,
        Err(e) => return failed(pdf_path, e),
    };

    match render_into(factory, pdf_path, md_path, file) {
        Ok(outcome) => outcome,
        Err(e) => failed(pdf_path, e),
    }
}

// Engine, rendered pages and text all drop when this returns.
fn render_into(
    factory: &dyn EngineFactory,
    pdf_path: &Path,
    md_path: &Path,
    mut file: File,
) -> Result<ConversionOutcome, Pdf2MdError> {
    let mut engine = factory.create_engine()?;
    debug!("Converting {} with engine '{}'", pdf_path.display(), engine.name());

    let rendered = engine.render(pdf_path)?;
    let text = text_from_rendered(&rendered);

    file.write_all(text.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|source| Pdf2MdError::OutputWriteFailed {
            path: md_path.to_path_buf(),
            source,
        })?;

    info!(
        "Converted {} → {} ({} pages, {} skipped, {} chars)",
        pdf_path.display(),
        md_path.display(),
        rendered.pages.len(),
        rendered.skipped_pages,
        text.len()
    );
    Ok(ConversionOutcome::Converted {
        pages: rendered.pages.len(),
        chars: text.chars().count(),
    })
}

fn create_output(md_path: &Path) -> Result<File, Pdf2MdError> {
    File::create(md_path).map_err(|source| Pdf2MdError::OutputWriteFailed {
        path: md_path.to_path_buf(),
        source,
    })
}

fn failed(pdf_path: &Path, err: Pdf2MdError) -> ConversionOutcome {
    error!("Error converting {}: {}", pdf_path.display(), err);
    ConversionOutcome::Failed {
        reason: err.to_string(),
    }
}

/// The Markdown block referencing one extracted image.
pub fn image_reference(name: &str) -> String {
    format!("\n\n![Image]({IMAGE_SUBDIR}/{name})\n")
}

/// Append one reference per image name to `md_path`, in order.
///
/// The file is created if missing. Existing content is not read.
pub fn append_image_references(md_path: &Path, names: &[String]) -> Result<(), Pdf2MdError> {
    let write_failed = |source| Pdf2MdError::OutputWriteFailed {
        path: md_path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(md_path)
        .map_err(write_failed)?;

    let block: String = names.iter().map(|name| image_reference(name)).collect();
    file.write_all(block.as_bytes()).map_err(write_failed)?;

    debug!("Appended {} image reference(s) to {}", names.len(), md_path.display());
    Ok(())
}
