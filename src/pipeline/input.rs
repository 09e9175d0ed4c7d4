//! Input discovery: list the PDFs directly inside the input directory and
//! prepare the output layout.
//!
//! Discovery is non-recursive and only accepts regular files whose extension
//! is exactly `pdf`. The list is sorted by file name so two runs over the same
//! directory process documents in the same order.

use crate::error::Pdf2MdError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Return every `*.pdf` file directly inside `input_dir`, sorted by name.
pub fn discover_inputs(input_dir: &Path) -> Result<Vec<PathBuf>, Pdf2MdError> {
    let unreadable = |source| Pdf2MdError::InputDirUnreadable {
        path: input_dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(input_dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if !is_pdf_path(&path) {
            continue;
        }
        // Follows symlinks, so a linked PDF counts but a linked directory does not.
        if !path.is_file() {
            continue;
        }
        found.push(path);
    }

    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Discovered {} PDF(s) in {}", found.len(), input_dir.display());
    Ok(found)
}

/// Create `output_dir` and `image_dir` if they do not exist yet.
pub fn prepare_directories(output_dir: &Path, image_dir: &Path) -> Result<(), Pdf2MdError> {
    for dir in [output_dir, image_dir] {
        fs::create_dir_all(dir).map_err(|source| Pdf2MdError::DirectoryCreateFailed {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// `true` when the path ends in `.pdf`.
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "pdf")
}

/// File stem used to name every artefact derived from a document.
pub fn document_stem(pdf_path: &Path) -> String {
    pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
