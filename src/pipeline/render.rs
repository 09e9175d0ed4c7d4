//! pdfium access: library binding, page rasterisation and the text layer.
//!
//! Each engine binds its own [`Pdfium`] when it is created and drops it with
//! the engine at the end of the document. Binding order:
//!
//! 1. `PDFIUM_LIB_PATH`: a library file, or a directory containing it
//! 2. the current working directory
//! 3. the system library search path
//!
//! Pages are handed to the caller one at a time, so only one rasterised
//! bitmap is alive at any moment no matter how long the document is.

use crate::error::Pdf2MdError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind a fresh pdfium instance.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2MdError> {
    let custom = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    bind_pdfium_from(custom.as_deref())
}

/// Bind pdfium from `custom` when given, otherwise from `./` or the system.
pub fn bind_pdfium_from(custom: Option<&Path>) -> Result<Pdfium, Pdf2MdError> {
    let bindings = match custom {
        Some(custom) => {
            let library = if custom.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(custom)
            } else {
                custom.to_path_buf()
            };
            debug!("Binding pdfium from PDFIUM_LIB_PATH: {}", library.display());
            Pdfium::bind_to_library(&library)
                .map_err(|e| Pdf2MdError::PdfiumBindingFailed(format!("{}: {e}", library.display())))?
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Pdf2MdError::PdfiumBindingFailed(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, Pdf2MdError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| Pdf2MdError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })
}

/// Rasterise every page, calling `on_page(page_num, image)` in page order.
///
/// The longest edge of each bitmap is capped at `max_pixels`. Returns the
/// number of pages in the document.
pub fn rasterise_pages<F>(
    pdfium: &Pdfium,
    pdf_path: &Path,
    max_pixels: u32,
    mut on_page: F,
) -> Result<usize, Pdf2MdError>
where
    F: FnMut(usize, Result<DynamicImage, Pdf2MdError>),
{
    let document = open_document(pdfium, pdf_path)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded for rendering: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let image = page
            .render_with_config(&render_config)
            .map(|bitmap| bitmap.as_image())
            .map_err(|e| Pdf2MdError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            });
        if let Ok(ref img) = image {
            debug!("Rendered page {} → {}x{} px", page_num, img.width(), img.height());
        }
        on_page(page_num, image);
    }

    Ok(total_pages)
}

/// Read the text layer of every page, in page order.
pub fn page_texts(
    pdfium: &Pdfium,
    pdf_path: &Path,
) -> Result<Vec<(usize, Result<String, Pdf2MdError>)>, Pdf2MdError> {
    let document = open_document(pdfium, pdf_path)?;
    let pages = document.pages();
    info!("PDF loaded for text extraction: {} pages", pages.len());

    let texts = pages
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            let page_num = idx + 1;
            let text = page
                .text()
                .map(|layer| layer.all())
                .map_err(|e| Pdf2MdError::TextLayerFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                });
            (page_num, text)
        })
        .collect();
    Ok(texts)
}
