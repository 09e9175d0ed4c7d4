//! Page encoding: rasterised page → base64 PNG attachment for the VLM request.
//!
//! PNG keeps rendered glyph edges exact. `detail: "high"` makes GPT-4-class
//! models tile the image instead of downsampling it to a single overview.

use crate::error::PageError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

pub const PAGE_MIME_TYPE: &str = "image/png";

/// Encode one page bitmap for a multimodal chat message.
pub fn encode_page(page_num: usize, img: &DynamicImage) -> Result<ImageData, PageError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| PageError::RenderFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {e}"),
        })?;

    let b64 = STANDARD.encode(&png);
    debug!("Page {}: {} PNG bytes → {} base64 chars", page_num, png.len(), b64.len());

    Ok(ImageData::new(b64, PAGE_MIME_TYPE).with_detail("high"))
}
