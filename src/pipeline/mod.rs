//! Pipeline stages for one document.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ images ──────────────────────────────────────────▶ markdown (append refs)
//!   │      (lopdf XObjects → markdown/images/)                       ▲
//!   └────▶ markdown::convert_document ──▶ engine ──▶ render ──▶ ...  │
//!                                 vision: encode ──▶ llm ──▶ postprocess
//!                                 text:   postprocess ─────────────┘
//! ```
//!
//! 1. [`input`]       : discover `*.pdf` files and create output directories
//! 2. [`images`]      : write every embedded raster image to the image directory
//! 3. [`engine`]      : the engine seam and the two pdfium-backed engines
//! 4. [`render`]      : pdfium binding, page rasterisation, text layer
//! 5. [`encode`]      : PNG + base64 for the multimodal request body
//! 6. [`llm`]         : one VLM call per page; the only stage with network I/O
//! 7. [`postprocess`] : deterministic cleanup of engine output
//! 8. [`markdown`]    : write the `.md` file and append image references

pub mod encode;
pub mod engine;
pub mod images;
pub mod input;
pub mod llm;
pub mod markdown;
pub mod postprocess;
pub mod render;
