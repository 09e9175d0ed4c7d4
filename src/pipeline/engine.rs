//! Conversion engines: turn one PDF into a [`RenderedDocument`].
//!
//! The Document Converter never talks to pdfium or an LLM directly. It asks an
//! [`EngineFactory`] for a fresh [`ConversionEngine`] per document, renders,
//! and drops the engine before the next document starts.
//!
//! ```text
//! ┌───────────────┐  create_engine  ┌──────────────────┐  render   ┌──────────────────┐
//! │ EngineFactory │ ──────────────▶ │ ConversionEngine │ ────────▶ │ RenderedDocument │
//! └───────────────┘                 └──────────────────┘           └──────────────────┘
//!                                    vision:     pdfium bitmap → PNG → VLM → postprocess
//!                                    text_layer: pdfium text → hyphen join → postprocess
//! ```
//!
//! Any `Fn() -> Result<Box<dyn ConversionEngine>, Pdf2MdError>` closure is a
//! factory too, which is how tests script engine behaviour.

use crate::config::{BatchConfig, EngineKind, VisionOptions};
use crate::error::{PageError, Pdf2MdError};
use crate::output::{RenderedDocument, RenderedPage};
use crate::pipeline::{encode, llm, postprocess, render};
use edgequake_llm::{LLMProvider, ProviderFactory};
use pdfium_render::prelude::Pdfium;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

/// Something that can render a PDF into per-page Markdown.
pub trait ConversionEngine {
    /// Short identifier recorded in [`RenderedDocument::engine`].
    fn name(&self) -> &'static str;

    /// Render every page of `pdf_path`.
    fn render(&mut self, pdf_path: &Path) -> Result<RenderedDocument, Pdf2MdError>;
}

/// Builds one engine per document.
pub trait EngineFactory {
    fn create_engine(&self) -> Result<Box<dyn ConversionEngine>, Pdf2MdError>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Result<Box<dyn ConversionEngine>, Pdf2MdError>,
{
    fn create_engine(&self) -> Result<Box<dyn ConversionEngine>, Pdf2MdError> {
        self()
    }
}

/// The factory used by [`crate::batch::run_batch`].
#[derive(Debug, Clone)]
pub struct DefaultEngineFactory {
    kind: EngineKind,
    vision: VisionOptions,
}

impl DefaultEngineFactory {
    pub fn new(kind: EngineKind, vision: VisionOptions) -> Self {
        Self { kind, vision }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.engine, config.vision.clone())
    }
}

impl EngineFactory for DefaultEngineFactory {
    fn create_engine(&self) -> Result<Box<dyn ConversionEngine>, Pdf2MdError> {
        // Binding first: a missing library fails the document before any
        // provider or runtime is set up.
        let pdfium = render::bind_pdfium()?;
        match self.kind {
            EngineKind::Vision => Ok(Box::new(VisionEngine::new(pdfium, self.vision.clone())?)),
            EngineKind::TextLayer => Ok(Box::new(TextLayerEngine::new(pdfium))),
        }
    }
}

// ── Vision engine ───────────────────────────────────────────────────────────

/// Rasterises pages and transcribes them with a vision-language model.
pub struct VisionEngine {
    pdfium: Pdfium,
    runtime: Runtime,
    provider: Arc<dyn LLMProvider>,
    options: VisionOptions,
}

impl VisionEngine {
    pub fn new(pdfium: Pdfium, options: VisionOptions) -> Result<Self, Pdf2MdError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Pdf2MdError::Internal(format!("cannot start tokio runtime: {e}")))?;

        // Some providers spawn their HTTP client onto the ambient runtime.
        let provider = {
            let _guard = runtime.enter();
            resolve_provider(&options)?
        };
        info!(
            "Vision engine ready: provider={}, model={}",
            options.provider_name.as_deref().unwrap_or("auto"),
            options.model.as_deref().unwrap_or("default")
        );

        Ok(Self {
            pdfium,
            runtime,
            provider,
            options,
        })
    }
}

impl ConversionEngine for VisionEngine {
    fn name(&self) -> &'static str {
        EngineKind::Vision.as_str()
    }

    fn render(&mut self, pdf_path: &Path) -> Result<RenderedDocument, Pdf2MdError> {
        let mut document = RenderedDocument::new(self.name());
        let mut first_error: Option<String> = None;

        let pdfium = &self.pdfium;
        let runtime = &self.runtime;
        let provider = self.provider.as_ref();
        let options = &self.options;

        let total_pages = render::rasterise_pages(pdfium, pdf_path, options.max_rendered_pixels, |page_num, image| {
            let page = image
                .map_err(|e| page_render_error(page_num, e))
                .and_then(|img| encode::encode_page(page_num, &img))
                .and_then(|data| runtime.block_on(llm::process_page(provider, page_num, data, options)));

            match page {
                Ok(mut page) => {
                    page.markdown = postprocess::clean_markdown(&page.markdown);
                    debug!("Page {}: {} chars of Markdown", page_num, page.markdown.len());
                    document.pages.push(page);
                }
                Err(e) => {
                    warn!("Skipping page: {}", e);
                    document.skipped_pages += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        })?;

        finish(document, total_pages, first_error)
    }
}

fn page_render_error(page_num: usize, err: Pdf2MdError) -> PageError {
    let detail = match err {
        Pdf2MdError::RasterisationFailed { detail, .. } => detail,
        other => other.to_string(),
    };
    PageError::RenderFailed { page: page_num, detail }
}

// ── Text-layer engine ───────────────────────────────────────────────────────

/// Reads the embedded text layer. No network, no model.
pub struct TextLayerEngine {
    pdfium: Pdfium,
}

impl TextLayerEngine {
    pub fn new(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl ConversionEngine for TextLayerEngine {
    fn name(&self) -> &'static str {
        EngineKind::TextLayer.as_str()
    }

    fn render(&mut self, pdf_path: &Path) -> Result<RenderedDocument, Pdf2MdError> {
        let mut document = RenderedDocument::new(self.name());
        let mut first_error: Option<String> = None;

        let pages = render::page_texts(&self.pdfium, pdf_path)?;
        let total_pages = pages.len();
        for (page_num, text) in pages {
            let start = Instant::now();
            match text {
                Ok(raw) => document.pages.push(RenderedPage {
                    page_num,
                    markdown: postprocess::clean_text_layer(&raw),
                    duration_ms: start.elapsed().as_millis() as u64,
                    ..Default::default()
                }),
                Err(e) => {
                    warn!("Skipping page {}: {}", page_num, e);
                    document.skipped_pages += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        finish(document, total_pages, first_error)
    }
}

fn finish(
    document: RenderedDocument,
    total_pages: usize,
    first_error: Option<String>,
) -> Result<RenderedDocument, Pdf2MdError> {
    if total_pages > 0 && document.pages.is_empty() {
        return Err(Pdf2MdError::AllPagesFailed {
            total: total_pages,
            first_error: first_error.unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    Ok(document)
}

// ── Text assembly ───────────────────────────────────────────────────────────

/// Join rendered pages into the document text written to `<stem>.md`.
///
/// Each page is right-trimmed. Empty pages are dropped, the rest are joined by
/// one blank line, and non-empty output ends in exactly one `\n`.
pub fn text_from_rendered(document: &RenderedDocument) -> String {
    let pages: Vec<&str> = document
        .pages
        .iter()
        .map(|p| p.markdown.trim_end())
        .filter(|md| !md.is_empty())
        .collect();

    if pages.is_empty() {
        return String::new();
    }
    let mut text = pages.join("\n\n");
    text.push('\n');
    text
}

// ── Provider resolution ─────────────────────────────────────────────────────

fn create_vision_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Pdf2MdError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| Pdf2MdError::ProviderNotConfigured {
        provider: provider_name.to_string(),
        hint: e.to_string(),
    })
}

/// Pick the LLM provider, from most to least specific:
///
/// 1. a provider object set on the options
/// 2. `provider_name` plus `model` (model defaults to `gpt-4.1-nano`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` and `EDGEQUAKE_MODEL`, when both are non-empty
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. whatever [`ProviderFactory::from_env`] detects
pub fn resolve_provider(options: &VisionOptions) -> Result<Arc<dyn LLMProvider>, Pdf2MdError> {
    if let Some(ref provider) = options.provider {
        return Ok(Arc::clone(provider));
    }

    let model = options.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
    if let Some(ref name) = options.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(provider), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !provider.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&provider, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.is_empty()) {
        return create_vision_provider("openai", model);
    }

    let (provider, _embedding) = ProviderFactory::from_env().map_err(|e| Pdf2MdError::ProviderNotConfigured {
        provider: "auto".to_string(),
        hint: format!(
            "No LLM provider could be auto-detected from environment.\n\
             Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider/--model.\n\
             Error: {e}"
        ),
    })?;
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, md: &str) -> RenderedPage {
        RenderedPage {
            page_num: n,
            markdown: md.to_string(),
            ..Default::default()
        }
    }

    fn doc(pages: Vec<RenderedPage>) -> RenderedDocument {
        RenderedDocument {
            engine: "test".into(),
            pages,
            skipped_pages: 0,
        }
    }

    #[test]
    fn text_joins_pages_with_blank_line() {
        let d = doc(vec![page(1, "# One\n\n"), page(2, "Two  \n")]);
        assert_eq!(text_from_rendered(&d), "# One\n\nTwo\n");
    }

    #[test]
    fn text_drops_empty_pages() {
        let d = doc(vec![page(1, "  \n"), page(2, "Body"), page(3, "")]);
        assert_eq!(text_from_rendered(&d), "Body\n");
    }

    #[test]
    fn text_of_blank_document_is_empty() {
        assert_eq!(text_from_rendered(&doc(vec![])), "");
        assert_eq!(text_from_rendered(&doc(vec![page(1, "\n\n")])), "");
    }

    #[test]
    fn finish_fails_only_when_every_page_failed() {
        let err = finish(RenderedDocument::new("t"), 3, Some("Page 1: boom".into())).unwrap_err();
        assert!(matches!(err, Pdf2MdError::AllPagesFailed { total: 3, .. }));

        assert!(finish(RenderedDocument::new("t"), 0, None).is_ok());
        assert!(finish(doc(vec![page(2, "ok")]), 3, Some("x".into())).is_ok());
    }

    #[test]
    fn render_error_keeps_pdfium_detail() {
        let err = Pdf2MdError::RasterisationFailed {
            page: 4,
            detail: "FormatError".into(),
        };
        match page_render_error(4, err) {
            PageError::RenderFailed { page, detail } => {
                assert_eq!(page, 4);
                assert_eq!(detail, "FormatError");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    struct Fixed;

    impl ConversionEngine for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn render(&mut self, _pdf_path: &Path) -> Result<RenderedDocument, Pdf2MdError> {
            Ok(doc(vec![page(1, "fixed")]))
        }
    }

    #[test]
    fn closures_are_factories() {
        let factory = || -> Result<Box<dyn ConversionEngine>, Pdf2MdError> { Ok(Box::new(Fixed)) };
        let mut engine = factory.create_engine().unwrap();
        assert_eq!(engine.name(), "fixed");
        let rendered = engine.render(Path::new("unused.pdf")).unwrap();
        assert_eq!(text_from_rendered(&rendered), "fixed\n");
    }
}
