//! Configuration types for a batch run.
//!
//! Everything a run needs is held in one [`BatchConfig`], built via
//! [`BatchConfigBuilder`]. The defaults reproduce the fixed directory layout:
//! PDFs are read from `./input` and Markdown is written to `./markdown`, with
//! every extracted image under `./markdown/images`.

use crate::error::Pdf2MdError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the image directory inside the output directory.
///
/// Appended Markdown references point at `images/{file}` relative to the
/// `.md` file, so this must stay in sync with
/// [`crate::pipeline::markdown::image_reference`].
pub const IMAGE_SUBDIR: &str = "images";

/// Default directory scanned for `*.pdf` files.
pub const DEFAULT_INPUT_DIR: &str = "input";

/// Default directory receiving `.md` files and `images/`.
pub const DEFAULT_OUTPUT_DIR: &str = "markdown";

/// Configuration for one batch run.
///
/// # Example
/// ```rust
/// use pdf2md_batch::{BatchConfig, EngineKind};
///
/// let config = BatchConfig::builder()
///     .input_dir("scans")
///     .output_dir("out")
///     .engine(EngineKind::TextLayer)
///     .build()
///     .unwrap();
/// assert!(config.image_dir().ends_with("out/images"));
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory scanned (non-recursively) for `*.pdf` files. Default: `input`.
    pub input_dir: PathBuf,

    /// Directory receiving one `.md` per input plus `images/`. Default: `markdown`.
    pub output_dir: PathBuf,

    /// Which conversion engine turns a PDF into text. Default: [`EngineKind::Vision`].
    pub engine: EngineKind,

    /// Settings used only by [`EngineKind::Vision`].
    pub vision: VisionOptions,

    /// Optional observer for per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            engine: EngineKind::default(),
            vision: VisionOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("engine", &self.engine)
            .field("vision", &self.vision)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// `<output_dir>/images`.
    pub fn image_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGE_SUBDIR)
    }

    /// `<output_dir>/<stem>.md` for a given input document.
    pub fn markdown_path_for(&self, pdf_path: &Path) -> PathBuf {
        let mut name = PathBuf::from(pdf_path.file_name().unwrap_or_default());
        name.set_extension("md");
        self.output_dir.join(name)
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.vision.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.vision.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.vision.provider = Some(provider);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.vision.max_rendered_pixels = px.max(100);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.vision.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.vision.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.vision.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, Pdf2MdError> {
        let c = &self.config;
        if c.input_dir.as_os_str().is_empty() {
            return Err(Pdf2MdError::InvalidConfig(
                "input directory must not be empty".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(Pdf2MdError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if c.vision.max_tokens == 0 {
            return Err(Pdf2MdError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Engine selection ─────────────────────────────────────────────────────

/// The conversion engine used by the Document Converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Rasterise pages and transcribe them with a vision LLM. (default)
    #[default]
    Vision,
    /// Read the embedded text layer with pdfium. Offline, no model needed.
    TextLayer,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Vision => "vision",
            EngineKind::TextLayer => "text_layer",
        }
    }
}

/// Settings for [`EngineKind::Vision`].
#[derive(Clone)]
pub struct VisionOptions {
    /// Longest rendered edge in pixels. Default: 2000.
    ///
    /// Caps memory per page independent of physical page size; 2000 px keeps
    /// body text legible to current vision models.
    pub max_rendered_pixels: u32,

    /// LLM model identifier. If None, `gpt-4.1-nano` for named providers.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum output tokens per page. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
}

impl Default for VisionOptions {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for VisionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionOptions")
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<custom>"))
            .finish()
    }
}
