//! CLI binary for pdf2md-batch.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_batch::{
    run_batch, BatchConfig, BatchProgressCallback, BatchReport, ConversionOutcome, DocumentReport, EngineKind,
    ProcessEnvironment, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the whole batch, one log line per document above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

fn shorten(msg: &str) -> String {
    match msg.char_indices().nth(79) {
        Some((cut, _)) => format!("{}\u{2026}", &msg[..cut]),
        None => msg.to_string(),
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.reset_eta();
    }

    fn on_document_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, report: &DocumentReport) {
        let name = report.source.file_name().unwrap_or_default().to_string_lossy().into_owned();
        let line = match report.conversion {
            ConversionOutcome::Converted { chars, .. } => format!(
                "  {} {:>3}/{:<3}  {}  {}",
                green("✓"),
                index,
                total,
                name,
                dim(&format!("{chars} chars, {} images", report.images.len())),
            ),
            ConversionOutcome::Failed { ref reason } => format!(
                "  {} {:>3}/{:<3}  {}  {}",
                yellow("⚠"),
                index,
                total,
                name,
                yellow(&shorten(reason)),
            ),
            ConversionOutcome::NotAttempted => format!("  {} {:>3}/{:<3}  {}", dim("·"), index, total, name),
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total,
            red(&shorten(error))
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _report: &BatchReport) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert ./input/*.pdf into ./markdown/ (vision engine)
  pdf2md-batch

  # Offline, text layer only
  pdf2md-batch --engine text

  # Other directories, with a progress bar
  pdf2md-batch --input-dir scans --output-dir out --progress

  # Pick the model explicitly
  pdf2md-batch --provider openai --model gpt-4.1-mini

  # Machine-readable report
  pdf2md-batch --json > report.json

OUTPUT LAYOUT:
  <output-dir>/<stem>.md                   converted text + image references
  <output-dir>/images/<stem>_p<P>_<I>.<ext> every embedded image (P from 1, I from 0)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  EDGEQUAKE_MODEL         Model ID
  PDFIUM_LIB_PATH         libpdfium file, or the directory containing it
  RUST_LOG                Overrides the log filter
"#;

/// Batch-convert a directory of PDFs to Markdown with extracted images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-batch",
    version,
    about = "Batch-convert a directory of PDFs to Markdown with extracted images",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for *.pdf files.
    #[arg(long, env = "PDF2MD_INPUT_DIR", default_value = pdf2md_batch::config::DEFAULT_INPUT_DIR)]
    input_dir: PathBuf,

    /// Directory receiving <stem>.md files and images/.
    #[arg(long, env = "PDF2MD_OUTPUT_DIR", default_value = pdf2md_batch::config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Conversion engine.
    #[arg(long, env = "PDF2MD_ENGINE", value_enum, default_value = "vision")]
    engine: EngineArg,

    /// LLM model ID (vision engine).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure (vision engine).
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Longest edge of a rasterised page in pixels (vision engine).
    #[arg(long, env = "PDF2MD_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=10000))]
    max_pixels: u32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2MD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2MD_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2MD_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Show a progress bar instead of log lines.
    #[arg(long, env = "PDF2MD_PROGRESS")]
    progress: bool,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "PDF2MD_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Vision,
    Text,
}

impl From<EngineArg> for EngineKind {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Vision => EngineKind::Vision,
            EngineArg::Text => EngineKind::TextLayer,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO lines; verbose always wins.
    let show_progress = cli.progress && !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // Before the progress ticker or any engine runtime starts a thread.
    ProcessEnvironment::single_threaded().apply();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let report = run_batch(&config).with_context(|| {
        format!(
            "Batch failed before processing ({} → {})",
            config.input_dir.display(),
            config.output_dir.display()
        )
    })?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&report, &config);
    }

    // Per-document failures are in the report; they do not change the exit code.
    Ok(())
}

fn print_summary(report: &BatchReport, config: &BatchConfig) {
    let problems = report.soft_failed() + report.failed();
    let mark = if problems == 0 { green("✔") } else { yellow("⚠") };
    eprintln!(
        "{}  {}/{} PDFs converted  {} images  {:.1}s  →  {}",
        mark,
        report.converted(),
        report.discovered(),
        report.total_images(),
        report.duration_ms as f64 / 1000.0,
        bold(&config.output_dir.display().to_string()),
    );
    if problems > 0 {
        eprintln!(
            "   {} conversion failure(s), {} aborted document(s)",
            dim(&report.soft_failed().to_string()),
            red(&report.failed().to_string()),
        );
    }
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .engine(cli.engine.into())
        .max_rendered_pixels(cli.max_pixels)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
