//! VLM call for one page.
//!
//! Each page gets exactly one request: a system message with the conversion
//! prompt and a user message carrying the page image. A failed call is
//! reported as a [`PageError`]; the engine decides whether the document
//! survives it.

use crate::config::VisionOptions;
use crate::error::PageError;
use crate::output::RenderedPage;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::time::Instant;
use tracing::{debug, warn};

/// Ask the provider to transcribe one page image into Markdown.
///
/// The returned page holds the raw model output; cleanup happens in
/// [`crate::pipeline::postprocess`].
pub async fn process_page(
    provider: &dyn LLMProvider,
    page_num: usize,
    image: ImageData,
    options: &VisionOptions,
) -> Result<RenderedPage, PageError> {
    let start = Instant::now();
    let messages = build_messages(image, options);
    let completion = build_options(options);

    let response = provider
        .chat(&messages, Some(&completion))
        .await
        .map_err(|e| {
            warn!("Page {}: LLM call failed: {}", page_num, e);
            PageError::LlmFailed {
                page: page_num,
                detail: e.to_string(),
            }
        })?;

    let elapsed = start.elapsed();
    debug!(
        "Page {}: {} input tokens, {} output tokens, {:?}",
        page_num, response.prompt_tokens, response.completion_tokens, elapsed
    );

    Ok(RenderedPage {
        page_num,
        markdown: response.content,
        input_tokens: response.prompt_tokens,
        output_tokens: response.completion_tokens,
        duration_ms: elapsed.as_millis() as u64,
    })
}

// The user turn carries no text; the page image is the whole request.
fn build_messages(image: ImageData, options: &VisionOptions) -> Vec<ChatMessage> {
    let system_prompt = options.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images("", vec![image]),
    ]
}

fn build_options(options: &VisionOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_tokens),
        ..Default::default()
    }
}
