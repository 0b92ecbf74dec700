//! Model interaction: package one drawing into a vision request and return
//! the raw reply text.
//!
//! This module is the single call site for the external model. It performs
//! no parsing; [`crate::pipeline::validate`] owns that. All prompt text lives
//! in [`crate::prompts`].
//!
//! ## Model seam
//!
//! [`VisionModel`] is the boundary the rest of the crate talks to.
//! [`LlmVisionModel`] adapts any `edgequake_llm` provider (OpenAI, Azure,
//! Anthropic, Gemini, Ollama, …); tests implement the trait directly.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use crate::pipeline::encode::RenderedImage;
use crate::prompts::{build_instructions, SYSTEM_PROMPT};
use crate::schema::ParameterSchema;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Everything the model receives for one drawing.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    /// Extraction rules with the JSON schema embedded.
    pub instructions: String,
    pub image: RenderedImage,
    pub image_detail: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Ask for a bare JSON object as the reply.
    pub json_output: bool,
}

/// Text returned by the model plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Transport or provider failure; the message is carried, never interpreted.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ModelCallError(pub String);

/// A vision-capable model: `(image, instructions, schema) → text`.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider/model label used in logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelCallError>;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    fn name(&self) -> &str {
        &self.label
    }

    /// ## Message Layout
    ///
    /// 1. **System message** — the drawing-interpreter framing
    /// 2. **User message** — the instruction text (schema embedded) with the
    ///    drawing attached as a base64 image
    ///
    /// `json_output` maps to `response_format = "json_object"`.
    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelCallError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user_with_images(
                request.instructions.as_str(),
                vec![request.image.to_image_data(&request.image_detail)],
            ),
        ];

        let options = completion_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelCallError(format!("{e}")))?;

        Ok(ModelReply {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

fn completion_options(request: &ModelRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        response_format: request.json_output.then(|| "json_object".to_string()),
        ..Default::default()
    }
}

/// Raw reply for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelReply {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Builds requests from a fixed schema/prompt and sends them to one model.
pub struct ExtractionClient {
    model: Result<Arc<dyn VisionModel>, String>,
    system: String,
    instructions: String,
    image_detail: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Option<Duration>,
}

impl ExtractionClient {
    /// `model` is `Err(reason)` when no model could be resolved; every
    /// [`extract`](Self::extract) call then fails with `ClientUnavailable`.
    pub fn new(
        model: Result<Arc<dyn VisionModel>, String>,
        schema: &ParameterSchema,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            model,
            system: SYSTEM_PROMPT.to_string(),
            instructions: build_instructions(schema),
            image_detail: config.image_detail.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.api_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_ok()
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    fn build_request(&self, image: &RenderedImage) -> ModelRequest {
        ModelRequest {
            system: self.system.clone(),
            instructions: self.instructions.clone(),
            image: image.clone(),
            image_detail: self.image_detail.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_output: true,
        }
    }

    /// Send one drawing to the model, exactly once.
    pub async fn extract(
        &self,
        filename: &str,
        image: &RenderedImage,
    ) -> Result<RawModelReply, DocumentError> {
        let model = self
            .model
            .as_ref()
            .map_err(|reason| DocumentError::ClientUnavailable {
                detail: reason.clone(),
            })?;

        let request = self.build_request(image);
        let start = Instant::now();

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, model.complete(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ModelCallError(format!(
                    "timed out after {}s",
                    limit.as_secs()
                ))),
            },
            None => model.complete(&request).await,
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(reply) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {}ms via {}",
                    filename,
                    reply.input_tokens,
                    reply.output_tokens,
                    duration_ms,
                    model.name()
                );
                Ok(RawModelReply {
                    text: reply.content,
                    input_tokens: reply.input_tokens,
                    output_tokens: reply.output_tokens,
                    duration_ms,
                })
            }
            Err(e) => {
                warn!("{}: model request failed: {}", filename, e);
                Err(DocumentError::RequestFailure { detail: e.0 })
            }
        }
    }
}
