//! Configuration for drawing extraction.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. The model endpoint is part of this value
//! rather than process-wide state: callers either name a provider/model, let
//! the provider be detected from the environment, or inject a ready-made
//! [`VisionModel`] (which is how tests substitute a fake).

use crate::error::ExtractError;
use crate::pipeline::client::VisionModel;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Placeholder written for fields the model did not return.
pub const MISSING_VALUE: &str = "NA";

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for one extraction batch.
///
/// # Example
/// ```rust
/// use cylinder_params::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .provider_name("azure")
///     .model("gpt-4o")
///     .api_timeout_secs(120)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Upscaling factor applied to the first PDF page. Default: 2.0.
    ///
    /// Dimension callouts on cylinder drawings are small; rendering at twice
    /// the native page resolution keeps them legible to the model.
    pub render_scale: f32,

    /// Cap on either rendered edge in pixels. Default: 8000.
    ///
    /// Only bites on oversized sheets (A0 and up) where 2× would exhaust memory.
    pub max_rendered_pixels: u32,

    /// JPEG quality (1–100) for rasterised PDF pages. Default: 95.
    pub jpeg_quality: u8,

    /// Image detail hint forwarded with the attachment. Default: "high".
    pub image_detail: String,

    /// Model identifier, e.g. "gpt-4o". If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Provider name (e.g. "azure", "openai", "anthropic").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed model. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn VisionModel>>,

    /// Sampling temperature. Default: 0.0 for reproducible extractions.
    pub temperature: f32,

    /// Maximum tokens the model may generate per drawing. Default: 3000.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: None (the transport decides).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Characters of a malformed reply kept for diagnostics. Default: 500.
    pub diagnostic_limit: usize,

    /// What to do with schema fields the model omitted. Default: placeholder.
    pub missing_fields: MissingFieldPolicy,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            max_rendered_pixels: 8000,
            jpeg_quality: 95,
            image_detail: "high".to_string(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 3000,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            diagnostic_limit: 500,
            missing_fields: MissingFieldPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("render_scale", &self.render_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("image_detail", &self.image_detail)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("diagnostic_limit", &self.diagnostic_limit)
            .field("missing_fields", &self.missing_fields)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model name used when a provider has to be constructed.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn image_detail(mut self, detail: impl Into<String>) -> Self {
        self.config.image_detail = detail.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn VisionModel>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn diagnostic_limit(mut self, chars: usize) -> Self {
        self.config.diagnostic_limit = chars;
        self
    }

    pub fn missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.config.missing_fields = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !(0.5..=8.0).contains(&c.render_scale) {
            return Err(ExtractError::InvalidConfig(format!(
                "Render scale must be 0.5–8.0, got {}",
                c.render_scale
            )));
        }
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.diagnostic_limit == 0 {
            return Err(ExtractError::InvalidConfig(
                "diagnostic_limit must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Handling of schema fields missing from an otherwise valid reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Fill the field with [`MISSING_VALUE`] and list it in
    /// [`crate::output::ParameterRecord::placeholders`]. (default)
    #[default]
    Placeholder,
    /// Fail the document with [`crate::error::DocumentError::IncompleteReply`].
    Reject,
}
