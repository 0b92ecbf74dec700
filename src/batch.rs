//! Batch orchestration: documents in, one [`ExtractionResult`] per document out.
//!
//! Each document moves through `Normalizing → Extracting → Validating → Done`
//! and the first failing stage ends that document. No document failure
//! aborts the batch, and nothing is retried.

use crate::config::{ExtractionConfig, DEFAULT_MODEL};
use crate::error::{DocumentError, ExtractError, Stage};
use crate::output::{BatchReport, BatchStats, ExtractionResult, ParameterRecord};
use crate::pipeline::client::{ExtractionClient, LlmVisionModel, VisionModel};
use crate::pipeline::input::{self, LoadedInput, SourceDocument};
use crate::pipeline::{normalize, validate};
use crate::schema::ParameterSchema;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract parameters from every document, in upload order.
///
/// Always returns exactly one result per document. A model that cannot be
/// resolved is reported on each document as `ClientUnavailable`.
pub async fn process(documents: Vec<SourceDocument>, config: &ExtractionConfig) -> BatchReport {
    let loaded = documents.into_iter().map(LoadedInput::Document).collect();
    run_batch(loaded, config).await
}

/// Blocking wrapper around [`process`].
///
/// Creates a new Tokio runtime internally. Do not call from within an
/// existing async context; use [`process`] instead.
pub fn process_sync(
    documents: Vec<SourceDocument>,
    config: &ExtractionConfig,
) -> Result<BatchReport, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))
        .map(|rt| rt.block_on(process(documents, config)))
}

/// Load paths, directories and URLs, then run the batch.
///
/// Inputs that cannot be loaded become `Failure` results at their position.
pub async fn process_inputs(inputs: &[String], config: &ExtractionConfig) -> BatchReport {
    let loaded = input::resolve_inputs(inputs, config.download_timeout_secs).await;
    run_batch(loaded, config).await
}

async fn run_batch(inputs: Vec<LoadedInput>, config: &ExtractionConfig) -> BatchReport {
    let total = inputs.len();
    info!("Starting batch: {} document(s)", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let model = if total == 0 {
        Err("empty batch".to_string())
    } else {
        resolve_model(config)
    };
    if let Err(ref reason) = model {
        if total > 0 {
            warn!("No model available: {}", reason);
        }
    }

    run_with_model(inputs, config, model).await
}

async fn run_with_model(
    inputs: Vec<LoadedInput>,
    config: &ExtractionConfig,
    model: Result<Arc<dyn VisionModel>, String>,
) -> BatchReport {
    let batch_start = Instant::now();
    let total = inputs.len();
    let schema = ParameterSchema::cylinder();
    let client = ExtractionClient::new(model, &schema, config);

    let mut results = Vec::with_capacity(total);
    let mut stats = BatchStats {
        total_documents: total,
        ..Default::default()
    };

    for (i, loaded) in inputs.into_iter().enumerate() {
        let index = i + 1;
        let (filename, outcome) = match loaded {
            LoadedInput::Document(doc) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_start(index, total, doc.filename());
                }
                let outcome = process_document(&doc, &client, &schema, config, &mut stats).await;
                (doc.filename().to_string(), outcome)
            }
            LoadedInput::Failed { filename, error } => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_start(index, total, &filename);
                }
                (filename, Err(error))
            }
        };

        let result = match outcome {
            Ok(record) => {
                stats.succeeded += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_complete(index, total, &filename);
                }
                ExtractionResult::success(filename, record)
            }
            Err(error) => {
                stats.failed += 1;
                warn!(
                    "{}: failed while {} ({}): {}",
                    filename,
                    error.stage(),
                    error.kind(),
                    error
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_error(index, total, &filename, &error.to_string());
                }
                ExtractionResult::failure(filename, error)
            }
        };
        results.push(result);
    }

    stats.total_duration_ms = batch_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.succeeded);
    }

    info!(
        "Batch complete: {}/{} succeeded, {} input tokens, {} output tokens, {}ms",
        stats.succeeded,
        total,
        stats.total_input_tokens,
        stats.total_output_tokens,
        stats.total_duration_ms
    );

    BatchReport { results, stats }
}

async fn process_document(
    doc: &SourceDocument,
    client: &ExtractionClient,
    schema: &ParameterSchema,
    config: &ExtractionConfig,
    stats: &mut BatchStats,
) -> Result<ParameterRecord, DocumentError> {
    let filename = doc.filename();
    info!("Processing {}", filename);

    debug!("{}: {}", filename, Stage::Normalizing);
    let image = normalize::normalize(doc, config).await?;

    debug!("{}: {}", filename, Stage::Extracting);
    let reply = client.extract(filename, &image).await?;
    stats.total_input_tokens += reply.input_tokens as u64;
    stats.total_output_tokens += reply.output_tokens as u64;

    debug!("{}: {}", filename, Stage::Validating);
    let record = validate::validate(
        &reply.text,
        schema,
        config.missing_fields,
        config.diagnostic_limit,
    )?;

    debug!("{}: {}", filename, Stage::Done);
    Ok(record)
}

/// Resolve the model, from most-specific to least-specific.
///
/// 1. **Injected model** (`config.provider`), used as-is. This is how tests
///    substitute a fake.
/// 2. **Named provider + model** (`config.provider_name`), built with
///    [`ProviderFactory::create_llm_provider`], which reads the matching
///    API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured when both are set.
/// 4. **`OPENAI_API_KEY`** present → OpenAI with the configured model.
/// 5. **Auto-detect** via [`ProviderFactory::from_env`].
///
/// The error string ends up in each document's `ClientUnavailable` failure.
pub fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn VisionModel>, String> {
    if let Some(ref model) = config.provider {
        return Ok(Arc::clone(model));
    }

    let model_name = config.model_or_default();

    if let Some(ref name) = config.provider_name {
        return create_vision_model(name, model_name);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_model(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_model("openai", model_name);
        }
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        format!(
            "no model provider could be detected from the environment \
             (set OPENAI_API_KEY or EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL): {e}"
        )
    })?;

    Ok(wrap(llm_provider, "auto".to_string()))
}

fn create_vision_model(provider_name: &str, model: &str) -> Result<Arc<dyn VisionModel>, String> {
    let model = if model.is_empty() { DEFAULT_MODEL } else { model };
    ProviderFactory::create_llm_provider(provider_name, model)
        .map(|p| wrap(p, format!("{provider_name}/{model}")))
        .map_err(|e| format!("cannot create provider '{provider_name}': {e}"))
}

fn wrap(provider: Arc<dyn LLMProvider>, label: String) -> Arc<dyn VisionModel> {
    Arc::new(LlmVisionModel::new(provider, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::client::{ModelCallError, ModelReply, ModelRequest};
    use async_trait::async_trait;

    struct Canned(String);

    #[async_trait]
    impl VisionModel for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: &ModelRequest) -> Result<ModelReply, ModelCallError> {
            Ok(ModelReply {
                content: self.0.clone(),
                input_tokens: 100,
                output_tokens: 20,
            })
        }
    }

    fn config_with(reply: &str) -> ExtractionConfig {
        ExtractionConfig::builder()
            .provider(Arc::new(Canned(reply.to_string())))
            .build()
            .unwrap()
    }

    #[test]
    fn injected_model_wins_resolution() {
        let config = config_with("{}");
        let model = resolve_model(&config).unwrap();
        assert_eq!(model.name(), "canned");
    }

    #[tokio::test]
    async fn token_usage_is_accumulated() {
        let config = config_with(r#"{"fluid": "AIR"}"#);
        let docs = vec![
            SourceDocument::new("a.png", vec![1, 2, 3]),
            SourceDocument::new("b.jpg", vec![4, 5, 6]),
        ];
        let report = process(docs, &config).await;
        assert_eq!(report.stats.succeeded, 2);
        assert_eq!(report.stats.total_input_tokens, 200);
        assert_eq!(report.stats.total_output_tokens, 40);
    }

    #[tokio::test]
    async fn failure_stage_follows_error_kind() {
        let config = config_with("not json");
        let docs = vec![
            SourceDocument::new("a.png", vec![1]),
            SourceDocument::new("b.docx", vec![1]),
        ];
        let report = process(docs, &config).await;
        let kinds: Vec<_> = report.results.iter().map(|r| r.error_kind()).collect();
        assert_eq!(
            kinds,
            vec![Some(ErrorKind::MalformedReply), Some(ErrorKind::UnsupportedFormat)]
        );
        assert_eq!(report.results[0].error().unwrap().stage(), Stage::Validating);
        assert_eq!(report.results[1].error().unwrap().stage(), Stage::Normalizing);
        assert_eq!(report.stats.failed, 2);
    }

    #[tokio::test]
    async fn unresolved_model_fails_each_document_at_extracting() {
        let docs = vec![
            LoadedInput::Document(SourceDocument::new("a.png", vec![1])),
            LoadedInput::Document(SourceDocument::new("b.txt", vec![1])),
            LoadedInput::Document(SourceDocument::new("c.jpg", vec![1])),
        ];
        let report = run_with_model(
            docs,
            &ExtractionConfig::default(),
            Err("no API key configured".into()),
        )
        .await;

        assert_eq!(report.len(), 3);
        let kinds: Vec<_> = report.results.iter().map(|r| r.error_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ErrorKind::ClientUnavailable),
                Some(ErrorKind::UnsupportedFormat),
                Some(ErrorKind::ClientUnavailable),
            ]
        );
        assert_eq!(report.results[0].error().unwrap().stage(), Stage::Extracting);
    }

    #[tokio::test]
    async fn empty_batch_is_empty_report() {
        let report = process(Vec::new(), &ExtractionConfig::default()).await;
        assert!(report.is_empty());
        assert_eq!(report.stats.total_documents, 0);
    }

    #[test]
    fn sync_wrapper_runs_batch() {
        let config = config_with(r#"{"fluid": "OIL"}"#);
        let report =
            process_sync(vec![SourceDocument::new("a.png", vec![1])], &config).unwrap();
        assert_eq!(
            report.results[0].parameters().unwrap().get("fluid"),
            Some("OIL")
        );
    }
}
