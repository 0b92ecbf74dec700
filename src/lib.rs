//! # cylinder-params
//!
//! Extract structured engineering parameters from hydraulic and pneumatic
//! cylinder drawings using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Cylinder drawings carry their key figures (bore, rod, stroke, pressures,
//! materials) as dimension callouts, title-block entries and free-form notes.
//! Text extraction loses the geometry that gives those numbers meaning. This
//! crate rasterises the first page of each drawing and lets a VLM read it the
//! way an engineer would, constrained by a fixed 23-field schema and a body
//! of domain rules in the prompt.
//!
//! ## Pipeline Overview
//!
//! ```text
//! drawing (PDF / PNG / JPEG)
//!  │
//!  ├─ 1. Input      local file, directory or URL → bytes
//!  ├─ 2. Normalize  PDF page 1 → JPEG via pdfium (spawn_blocking); images pass through
//!  ├─ 3. Extract    one VLM call: system prompt + rules + JSON schema + image
//!  ├─ 4. Validate   strict JSON parse, schema completeness
//!  └─ 5. Present    Markdown table per file, one CSV/XLSX for the batch
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cylinder_params::{export_table, process_inputs, render_report, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / EDGEQUAKE_LLM_PROVIDER / …
//!     let config = ExtractionConfig::default();
//!     let report = process_inputs(&["drawing.pdf".to_string()], &config).await;
//!     for table in render_report(&report) {
//!         println!("## {}\n{}", table.filename, table.body);
//!     }
//!     export_table(&report).write_csv("parameters.csv")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cylparams` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cylinder-params = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process, process_inputs, process_sync, resolve_model};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, MissingFieldPolicy, MISSING_VALUE};
pub use error::{DocumentError, ErrorKind, ExtractError, Stage};
pub use output::{BatchReport, BatchStats, ExtractionResult, ParameterRecord};
pub use pipeline::client::{LlmVisionModel, ModelCallError, ModelReply, ModelRequest, VisionModel};
pub use pipeline::encode::RenderedImage;
pub use pipeline::input::{DocumentKind, SourceDocument};
pub use present::{
    export_table, render_report, render_result, ExportFormat, ExportTable, RenderedTable,
};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schema::{field_label, FieldDef, ParameterSchema};
