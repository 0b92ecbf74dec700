//! CLI binary for cylinder-params.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig`, prints one table per drawing and writes the
//! CSV or XLSX export.

use anyhow::{Context, Result};
use clap::Parser;
use cylinder_params::{
    export_table, process_inputs, render_report, BatchProgressCallback, ExportFormat,
    ExtractionConfig, MissingFieldPolicy, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar anchored at the bottom of the terminal
/// and one log line per drawing.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the drawing currently in flight.
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} drawings  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting parameters from {total} drawing(s)…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, filename: &str) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, filename: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            filename,
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, filename: &str, error: &str) {
        // Keep long provider errors on one line.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            filename,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} drawing(s) extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} drawing(s) extracted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print a parameter table for one drawing
  cylparams drawing.pdf

  # Several drawings, one CSV for the batch
  cylparams a.pdf b.png c.jpg -o parameters.csv

  # Every supported file in a directory, as a spreadsheet
  cylparams ./drawings -o parameters.xlsx

  # Azure OpenAI deployment
  cylparams --provider azure --model gpt-4o drawing.pdf

  # Fail drawings whose reply omits fields instead of writing NA
  cylparams --reject-incomplete drawing.pdf

  # Full report as JSON
  cylparams --json drawing.pdf > report.json

SUPPORTED INPUTS:
  .pdf (first page is rendered), .png, .jpg, .jpeg; local paths,
  directories and HTTP/HTTPS URLs. Other extensions are reported as
  UnsupportedFormat without contacting the model.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  AZURE_OPENAI_API_KEY    Azure OpenAI key (with AZURE_OPENAI_ENDPOINT)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  EDGEQUAKE_MODEL         Model used with EDGEQUAKE_LLM_PROVIDER
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Extract cylinder parameters from engineering drawings using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "cylparams",
    version,
    about = "Extract cylinder parameters from engineering drawings using Vision LLMs",
    long_about = "Read hydraulic and pneumatic cylinder drawings (PDF, PNG, JPEG) with a Vision \
Language Model and extract a fixed set of engineering parameters. Supports OpenAI, Azure OpenAI, \
Anthropic, Google Gemini and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Drawing files, directories or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the batch table to this file (`.xlsx` → spreadsheet, otherwise CSV).
    #[arg(short, long, env = "CYLPARAMS_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the full BatchReport as JSON instead of tables.
    #[arg(long, env = "CYLPARAMS_JSON")]
    json: bool,

    /// LLM model ID (default: gpt-4o).
    #[arg(long, env = "CYLPARAMS_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, azure, anthropic, gemini, ollama.
    #[arg(
        long,
        env = "CYLPARAMS_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, azure, anthropic, gemini, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Render scale for the first PDF page (0.5–8.0).
    #[arg(long, env = "CYLPARAMS_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality for rendered PDF pages (1–100).
    #[arg(long, env = "CYLPARAMS_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Max LLM output tokens per drawing.
    #[arg(long, env = "CYLPARAMS_MAX_TOKENS", default_value_t = 3000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CYLPARAMS_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Per-drawing LLM call timeout in seconds (default: none).
    #[arg(long, env = "CYLPARAMS_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CYLPARAMS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Fail a drawing when the reply omits fields instead of writing NA.
    #[arg(long, env = "CYLPARAMS_REJECT_INCOMPLETE")]
    reject_incomplete: bool,

    /// Disable progress bar.
    #[arg(long, env = "CYLPARAMS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CYLPARAMS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CYLPARAMS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let report = process_inputs(&cli.inputs, &config).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for table in render_report(&report) {
            writeln!(handle, "## {}\n\n{}", table.filename, table.body)
                .context("Failed to write to stdout")?;
        }
    }

    if let Some(ref output_path) = cli.output {
        if report.is_empty() {
            if !cli.quiet {
                eprintln!("{} no drawings found, {} not written", cyan("⚠"), output_path.display());
            }
        } else {
            export_table(&report)
                .write(output_path)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            if !cli.quiet {
                let label = match ExportFormat::from_path(output_path) {
                    ExportFormat::Xlsx => "XLSX",
                    ExportFormat::Csv => "CSV",
                };
                eprintln!("{}  {}  →  {}", green("✔"), label, bold(&output_path.display().to_string()));
            }
        }
    }

    if !cli.quiet && !cli.json {
        let stats = &report.stats;
        if show_progress {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&stats.total_input_tokens.to_string()),
                dim(&stats.total_output_tokens.to_string()),
                stats.total_duration_ms,
            );
        } else {
            eprintln!(
                "Extracted {}/{} drawing(s) in {}ms",
                stats.succeeded, stats.total_documents, stats.total_duration_ms
            );
            if stats.failed > 0 {
                eprintln!("  {} drawing(s) failed", stats.failed);
            }
        }
    }

    if !report.is_empty() && report.stats.succeeded == 0 {
        anyhow::bail!("all {} drawing(s) failed", report.len());
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let policy = if cli.reject_incomplete {
        MissingFieldPolicy::Reject
    } else {
        MissingFieldPolicy::Placeholder
    };

    let mut builder = ExtractionConfig::builder()
        .render_scale(cli.scale)
        .jpeg_quality(cli.quality)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .missing_fields(policy);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
