//! Integration tests for the extraction pipeline.
//!
//! A scripted [`VisionModel`] stands in for the provider, so these run
//! offline and without API keys. PDF cases only exercise failure paths, which
//! hold whether or not libpdfium is installed.

use async_trait::async_trait;
use cylinder_params::{
    export_table, process, process_inputs, render_report, BatchProgressCallback, DocumentError,
    ErrorKind, ExtractionConfig, MissingFieldPolicy, ModelCallError, ModelReply, ModelRequest,
    ParameterSchema, SourceDocument, VisionModel, MISSING_VALUE,
};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replies with the same text every time and counts calls.
struct ScriptedModel {
    reply: String,
    calls: AtomicUsize,
    mime_types_seen: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
            mime_types_seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.mime_types_seen
            .lock()
            .unwrap()
            .push(request.image.mime_type().to_string());
        Ok(ModelReply {
            content: self.reply.clone(),
            input_tokens: 1200,
            output_tokens: 300,
        })
    }
}

/// A reply filling every schema field.
fn complete_reply() -> String {
    let mut obj = serde_json::Map::new();
    for name in ParameterSchema::cylinder().names() {
        obj.insert(name.to_string(), json!(format!("{name} value")));
    }
    Value::Object(obj).to_string()
}

fn config_for(model: &Arc<ScriptedModel>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .provider(model.clone() as Arc<dyn VisionModel>)
        .build()
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        16,
        16,
        image::Rgb([255, 255, 255]),
    ));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

const ZERO_PAGE_PDF: &[u8] = b"%PDF-1.4\n\
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
2 0 obj << /Type /Pages /Kids [] /Count 0 >> endobj\n\
trailer << /Root 1 0 R >>\n\
%%EOF\n";

// ── Cardinality and order ────────────────────────────────────────────────────

#[tokio::test]
async fn one_result_per_document_in_upload_order() {
    let model = ScriptedModel::new(complete_reply());
    let docs = vec![
        SourceDocument::new("first.png", png_bytes()),
        SourceDocument::new("second.txt", b"notes".to_vec()),
        SourceDocument::new("third.pdf", b"garbage".to_vec()),
        SourceDocument::new("fourth.JPG", vec![0xFF, 0xD8, 0xFF, 0xE0]),
    ];

    let report = process(docs, &config_for(&model)).await;

    let names: Vec<_> = report.results.iter().map(|r| r.filename()).collect();
    assert_eq!(names, vec!["first.png", "second.txt", "third.pdf", "fourth.JPG"]);
    assert_eq!(report.stats.total_documents, 4);
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 2);
    assert_eq!(model.calls(), 2);
}

// ── Scenario: single valid drawing ───────────────────────────────────────────

#[tokio::test]
async fn complete_reply_yields_full_export_row() {
    let model = ScriptedModel::new(complete_reply());
    let report = process(
        vec![SourceDocument::new("cyl.png", png_bytes())],
        &config_for(&model),
    )
    .await;

    assert!(report.results[0].is_success());
    let params = report.results[0].parameters().unwrap();
    assert_eq!(params.len(), 23);
    assert!(params.placeholders().is_empty());

    let table = export_table(&report);
    assert_eq!(table.columns.len(), 1 + 23);
    assert_eq!(table.columns[0], "filename");
    assert!(!table.columns.iter().any(|c| c == "error"));
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.cell(0, "filename"), Some("cyl.png"));
    assert_eq!(table.cell(0, "bore_diameter"), Some("bore_diameter value"));

    let rendered = render_report(&report);
    assert!(rendered[0].body.starts_with("| Parameter | Value |"));
    assert!(rendered[0].body.contains("| Concentricity Of Rod And Tube |"));

    assert_eq!(model.mime_types_seen.lock().unwrap()[0], "image/png");
}

// ── Scenario: valid drawing plus unsupported file ────────────────────────────

#[tokio::test]
async fn unsupported_file_never_reaches_the_model() {
    let model = ScriptedModel::new(complete_reply());
    let report = process(
        vec![
            SourceDocument::new("cyl.png", png_bytes()),
            SourceDocument::new("readme.txt", b"hello".to_vec()),
        ],
        &config_for(&model),
    )
    .await;

    assert!(report.results[0].is_success());
    assert_eq!(
        report.results[1].error(),
        Some(&DocumentError::UnsupportedFormat {
            extension: "txt".into()
        })
    );
    assert_eq!(model.calls(), 1);

    let table = export_table(&report);
    assert_eq!(table.columns.last().map(String::as_str), Some("error"));
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.cell(1, "bore_diameter"), Some(""));
    assert!(table
        .cell(1, "error")
        .unwrap()
        .starts_with("Error (UnsupportedFormat)"));
}

// ── Scenario: corrupt and zero-page PDFs ─────────────────────────────────────

#[tokio::test]
async fn broken_pdfs_are_render_failures() {
    let model = ScriptedModel::new(complete_reply());
    let report = process(
        vec![
            SourceDocument::new("zero.pdf", ZERO_PAGE_PDF.to_vec()),
            SourceDocument::new("corrupt.pdf", b"\x00\x01not a pdf at all".to_vec()),
            SourceDocument::new("empty.pdf", Vec::new()),
        ],
        &config_for(&model),
    )
    .await;

    for result in &report.results {
        assert_eq!(
            result.error_kind(),
            Some(ErrorKind::RenderFailure),
            "{}",
            result.filename()
        );
    }
    assert_eq!(model.calls(), 0);
}

// ── Reply validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_reply_keeps_bounded_excerpt() {
    let model = ScriptedModel::new(format!("Here is the data: {}", "x".repeat(3000)));
    let report = process(
        vec![SourceDocument::new("cyl.png", png_bytes())],
        &config_for(&model),
    )
    .await;

    match report.results[0].error() {
        Some(DocumentError::MalformedReply { raw_excerpt, .. }) => {
            assert_eq!(raw_excerpt.chars().count(), 500);
            assert!(raw_excerpt.starts_with("Here is the data"));
        }
        other => panic!("expected MalformedReply, got {other:?}"),
    }
}

#[tokio::test]
async fn partial_reply_is_padded_by_default() {
    let model = ScriptedModel::new(json!({ "bore_diameter": "Ø160", "fluid": "OIL" }).to_string());
    let report = process(
        vec![SourceDocument::new("cyl.png", png_bytes())],
        &config_for(&model),
    )
    .await;

    let params = report.results[0].parameters().unwrap();
    assert_eq!(params.len(), 23);
    assert_eq!(params.get("bore_diameter"), Some("Ø160"));
    assert_eq!(params.get("rod_end"), Some(MISSING_VALUE));
    assert_eq!(params.placeholders().len(), 21);
}

#[tokio::test]
async fn partial_reply_fails_under_reject_policy() {
    let model = ScriptedModel::new(json!({ "bore_diameter": "Ø160" }).to_string());
    let config = ExtractionConfig::builder()
        .provider(model.clone() as Arc<dyn VisionModel>)
        .missing_fields(MissingFieldPolicy::Reject)
        .build()
        .unwrap();

    let report = process(vec![SourceDocument::new("cyl.png", png_bytes())], &config).await;

    match report.results[0].error() {
        Some(DocumentError::IncompleteReply { missing }) => {
            assert_eq!(missing.len(), 22);
            assert!(!missing.iter().any(|m| m == "bore_diameter"));
        }
        other => panic!("expected IncompleteReply, got {other:?}"),
    }
}

// ── Export ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_batch_exports_header_only() {
    let model = ScriptedModel::new(complete_reply());
    let report = process(Vec::new(), &config_for(&model)).await;

    let table = export_table(&report);
    assert_eq!(table.columns, vec!["filename"]);
    assert!(table.rows.is_empty());
    assert_eq!(table.to_csv().unwrap(), "filename\n");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn csv_written_for_loaded_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("a.png");
    std::fs::write(&png, png_bytes()).unwrap();
    let missing = dir.path().join("missing.jpg");

    let model = ScriptedModel::new(complete_reply());
    let inputs = vec![
        png.display().to_string(),
        missing.display().to_string(),
    ];
    let report = process_inputs(&inputs, &config_for(&model)).await;

    assert_eq!(report.len(), 2);
    assert!(report.results[0].is_success());
    assert_eq!(report.results[1].error_kind(), Some(ErrorKind::RenderFailure));

    let out = dir.path().join("params.csv");
    export_table(&report).write_csv(&out).unwrap();
    let csv = std::fs::read_to_string(&out).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("filename,bore_diameter,"));
    assert!(header.ends_with(",error"));
    assert_eq!(lines.count(), 2);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl BatchProgressCallback for EventLog {
    fn on_batch_start(&self, total: usize) {
        self.0.lock().unwrap().push(format!("batch {total}"));
    }
    fn on_document_start(&self, index: usize, _total: usize, filename: &str) {
        self.0.lock().unwrap().push(format!("start {index} {filename}"));
    }
    fn on_document_complete(&self, index: usize, _total: usize, _filename: &str) {
        self.0.lock().unwrap().push(format!("ok {index}"));
    }
    fn on_document_error(&self, index: usize, _total: usize, _filename: &str, _error: &str) {
        self.0.lock().unwrap().push(format!("err {index}"));
    }
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total}"));
    }
}

#[tokio::test]
async fn progress_events_follow_upload_order() {
    let model = ScriptedModel::new(complete_reply());
    let log = Arc::new(EventLog::default());
    let config = ExtractionConfig::builder()
        .provider(model.clone() as Arc<dyn VisionModel>)
        .progress_callback(log.clone() as Arc<dyn BatchProgressCallback>)
        .build()
        .unwrap();

    process(
        vec![
            SourceDocument::new("a.png", png_bytes()),
            SourceDocument::new("b.docx", b"x".to_vec()),
        ],
        &config,
    )
    .await;

    assert_eq!(
        *log.0.lock().unwrap(),
        vec![
            "batch 2",
            "start 1 a.png",
            "ok 1",
            "start 2 b.docx",
            "err 2",
            "done 1/2",
        ]
    );
}
