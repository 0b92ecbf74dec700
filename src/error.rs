//! Error types for the cylinder-params library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the batch cannot proceed at all (invalid
//!   configuration, export file cannot be written). Returned as
//!   `Err(ExtractError)` from the top-level functions.
//!
//! * [`DocumentError`] — **Non-fatal**: a single drawing failed (bad format,
//!   render glitch, provider error, unparseable reply) but every other
//!   drawing in the batch is unaffected. Stored inside
//!   [`crate::output::ExtractionResult::Failure`].

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cylinder-params library.
///
/// Per-document failures use [`DocumentError`] and are stored in the
/// [`crate::output::BatchReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write the export file.
    #[error("Failed to write export file '{path}': {source}")]
    ExportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV writer rejected a record.
    #[error("Failed to encode CSV export: {0}")]
    CsvEncoding(#[from] csv::Error),

    /// The XLSX writer rejected the workbook.
    #[error("Failed to encode XLSX export: {0}")]
    XlsxEncoding(#[from] rust_xlsxwriter::XlsxError),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure classes a single document can end in.
///
/// `Display` yields the bare variant name, which is what the presenter and
/// the CSV `error` column show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnsupportedFormat,
    RenderFailure,
    ClientUnavailable,
    RequestFailure,
    MalformedReply,
    IncompleteReply,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::RenderFailure => "RenderFailure",
            ErrorKind::ClientUnavailable => "ClientUnavailable",
            ErrorKind::RequestFailure => "RequestFailure",
            ErrorKind::MalformedReply => "MalformedReply",
            ErrorKind::IncompleteReply => "IncompleteReply",
        };
        f.write_str(s)
    }
}

/// Pipeline stage a document is in. Failures record the stage they occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalizing,
    Extracting,
    Validating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Normalizing => "normalizing",
            Stage::Extracting => "extracting",
            Stage::Validating => "validating",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// A non-fatal error for a single document.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentError {
    /// Extension is not one of pdf, png, jpg, jpeg.
    #[error(
        "unsupported file type {} (expected pdf, png, jpg or jpeg)",
        describe_extension(extension)
    )]
    UnsupportedFormat { extension: String },

    /// The document could not be turned into an image.
    #[error("rasterisation failed: {detail}")]
    RenderFailure { detail: String },

    /// No vision model is configured or one could not be constructed.
    #[error("vision model unavailable: {detail}")]
    ClientUnavailable { detail: String },

    /// The model call failed at the transport or provider layer.
    #[error("model request failed: {detail}")]
    RequestFailure { detail: String },

    /// The reply is not a JSON object.
    ///
    /// `raw_excerpt` holds at most `diagnostic_limit` characters of the reply.
    #[error("model reply is not a valid JSON object: {detail}")]
    MalformedReply { detail: String, raw_excerpt: String },

    /// The reply omitted schema fields and the reject policy is active.
    #[error("model reply is missing {} field(s): {}", missing.len(), missing.join(", "))]
    IncompleteReply { missing: Vec<String> },
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            DocumentError::RenderFailure { .. } => ErrorKind::RenderFailure,
            DocumentError::ClientUnavailable { .. } => ErrorKind::ClientUnavailable,
            DocumentError::RequestFailure { .. } => ErrorKind::RequestFailure,
            DocumentError::MalformedReply { .. } => ErrorKind::MalformedReply,
            DocumentError::IncompleteReply { .. } => ErrorKind::IncompleteReply,
        }
    }

    /// The stage in which this error is raised.
    pub fn stage(&self) -> Stage {
        match self {
            DocumentError::UnsupportedFormat { .. } | DocumentError::RenderFailure { .. } => {
                Stage::Normalizing
            }
            DocumentError::ClientUnavailable { .. } | DocumentError::RequestFailure { .. } => {
                Stage::Extracting
            }
            DocumentError::MalformedReply { .. } | DocumentError::IncompleteReply { .. } => {
                Stage::Validating
            }
        }
    }

    pub(crate) fn render(detail: impl Into<String>) -> Self {
        DocumentError::RenderFailure {
            detail: detail.into(),
        }
    }
}

fn describe_extension(extension: &str) -> String {
    if extension.is_empty() {
        "(no extension)".to_string()
    } else {
        format!("'.{extension}'")
    }
}
