//! Result types produced by a batch.

use crate::error::{DocumentError, ErrorKind};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Validated parameters for one drawing: every schema field, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterRecord {
    values: Vec<(String, String)>,
    placeholders: Vec<String>,
}

impl ParameterRecord {
    pub(crate) fn new(values: Vec<(String, String)>, placeholders: Vec<String>) -> Self {
        Self {
            values,
            placeholders,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v.as_str())
    }

    /// `(field, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fields the model omitted that were filled with the placeholder value.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }
}

/// Serialises as a JSON object in schema order.
impl Serialize for ParameterRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Outcome for exactly one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success {
        filename: String,
        parameters: ParameterRecord,
        /// Schema fields filled with the placeholder.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        placeholders: Vec<String>,
    },
    Failure {
        filename: String,
        error: DocumentError,
    },
}

impl ExtractionResult {
    pub fn success(filename: impl Into<String>, parameters: ParameterRecord) -> Self {
        let placeholders = parameters.placeholders().to_vec();
        ExtractionResult::Success {
            filename: filename.into(),
            parameters,
            placeholders,
        }
    }

    pub fn failure(filename: impl Into<String>, error: DocumentError) -> Self {
        ExtractionResult::Failure {
            filename: filename.into(),
            error,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            ExtractionResult::Success { filename, .. } | ExtractionResult::Failure { filename, .. } => {
                filename
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }

    pub fn parameters(&self) -> Option<&ParameterRecord> {
        match self {
            ExtractionResult::Success { parameters, .. } => Some(parameters),
            ExtractionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&DocumentError> {
        match self {
            ExtractionResult::Success { .. } => None,
            ExtractionResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(DocumentError::kind)
    }
}

/// Aggregate numbers for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// One result per document, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<ExtractionResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}
