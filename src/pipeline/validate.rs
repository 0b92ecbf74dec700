//! Reply validation: raw model text → [`ParameterRecord`].
//!
//! Parsing is strict. A reply wrapped in Markdown fences or followed by
//! commentary is malformed; the prompt already demands a bare JSON object and
//! repairing replies would hide provider regressions.
//!
//! The schema decides which keys survive: unknown keys are dropped, missing
//! keys are handled by [`MissingFieldPolicy`].

use crate::config::{MissingFieldPolicy, MISSING_VALUE};
use crate::error::DocumentError;
use crate::output::ParameterRecord;
use crate::schema::ParameterSchema;
use serde_json::Value;
use tracing::{debug, warn};

/// Validate one raw reply against `schema`.
///
/// `diagnostic_limit` bounds the characters of `raw` kept in a
/// `MalformedReply` error.
pub fn validate(
    raw: &str,
    schema: &ParameterSchema,
    policy: MissingFieldPolicy,
    diagnostic_limit: usize,
) -> Result<ParameterRecord, DocumentError> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| DocumentError::MalformedReply {
        detail: e.to_string(),
        raw_excerpt: excerpt(raw, diagnostic_limit),
    })?;

    let Value::Object(object) = parsed else {
        return Err(DocumentError::MalformedReply {
            detail: format!("expected a JSON object, got {}", json_type_name(&parsed)),
            raw_excerpt: excerpt(raw, diagnostic_limit),
        });
    };

    for key in object.keys().filter(|k| !schema.contains(k)) {
        debug!("Ignoring key '{}' not in schema", key);
    }

    let mut values = Vec::with_capacity(schema.len());
    let mut missing = Vec::new();

    for name in schema.names() {
        match object.get(name).and_then(value_text) {
            Some(text) => values.push((name.to_string(), text)),
            None => {
                missing.push(name.to_string());
                values.push((name.to_string(), MISSING_VALUE.to_string()));
            }
        }
    }

    if !missing.is_empty() {
        match policy {
            MissingFieldPolicy::Reject => {
                return Err(DocumentError::IncompleteReply { missing });
            }
            MissingFieldPolicy::Placeholder => {
                warn!(
                    "Reply omitted {} field(s), filled with '{}': {}",
                    missing.len(),
                    MISSING_VALUE,
                    missing.join(", ")
                );
            }
        }
    }

    Ok(ParameterRecord::new(values, missing))
}

/// Strings verbatim; numbers and booleans as their JSON text; `null` and
/// nested values count as missing.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// First `limit` characters of `raw`.
fn excerpt(raw: &str, limit: usize) -> String {
    raw.chars().take(limit).collect()
}
