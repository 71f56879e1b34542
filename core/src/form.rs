//! Form payloads built from JSON-described fields and file attachments.
//!
//! # Design
//! Payloads are always `multipart/form-data`, encoded through the
//! `multipart` crate's lazy client. The prepared stream is drained into
//! memory before sending, so `Content-Length` is the exact byte length of
//! what goes on the wire. Attachments are opened read-only by `prepare`,
//! read once and closed before the request is sent.

use std::io::Read;
use std::path::{Path, PathBuf};

use multipart::client::lazy::Multipart;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::PayloadError;
use crate::http::{CONTENT_LENGTH, CONTENT_TYPE};

/// Parse `raw` as a JSON object. Anything else, including invalid JSON and
/// non-object JSON, yields an empty map.
pub fn parse_json_object(raw: Option<&str>) -> Map<String, Value> {
    match raw.map(|r| serde_json::from_str::<Value>(r)) {
        Some(Ok(Value::Object(map))) => map,
        _ => Map::new(),
    }
}

/// An encoded multipart body together with the headers describing it.
#[derive(Debug, Clone)]
pub struct FormPayload {
    boundary: String,
    body: Vec<u8>,
    value_fields: usize,
    file_fields: usize,
}

impl FormPayload {
    /// Encode every `data` entry as a value field and every `files` entry as
    /// an attachment read from the path it maps to. Value fields come first.
    pub fn build(data: &Map<String, Value>, files: &Map<String, Value>) -> Result<Self, PayloadError> {
        let values = data
            .iter()
            .map(|(name, value)| field_text(name, value).map(|text| (name.as_str(), text)))
            .collect::<Result<Vec<_>, _>>()?;

        let paths = files
            .iter()
            .map(|(name, path)| {
                path.as_str()
                    .map(|p| (name.as_str(), p))
                    .ok_or_else(|| PayloadError::InvalidPath(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut multipart = Multipart::new();
        for (name, text) in &values {
            multipart.add_text(*name, text.as_str());
        }
        for (name, path) in &paths {
            debug!(field = %name, path, "attaching file");
            multipart.add_file(*name, Path::new(path));
        }

        let mut prepared = multipart.prepare().map_err(|e| {
            let path = e
                .field_name
                .as_deref()
                .and_then(|field| paths.iter().find(|(name, _)| *name == field))
                .map(|(_, path)| PathBuf::from(*path))
                .unwrap_or_default();
            PayloadError::Io { path, source: e.error }
        })?;

        let boundary = prepared.boundary().to_string();
        let declared = prepared.content_len();
        let mut body = Vec::new();
        prepared.read_to_end(&mut body).map_err(PayloadError::Encode)?;

        if declared.is_some_and(|len| len != body.len() as u64) {
            warn!(?declared, actual = body.len(), "attachment size changed while encoding");
        }

        Ok(FormPayload {
            boundary,
            body,
            value_fields: values.len(),
            file_fields: paths.len(),
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn content_length(&self) -> u64 {
        self.body.len() as u64
    }

    pub fn value_fields(&self) -> usize {
        self.value_fields
    }

    pub fn file_fields(&self) -> usize {
        self.file_fields
    }

    /// Headers to merge into the request; they override any earlier
    /// `Content-Type`.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            (CONTENT_LENGTH.to_string(), self.content_length().to_string()),
            (CONTENT_TYPE.to_string(), self.content_type()),
        ]
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Scalar values become field text. Strings are sent raw, `null` as an empty
/// field.
fn field_text(name: &str, value: &Value) -> Result<String, PayloadError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) => Err(PayloadError::UnsupportedValue {
            field: name.to_string(),
            kind: "array",
        }),
        Value::Object(_) => Err(PayloadError::UnsupportedValue {
            field: name.to_string(),
            kind: "object",
        }),
    }
}
