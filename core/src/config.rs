//! Configuration assembly: raw string inputs in, immutable `RequestSpec` out.
//!
//! # Design
//! Inputs are read through the `InputSource` trait so the assembler never
//! touches process state directly. The binary backs it with the environment;
//! tests back it with a map. Only a missing `url` or an unknown `method` is
//! fatal. Every other malformed value degrades to its default with a log line;
//! a malformed `customHeaders` is also kept in `input_errors` so the
//! dispatcher can surface it as a pipeline error annotation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::ConfigError;
use crate::http::{self, HttpMethod, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_DATA: &str = "{}";
pub const DEFAULT_FILES: &str = "{}";

/// Names of the inputs read by `RequestSpec::from_inputs`.
pub mod inputs {
    pub const URL: &str = "url";
    pub const METHOD: &str = "method";
    pub const CONTENT_TYPE: &str = "contentType";
    pub const DATA: &str = "data";
    pub const FILES: &str = "files";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const BEARER_TOKEN: &str = "bearerToken";
    pub const CUSTOM_HEADERS: &str = "customHeaders";
    pub const TIMEOUT: &str = "timeout";
    pub const IGNORE_STATUS_CODES: &str = "ignoreStatusCodes";
    pub const PREVENT_FAILURE_ON_NO_RESPONSE: &str = "preventFailureOnNoResponse";
    pub const ESCAPE_DATA: &str = "escapeData";
}

/// Source of string-typed inputs.
///
/// Implementations return `None` for inputs that are unset. Values are
/// trimmed by `RequestSpec::from_inputs`, and an empty result counts as unset.
pub trait InputSource {
    fn input(&self, name: &str) -> Option<String>;
}

impl InputSource for HashMap<String, String> {
    fn input(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl InputSource for HashMap<&str, &str> {
    fn input(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.to_string())
    }
}

/// HTTP basic auth credentials. Either half may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

/// The single request this invocation sends, fully resolved from inputs.
///
/// `body` and `files` keep their raw JSON text: whether they are parsed at
/// all depends on the form-encoding decision made at dispatch time.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub base_url: String,
    pub timeout_ms: u64,
    pub headers: Vec<(String, String)>,
    pub auth: Option<BasicAuth>,
    pub body: String,
    pub files: String,
    pub content_type: String,
    pub escape_data: bool,
    pub ignored_status_codes: BTreeSet<u16>,
    pub prevent_failure_on_no_response: bool,
    /// Non-fatal input problems, reported as errors before sending.
    pub input_errors: Vec<String>,
}

/// Redacted view of a `RequestSpec` used for debug output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig<'a> {
    pub base_url: &'a str,
    pub timeout: u64,
    pub headers: BTreeMap<String, String>,
}

impl RequestSpec {
    pub fn from_inputs<S: InputSource + ?Sized>(source: &S) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            source
                .input(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get(inputs::URL).ok_or(ConfigError::MissingInput(inputs::URL))?;

        let method = match get(inputs::METHOD) {
            Some(m) => m.parse()?,
            None => HttpMethod::Post,
        };

        let content_type = get(inputs::CONTENT_TYPE).unwrap_or_else(|| APPLICATION_JSON.to_string());

        let mut headers = vec![(CONTENT_TYPE.to_string(), content_type.clone())];

        let username = get(inputs::USERNAME);
        let password = get(inputs::PASSWORD);
        let auth = if username.is_some() || password.is_some() {
            debug!("adding basic auth configuration");
            Some(BasicAuth {
                username: username.unwrap_or_default(),
                password: password.unwrap_or_default(),
            })
        } else {
            None
        };

        if let Some(token) = get(inputs::BEARER_TOKEN) {
            http::set_header(&mut headers, AUTHORIZATION, format!("Bearer {token}"));
        }

        let mut input_errors = Vec::new();
        if let Some(raw) = get(inputs::CUSTOM_HEADERS) {
            match parse_custom_headers(&raw) {
                Ok(custom) => {
                    for (name, value) in custom {
                        http::set_header(&mut headers, &name, value);
                    }
                }
                Err(e) => {
                    error!(error = %e, "could not parse customHeaders string value");
                    input_errors.push(format!("Could not parse customHeaders string value: {e}"));
                }
            }
        }

        let timeout_ms = match get(inputs::TIMEOUT) {
            Some(raw) => parse_timeout(&raw),
            None => DEFAULT_TIMEOUT_MS,
        };

        let ignored_status_codes = get(inputs::IGNORE_STATUS_CODES)
            .map(|raw| parse_status_codes(&raw))
            .unwrap_or_default();

        Ok(RequestSpec {
            method,
            base_url,
            timeout_ms,
            headers,
            auth,
            body: get(inputs::DATA).unwrap_or_else(|| DEFAULT_DATA.to_string()),
            files: get(inputs::FILES).unwrap_or_else(|| DEFAULT_FILES.to_string()),
            content_type,
            escape_data: get(inputs::ESCAPE_DATA).is_some_and(|v| parse_flag(&v)),
            ignored_status_codes,
            prevent_failure_on_no_response: get(inputs::PREVENT_FAILURE_ON_NO_RESPONSE)
                .is_some_and(|v| parse_flag(&v)),
            input_errors,
        })
    }

    /// Headers with credentials masked, for logging.
    pub fn redacted_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case(AUTHORIZATION) {
                    (k.clone(), "***".to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }

    pub fn instance_config(&self) -> InstanceConfig<'_> {
        InstanceConfig {
            base_url: &self.base_url,
            timeout: self.timeout_ms,
            headers: self.redacted_headers().into_iter().collect(),
        }
    }
}

/// Parse `customHeaders` as a JSON object. Scalar values are stringified,
/// other values are skipped.
fn parse_custom_headers(raw: &str) -> Result<Vec<(String, String)>, serde_json::Error> {
    let map = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw)?;

    Ok(map
        .into_iter()
        .filter_map(|(name, value)| match value {
            serde_json::Value::String(s) => Some((name, s)),
            serde_json::Value::Number(n) => Some((name, n.to_string())),
            serde_json::Value::Bool(b) => Some((name, b.to_string())),
            other => {
                warn!(header = %name, value = %other, "skipping custom header with non-scalar value");
                None
            }
        })
        .collect())
}

fn parse_timeout(raw: &str) -> u64 {
    raw.parse().unwrap_or_else(|_| {
        warn!(timeout = raw, "timeout is not a non-negative integer, using {DEFAULT_TIMEOUT_MS} ms");
        DEFAULT_TIMEOUT_MS
    })
}

/// Comma-separated status codes. Empty and unparseable entries are skipped.
fn parse_status_codes(raw: &str) -> BTreeSet<u16> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<u16>() {
            Ok(code) => Some(code),
            Err(_) => {
                warn!(entry, "ignoring invalid status code in ignoreStatusCodes");
                None
            }
        })
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}
