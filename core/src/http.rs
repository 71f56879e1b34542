//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe the single outgoing request and its response as
//! plain data. The dispatcher builds an `HttpRequest` and hands it to a
//! `Transport`; the transport performs the network round-trip and returns an
//! `HttpResponse`. Keeping the request as data makes the dispatch decisions
//! (escaping, form encoding, header merging) testable without a network.
//!
//! Headers are an ordered list of owned pairs. Lookups and replacements are
//! case-insensitive, as header names are on the wire.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const AUTHORIZATION: &str = "Authorization";

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// HTTP method for the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(ConfigError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by the dispatcher from a `RequestSpec`. `timeout` of `None` means
/// the transport applies no deadline.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Only 2xx counts as success; every other final status is reported as
    /// an HTTP status error.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Case-insensitive header lookup.
pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Replace the first header matching `name` (case-insensitive) or append it.
/// Any later duplicates of the same name are dropped.
pub fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: impl Into<String>) {
    let value = value.into();
    match headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(idx) => {
            headers[idx] = (name.to_string(), value);
            let mut seen = false;
            headers.retain(|(k, _)| {
                if !k.eq_ignore_ascii_case(name) {
                    return true;
                }
                let keep = !seen;
                seen = true;
                keep
            });
        }
        None => headers.push((name.to_string(), value)),
    }
}
