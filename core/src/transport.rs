//! The network seam: executes one `HttpRequest` and returns its response.
//!
//! # Design
//! `Transport` is the only place that performs I/O against the remote
//! service. The dispatcher depends on the trait, so tests can substitute a
//! scripted transport, while the binary uses `UreqTransport`.
//!
//! Every final status comes back as `Ok(HttpResponse)`; interpreting 4xx/5xx
//! is the dispatcher's job. `Err` is reserved for requests that were never
//! sent or that got no response at all.

use std::io::ErrorKind;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a fresh `ureq` agent per request.
///
/// Redirects are followed with ureq's defaults. Response bodies are read
/// without a size limit.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(timeout: Option<Duration>) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = Self::agent(request.timeout);
        let url = request.url.as_str();
        let headers = request.headers.as_slice();

        info!(method = %request.method, url, "sending request");

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(agent.get(url), headers).call(),
            (HttpMethod::Delete, None) => with_headers(agent.delete(url), headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers(agent.delete(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Post, Some(body)) => with_headers(agent.post(url), headers).send(body),
            (HttpMethod::Post, None) => with_headers(agent.post(url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(agent.put(url), headers).send(body),
            (HttpMethod::Put, None) => with_headers(agent.put(url), headers).send_empty(),
            (HttpMethod::Patch, Some(body)) => with_headers(agent.patch(url), headers).send(body),
            (HttpMethod::Patch, None) => with_headers(agent.patch(url), headers).send_empty(),
        };

        let mut response = result.map_err(classify)?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(classify)?;

        debug!(status, bytes = bytes.len(), "response received");

        Ok(HttpResponse {
            status,
            headers: response_headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder
}

/// Split ureq failures into "never sent" and "sent, no response".
fn classify(err: ureq::Error) -> TransportError {
    let message = err.to_string();
    let code = match &err {
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => {
            return TransportError::NotSent {
                code: "ERR_BAD_REQUEST",
                message,
            };
        }
        ureq::Error::Timeout(_) => "ETIMEDOUT",
        ureq::Error::HostNotFound => "ENOTFOUND",
        ureq::Error::ConnectionFailed => "ECONNREFUSED",
        ureq::Error::Io(e) => match e.kind() {
            ErrorKind::ConnectionRefused => "ECONNREFUSED",
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => "ECONNRESET",
            ErrorKind::TimedOut | ErrorKind::WouldBlock => "ETIMEDOUT",
            _ => "ERR_NETWORK",
        },
        _ => "ERR_NETWORK",
    };
    TransportError::NoResponse { code, message }
}

/// Structured view of a failed request, published as the `requestError`
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportErrorReport {
    pub message: String,
    pub name: &'static str,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub method: &'static str,
    pub url: String,
    pub timeout: u64,
}

impl TransportErrorReport {
    pub fn from_error(err: &TransportError, request: &HttpRequest) -> Self {
        Self {
            message: err.to_string(),
            name: "TransportError",
            code: err.code().to_string(),
            status: None,
            method: request.method.as_str(),
            url: request.url.clone(),
            timeout: timeout_ms(request),
        }
    }

    pub fn from_status(response: &HttpResponse, request: &HttpRequest) -> Self {
        let code = if response.status >= 500 {
            "ERR_BAD_RESPONSE"
        } else {
            "ERR_BAD_REQUEST"
        };
        Self {
            message: format!("Request failed with status code {}", response.status),
            name: "TransportError",
            code: code.to_string(),
            status: Some(response.status),
            method: request.method.as_str(),
            url: request.url.clone(),
            timeout: timeout_ms(request),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"message\":{:?}}}", self.message))
    }
}

fn timeout_ms(request: &HttpRequest) -> u64 {
    request.timeout.map(|t| t.as_millis() as u64).unwrap_or(0)
}
