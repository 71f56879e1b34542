//! Turns a `RequestSpec` into exactly one request and exactly one `Outcome`.
//!
//! # Design
//! `dispatch` is linear: escape, drop GET bodies, optionally form-encode,
//! send once, classify. Every error raised on the way is folded into the
//! returned `Outcome` and reported through the `Reporter` before returning;
//! nothing is retried and nothing propagates.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::config::RequestSpec;
use crate::escape::escape_newlines_in_strings;
use crate::form::{parse_json_object, FormPayload};
use crate::http::{self, HttpMethod, HttpRequest, AUTHORIZATION, FORM_URLENCODED};
use crate::outcome::{response_payload, Outcome, REQUEST_ERROR_OUTPUT};
use crate::reporter::Reporter;
use crate::transport::{Transport, TransportErrorReport};

/// Send the request described by `spec` and report its outcome.
pub fn dispatch(spec: &RequestSpec, transport: &dyn Transport, reporter: &mut dyn Reporter) -> Outcome {
    let outcome = run(spec, transport, reporter);
    if outcome.is_failure() {
        warn!(?outcome, "request dispatch failed");
    }
    outcome.report(reporter);
    outcome
}

fn run(spec: &RequestSpec, transport: &dyn Transport, reporter: &mut dyn Reporter) -> Outcome {
    for message in &spec.input_errors {
        reporter.error(message);
    }

    let mut data = Some(if spec.escape_data {
        escape_newlines_in_strings(&spec.body)
    } else {
        spec.body.clone()
    });

    if spec.method == HttpMethod::Get {
        data = None;
    }

    let mut headers = spec.headers.clone();
    let mut body = data.clone().map(String::into_bytes);

    let form = needs_form_encoding(spec);
    if form && spec.method == HttpMethod::Get {
        debug!("GET request carries no body, skipping form encoding");
    } else if form {
        reporter.debug("attempting to convert JSON data to form-urlencoded");
        let files = parse_json_object(Some(&spec.files));
        let fields = parse_json_object(data.as_deref());

        if !files.is_empty() || spec.content_type == FORM_URLENCODED {
            match FormPayload::build(&fields, &files) {
                Ok(payload) => {
                    debug!(
                        values = payload.value_fields(),
                        files = payload.file_fields(),
                        length = payload.content_length(),
                        "form payload built"
                    );
                    for (name, value) in payload.headers() {
                        http::set_header(&mut headers, &name, value);
                    }
                    body = Some(payload.into_body());
                }
                Err(e) => {
                    return Outcome::FailurePayload {
                        message: e.to_string(),
                        data: fields,
                        files,
                    };
                }
            }
        }
    }

    if let Some(auth) = &spec.auth {
        http::set_header(&mut headers, AUTHORIZATION, auth.header_value());
    }

    let request = HttpRequest {
        method: spec.method,
        url: spec.base_url.clone(),
        headers,
        body,
        timeout: (spec.timeout_ms > 0).then(|| Duration::from_millis(spec.timeout_ms)),
    };

    reporter.debug(&format!(
        "Instance Configuration: {}",
        serde_json::to_string(&spec.instance_config()).unwrap_or_default()
    ));
    reporter.debug(&format!(
        "Request Data: {}",
        json!({
            "auth": spec.auth.as_ref().map(|a| json!({ "username": a.username, "password": "***" })),
            "method": spec.method.as_str(),
            "data": data,
        })
    ));

    let response = match transport.send(&request) {
        Ok(response) => response,
        Err(err) => {
            let report = TransportErrorReport::from_error(&err, &request);
            reporter.set_output(REQUEST_ERROR_OUTPUT, &report.to_json());
            if !err.is_no_response() {
                return Outcome::FailureOther {
                    message: err.to_string(),
                    data,
                };
            }
            if spec.prevent_failure_on_no_response {
                return Outcome::WarningNoResponse(report.to_json());
            }
            return Outcome::FailureNoResponse;
        }
    };

    let payload = response_payload(&response.body);

    if response.is_success() {
        return Outcome::Success(payload);
    }

    let report = TransportErrorReport::from_status(&response, &request);
    reporter.set_output(REQUEST_ERROR_OUTPUT, &report.to_json());

    if spec.ignored_status_codes.contains(&response.status) {
        Outcome::WarningIgnoredStatus {
            code: response.status,
            payload,
        }
    } else {
        Outcome::FailureHttpStatus {
            code: response.status,
            payload,
        }
    }
}

/// Form encoding is considered when a files mapping was given or the
/// content type asks for a form.
fn needs_form_encoding(spec: &RequestSpec) -> bool {
    let files = spec.files.trim();
    (!files.is_empty() && files != "{}") || spec.content_type == FORM_URLENCODED
}
