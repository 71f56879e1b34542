//! End-to-end dispatch against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, builds a `RequestSpec` from
//! inputs, and dispatches through `UreqTransport` over real HTTP. Assertions
//! are made on the `Outcome` and on what the `RecordingReporter` captured.

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;

use dispatch_core::outcome::NO_RESPONSE_MESSAGE;
use dispatch_core::{dispatch, Outcome, RecordingReporter, RequestSpec, UreqTransport};
use mock_server::{Echo, Upload};

/// Start the mock server on a random port in a background thread.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn run(inputs: &[(&str, &str)]) -> (Outcome, RecordingReporter) {
    let source: HashMap<&str, &str> = inputs.iter().copied().collect();
    let spec = RequestSpec::from_inputs(&source).unwrap();
    let mut reporter = RecordingReporter::new();
    let outcome = dispatch(&spec, &UreqTransport::new(), &mut reporter);
    (outcome, reporter)
}

fn response<T: serde::de::DeserializeOwned>(reporter: &RecordingReporter) -> T {
    serde_json::from_str(reporter.output("response").expect("response output")).unwrap()
}

#[test]
fn post_json_succeeds() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    let (outcome, reporter) = run(&[("url", url.as_str()), ("method", "POST"), ("data", r#"{"a":1}"#), ("files", "{}")]);

    assert!(matches!(outcome, Outcome::Success(_)));
    assert!(!reporter.failed());
    let echo: Echo = response(&reporter);
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, r#"{"a":1}"#);
    assert_eq!(echo.headers["content-type"], "application/json");
}

#[test]
fn get_sends_no_body() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    let (_, reporter) = run(&[("url", url.as_str()), ("method", "GET"), ("data", r#"{"ignored":true}"#)]);

    let echo: Echo = response(&reporter);
    assert_eq!(echo.method, "GET");
    assert!(echo.body.is_empty());
}

#[test]
fn custom_headers_and_bearer_reach_server() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    let (_, reporter) = run(&[
        ("url", url.as_str()),
        ("bearerToken", "tok"),
        ("customHeaders", r#"{"X-Run-Id":"42"}"#),
    ]);

    let echo: Echo = response(&reporter);
    assert_eq!(echo.headers["authorization"], "Bearer tok");
    assert_eq!(echo.headers["x-run-id"], "42");
}

#[test]
fn basic_auth_reaches_server() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    let (_, reporter) = run(&[("url", url.as_str()), ("username", "user"), ("password", "pass")]);

    let echo: Echo = response(&reporter);
    assert_eq!(echo.headers["authorization"], "Basic dXNlcjpwYXNz");
}

#[test]
fn files_are_uploaded_as_multipart() {
    let addr = start_server();
    let url = format!("http://{addr}/upload");
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(b"attachment body").unwrap();
    let files = serde_json::json!({ "file1": file.path() }).to_string();

    let (outcome, reporter) = run(&[("url", url.as_str()), ("files", files.as_str()), ("data", r#"{"name":"n"}"#)]);

    assert!(matches!(outcome, Outcome::Success(_)), "{outcome:?}");
    let upload: Upload = response(&reporter);
    assert_eq!(upload.fields.len(), 1);
    assert_eq!(upload.fields["name"], "n");
    assert_eq!(upload.files.len(), 1);
    let uploaded = &upload.files["file1"];
    assert_eq!(uploaded.content, "attachment body");
    assert_eq!(uploaded.content_type.as_deref(), Some("text/plain"));
    assert!(upload.content_length.is_some());
}

#[test]
fn multipart_content_length_is_exact() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"0123456789").unwrap();
    let files = serde_json::json!({ "a": file.path() }).to_string();

    let (_, reporter) = run(&[("url", url.as_str()), ("files", files.as_str()), ("data", r#"{"x":"1","y":"2"}"#)]);

    let echo: Echo = response(&reporter);
    assert!(echo.headers["content-type"].starts_with("multipart/form-data; boundary="));
    let declared: usize = echo.headers["content-length"].parse().unwrap();
    assert_eq!(declared, echo.length);
}

#[test]
fn urlencoded_without_files_posts_multipart_fields() {
    let addr = start_server();
    let url = format!("http://{addr}/upload");

    let (outcome, reporter) = run(&[
        ("url", url.as_str()),
        ("contentType", "application/x-www-form-urlencoded"),
        ("data", r#"{"name":"a b","count":2}"#),
    ]);

    assert!(matches!(outcome, Outcome::Success(_)), "{outcome:?}");
    let upload: Upload = response(&reporter);
    assert_eq!(upload.fields["name"], "a b");
    assert_eq!(upload.fields["count"], "2");
    assert!(upload.files.is_empty());
}

#[test]
fn get_with_files_is_sent_without_body() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"0123456789").unwrap();
    let files = serde_json::json!({ "a": file.path() }).to_string();

    let (outcome, reporter) = run(&[
        ("url", url.as_str()),
        ("method", "GET"),
        ("files", files.as_str()),
        ("timeout", "1500"),
    ]);

    assert!(matches!(outcome, Outcome::Success(_)), "{outcome:?}");
    let echo: Echo = response(&reporter);
    assert_eq!(echo.method, "GET");
    assert!(echo.body.is_empty());
    assert!(!echo.headers.contains_key("content-length") || echo.headers["content-length"] == "0");
}

#[test]
fn ignored_status_warns() {
    let addr = start_server();
    let url = format!("http://{addr}/status/404");

    let (outcome, reporter) = run(&[("url", url.as_str()), ("ignoreStatusCodes", "404,500")]);

    assert!(matches!(outcome, Outcome::WarningIgnoredStatus { code: 404, .. }));
    assert!(!reporter.failed());
    let warnings = reporter.warnings();
    assert_eq!(warnings.len(), 1);
    let warning: serde_json::Value = serde_json::from_str(warnings[0]).unwrap();
    assert_eq!(warning["code"], 404);
    assert_eq!(warning["message"]["error"], "status 404");
    assert!(reporter.output("requestError").is_some());
}

#[test]
fn unlisted_status_fails() {
    let addr = start_server();
    let url = format!("http://{addr}/status/404");

    let (outcome, reporter) = run(&[("url", url.as_str()), ("ignoreStatusCodes", "")]);

    assert!(matches!(outcome, Outcome::FailureHttpStatus { code: 404, .. }));
    let failures = reporter.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0], r#"{"code":404,"message":{"error":"status 404"}}"#);
}

#[test]
fn plain_text_response_is_json_string() {
    let addr = start_server();
    let url = format!("http://{addr}/text");

    let (_, reporter) = run(&[("url", url.as_str()), ("method", "GET")]);

    assert_eq!(reporter.output("response"), Some(r#""plain response""#));
}

#[test]
fn connection_refused_is_no_response() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let url = format!("http://{addr}/echo");

    let (outcome, reporter) = run(&[("url", url.as_str())]);

    assert_eq!(outcome, Outcome::FailureNoResponse);
    assert_eq!(
        reporter.failures(),
        vec![format!(r#"{{"error":"{NO_RESPONSE_MESSAGE}"}}"#).as_str()]
    );
    assert!(reporter.output("requestError").is_some());
}

#[test]
fn timeout_is_no_response() {
    let addr = start_server();
    let url = format!("http://{addr}/slow/2000");

    let (outcome, reporter) = run(&[("url", url.as_str()), ("timeout", "200"), ("preventFailureOnNoResponse", "true")]);

    assert!(matches!(outcome, Outcome::WarningNoResponse(_)), "{outcome:?}");
    assert!(!reporter.failed());
    let error: serde_json::Value = serde_json::from_str(reporter.output("requestError").unwrap()).unwrap();
    assert_eq!(error["code"], "ETIMEDOUT");
}

#[test]
fn invalid_url_is_other_failure() {
    let (outcome, reporter) = run(&[("url", "not a url"), ("data", r#"{"k":"v"}"#)]);

    assert!(matches!(outcome, Outcome::FailureOther { .. }), "{outcome:?}");
    let failure: serde_json::Value = serde_json::from_str(reporter.failures()[0]).unwrap();
    assert_eq!(failure["data"], r#"{"k":"v"}"#);
}
