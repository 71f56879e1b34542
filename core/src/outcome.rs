//! Terminal classification of a dispatch and its single reporting action.

use serde_json::{json, Map, Value};

use crate::reporter::Reporter;

pub const RESPONSE_OUTPUT: &str = "response";
pub const REQUEST_ERROR_OUTPUT: &str = "requestError";
pub const NO_RESPONSE_MESSAGE: &str = "no response received";

/// What happened to the one request of this invocation.
///
/// Response payloads are held as JSON: bodies that parse as JSON keep their
/// structure, anything else is a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx response.
    Success(Value),
    /// Non-2xx status listed in `ignoreStatusCodes`.
    WarningIgnoredStatus { code: u16, payload: Value },
    /// Non-2xx status not listed in `ignoreStatusCodes`.
    FailureHttpStatus { code: u16, payload: Value },
    /// Request sent, nothing came back, and failures were not suppressed.
    FailureNoResponse,
    /// Request sent, nothing came back, suppressed to a warning. Carries the
    /// serialized error report.
    WarningNoResponse(String),
    /// The request could not be sent at all.
    FailureOther { message: String, data: Option<String> },
    /// The form payload could not be built; nothing was sent.
    FailurePayload {
        message: String,
        data: Map<String, Value>,
        files: Map<String, Value>,
    },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::FailureHttpStatus { .. }
                | Outcome::FailureNoResponse
                | Outcome::FailureOther { .. }
                | Outcome::FailurePayload { .. }
        )
    }

    /// Publish this outcome through `reporter`. Exactly one call is made.
    pub fn report(&self, reporter: &mut dyn Reporter) {
        match self {
            Outcome::Success(payload) => reporter.set_output(RESPONSE_OUTPUT, &payload.to_string()),
            Outcome::WarningIgnoredStatus { code, payload } => {
                reporter.warning(&json!({ "code": code, "message": payload }).to_string())
            }
            Outcome::FailureHttpStatus { code, payload } => {
                reporter.set_failed(&json!({ "code": code, "message": payload }).to_string())
            }
            Outcome::FailureNoResponse => {
                reporter.set_failed(&json!({ "error": NO_RESPONSE_MESSAGE }).to_string())
            }
            Outcome::WarningNoResponse(details) => reporter.warning(details),
            Outcome::FailureOther { message, data } => {
                reporter.set_failed(&json!({ "message": message, "data": data }).to_string())
            }
            Outcome::FailurePayload { message, data, files } => reporter.set_failed(
                &json!({
                    "message": format!("Unable to convert Data and Files into FormData: {message}"),
                    "data": data,
                    "files": files,
                })
                .to_string(),
            ),
        }
    }
}

/// Response body as JSON: parsed when possible, otherwise a string.
pub fn response_payload(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{RecordingReporter, Report};

    fn reported(outcome: Outcome) -> Vec<Report> {
        let mut reporter = RecordingReporter::new();
        outcome.report(&mut reporter);
        reporter.reports
    }

    #[test]
    fn success_sets_response_output() {
        let reports = reported(Outcome::Success(response_payload(r#"{ "ok" : true }"#)));
        assert_eq!(
            reports,
            vec![Report::Output {
                name: "response".to_string(),
                value: r#"{"ok":true}"#.to_string()
            }]
        );
    }

    #[test]
    fn plain_text_body_is_serialized_as_string() {
        let reports = reported(Outcome::Success(response_payload("hello")));
        assert_eq!(
            reports,
            vec![Report::Output {
                name: "response".to_string(),
                value: r#""hello""#.to_string()
            }]
        );
    }

    #[test]
    fn ignored_status_is_a_warning() {
        let outcome = Outcome::WarningIgnoredStatus {
            code: 404,
            payload: response_payload("not here"),
        };
        assert!(!outcome.is_failure());
        assert_eq!(
            reported(outcome),
            vec![Report::Warning(r#"{"code":404,"message":"not here"}"#.to_string())]
        );
    }

    #[test]
    fn http_status_failure_carries_code_and_body() {
        let outcome = Outcome::FailureHttpStatus {
            code: 500,
            payload: response_payload(r#"{"error":"boom"}"#),
        };
        assert!(outcome.is_failure());
        assert_eq!(
            reported(outcome),
            vec![Report::Failed(r#"{"code":500,"message":{"error":"boom"}}"#.to_string())]
        );
    }

    #[test]
    fn no_response_failure_has_fixed_message() {
        assert_eq!(
            reported(Outcome::FailureNoResponse),
            vec![Report::Failed(r#"{"error":"no response received"}"#.to_string())]
        );
    }

    #[test]
    fn other_failure_includes_body() {
        let outcome = Outcome::FailureOther {
            message: "bad uri".to_string(),
            data: None,
        };
        assert_eq!(
            reported(outcome),
            vec![Report::Failed(r#"{"data":null,"message":"bad uri"}"#.to_string())]
        );
    }

    #[test]
    fn payload_failure_mentions_form_data() {
        let outcome = Outcome::FailurePayload {
            message: "/tmp/x: not found".to_string(),
            data: Map::new(),
            files: Map::new(),
        };
        let reports = reported(outcome);
        let Report::Failed(message) = &reports[0] else {
            panic!("expected failure");
        };
        let value: Value = serde_json::from_str(message).unwrap();
        assert_eq!(
            value["message"],
            "Unable to convert Data and Files into FormData: /tmp/x: not found"
        );
    }
}
