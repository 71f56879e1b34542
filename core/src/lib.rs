//! Single-shot HTTP request dispatch for CI pipeline steps.
//!
//! # Overview
//! Reads a fixed set of string inputs, builds one outgoing request, sends it
//! and maps the result onto pipeline-visible outputs: a `response` output, a
//! warning, or a failure.
//!
//! # Design
//! - `RequestSpec::from_inputs` is the configuration assembler. It reads an
//!   `InputSource` once and produces an immutable spec; nothing is global.
//! - `dispatch` owns the request lifecycle and returns exactly one `Outcome`,
//!   which it reports through the `Reporter` capability.
//! - Network I/O sits behind the `Transport` trait (host-does-IO), so every
//!   branch of the dispatcher is testable with a scripted transport.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod escape;
pub mod form;
pub mod http;
pub mod outcome;
pub mod reporter;
pub mod transport;

pub use config::{BasicAuth, InputSource, RequestSpec};
pub use dispatcher::dispatch;
pub use error::{ConfigError, PayloadError, TransportError};
pub use escape::escape_newlines_in_strings;
pub use form::FormPayload;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use outcome::Outcome;
pub use reporter::{RecordingReporter, Report, Reporter};
pub use transport::{Transport, TransportErrorReport, UreqTransport};
