//! GitHub Actions host: inputs from `INPUT_*` variables, reports as
//! workflow commands on stdout, outputs appended to `$GITHUB_OUTPUT`.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use dispatch_core::{InputSource, Reporter};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Reads inputs the way the runner exposes them: `INPUT_<NAME>` with the
/// name upper-cased and spaces replaced by underscores.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvInputs;

impl InputSource for EnvInputs {
    fn input(&self, name: &str) -> Option<String> {
        std::env::var(input_variable(name)).ok()
    }
}

pub fn input_variable(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("unable to write output {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("unexpected input: name should not contain the delimiter {0}")]
    DelimiterInName(String),

    #[error("unexpected input: value should not contain the delimiter {0}")]
    DelimiterInValue(String),
}

/// `Reporter` that speaks the runner's workflow-command protocol.
pub struct GithubReporter<W: Write> {
    out: W,
    output_file: Option<PathBuf>,
    failed: bool,
}

impl GithubReporter<io::Stdout> {
    pub fn from_env() -> Self {
        let output_file = std::env::var_os("GITHUB_OUTPUT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(io::stdout(), output_file)
    }
}

impl<W: Write> GithubReporter<W> {
    pub fn new(out: W, output_file: Option<PathBuf>) -> Self {
        Self {
            out,
            output_file,
            failed: false,
        }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn command(&mut self, command: &str, message: &str) {
        if let Err(e) = writeln!(self.out, "::{command}::{}", escape_data(message)) {
            error!(error = %e, command, "failed to write workflow command");
        }
    }

    fn write_output(&mut self, name: &str, value: &str) -> Result<(), OutputError> {
        let Some(path) = &self.output_file else {
            // Runners without the output file still honour the legacy command.
            let line = format!("::set-output name={}::{}", escape_property(name), escape_data(value));
            return writeln!(self.out, "{line}").map_err(|source| OutputError::Io {
                name: name.to_string(),
                source,
            });
        };

        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        if name.contains(&delimiter) {
            return Err(OutputError::DelimiterInName(delimiter));
        }
        if value.contains(&delimiter) {
            return Err(OutputError::DelimiterInValue(delimiter));
        }

        let io_err = |source| OutputError::Io {
            name: name.to_string(),
            source,
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path).map_err(io_err)?;
        write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n").map_err(io_err)
    }
}

impl<W: Write> Reporter for GithubReporter<W> {
    fn debug(&mut self, message: &str) {
        self.command("debug", message);
    }

    fn warning(&mut self, message: &str) {
        self.command("warning", message);
    }

    fn error(&mut self, message: &str) {
        self.command("error", message);
    }

    fn set_output(&mut self, name: &str, value: &str) {
        if let Err(e) = self.write_output(name, value) {
            error!(error = %e, "could not set output");
            self.set_failed(&e.to_string());
        }
    }

    fn set_failed(&mut self, message: &str) {
        self.failed = true;
        self.command("error", message);
    }
}

/// Escape a workflow command message.
fn escape_data(value: &str) -> String {
    value.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Escape a workflow command property value.
fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}
