//! The narrow reporting capability the dispatcher talks to.
//!
//! A CI host implements `Reporter` over its own logging and output
//! mechanism. `RecordingReporter` keeps every call in order so tests can
//! assert on exactly what an invocation reported.

pub trait Reporter {
    fn debug(&mut self, message: &str);
    fn warning(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn set_output(&mut self, name: &str, value: &str);
    /// Report a fatal message and mark the invocation as failed.
    fn set_failed(&mut self, message: &str);
}

/// A single call made on a `RecordingReporter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Debug(String),
    Warning(String),
    Error(String),
    Output { name: String, value: String },
    Failed(String),
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub reports: Vec<Report>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self, name: &str) -> Option<&str> {
        self.reports.iter().rev().find_map(|r| match r {
            Report::Output { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter_map(|r| match r {
                Report::Warning(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter_map(|r| match r {
                Report::Failed(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter_map(|r| match r {
                Report::Error(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn debugs(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter_map(|r| match r {
                Report::Debug(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> bool {
        self.reports.iter().any(|r| matches!(r, Report::Failed(_)))
    }
}

impl Reporter for RecordingReporter {
    fn debug(&mut self, message: &str) {
        self.reports.push(Report::Debug(message.to_string()));
    }

    fn warning(&mut self, message: &str) {
        self.reports.push(Report::Warning(message.to_string()));
    }

    fn error(&mut self, message: &str) {
        self.reports.push(Report::Error(message.to_string()));
    }

    fn set_output(&mut self, name: &str, value: &str) {
        self.reports.push(Report::Output {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_failed(&mut self, message: &str) {
        self.reports.push(Report::Failed(message.to_string()));
    }
}
