//! Browser report kinds and their normalization into log events.

mod csp;
mod pkp;
mod project;
mod properties;
mod stacktrace;

pub use csp::{CspReport, CspReportBody};
pub use pkp::PkpReport;
pub use project::project_from_host;
pub use stacktrace::{NameAndVersion, StackFrame, StacktraceReport};

use crate::log_event::{LogEvent, LogLevel};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid report body: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Stacktrace,
    Csp,
    Pkp,
}

impl ReportKind {
    /// Handler order matters, a path is claimed by the first kind whose
    /// name it contains.
    pub const ALL: [ReportKind; 3] = [ReportKind::Stacktrace, ReportKind::Csp, ReportKind::Pkp];

    /// Name matched against request paths, also the stream name suffix.
    pub const fn name(&self) -> &'static str {
        match self {
            ReportKind::Stacktrace => "stacktracejs",
            ReportKind::Csp => "csp",
            ReportKind::Pkp => "pkp",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    Stacktrace(StacktraceReport),
    Csp(CspReport),
    Pkp(PkpReport),
}

impl Report {
    pub fn parse(kind: ReportKind, body: &[u8]) -> Result<Report, ParseError> {
        let report = match kind {
            ReportKind::Stacktrace => Report::Stacktrace(serde_json::from_slice(body)?),
            ReportKind::Csp => Report::Csp(serde_json::from_slice(body)?),
            ReportKind::Pkp => Report::Pkp(serde_json::from_slice(body)?),
        };
        Ok(report)
    }

    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Stacktrace(_) => ReportKind::Stacktrace,
            Report::Csp(_) => ReportKind::Csp,
            Report::Pkp(_) => ReportKind::Pkp,
        }
    }

    /// Records the host the report was sent to.
    pub fn set_host(&mut self, host: Option<String>) {
        match self {
            Report::Stacktrace(report) => report.host = host,
            Report::Csp(report) => report.host = host,
            Report::Pkp(report) => report.host = host,
        }
    }

    /// The project the report is attributed to, `None` if it cannot be derived.
    pub fn project(&self) -> Option<String> {
        match self {
            Report::Stacktrace(report) => report.project(),
            Report::Csp(report) => report.project(),
            Report::Pkp(report) => report.project(),
        }
    }

    pub fn to_log_event(&self, timestamp: DateTime<Utc>) -> LogEvent {
        let (properties, message, exceptions) = match self {
            Report::Stacktrace(report) => (
                report.properties(),
                report.message.clone(),
                report.exception().map(|exception| vec![exception]),
            ),
            Report::Csp(report) => (report.properties(), None, None),
            Report::Pkp(report) => (report.properties(), None, None),
        };

        LogEvent {
            level: LogLevel::Error,
            timestamp,
            message,
            properties,
            exceptions,
        }
    }
}
