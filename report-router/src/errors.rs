use crate::metrics_defs::{REQUEST_ERRORS, REQUESTS_REJECTED};
use crate::pipeline::PipelineError;
use crate::reports::{ParseError, ReportKind};
use hyper::StatusCode;
use shared::metrics_defs::MetricDef;
use thiserror::Error;

/// Errors that stop the report router from starting or serving
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ValidationError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failures of a single report request.
///
/// The dispatcher is the only place these are turned into status codes.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No report handler for path {0:?}")]
    NoHandler(String),

    #[error("Failed to parse {kind} report: {source}")]
    Parse {
        kind: ReportKind,
        #[source]
        source: ParseError,
    },

    #[error("Could not derive a project for {0} report")]
    NoProject(ReportKind),

    #[error("Failed to forward {kind} report: {source}")]
    Forwarding {
        kind: ReportKind,
        #[source]
        source: PipelineError,
    },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::NoHandler(_) => StatusCode::NOT_FOUND,
            DispatchError::Parse { .. } => StatusCode::BAD_REQUEST,
            // The report was accepted; what happens after is not the client's concern
            DispatchError::NoProject(_) | DispatchError::Forwarding { .. } => {
                StatusCode::NO_CONTENT
            }
        }
    }

    /// Counter this failure is recorded in. Malformed or unroutable requests
    /// are rejections, not handling errors.
    pub fn metric(&self) -> MetricDef {
        match self {
            DispatchError::NoHandler(_) | DispatchError::Parse { .. } => REQUESTS_REJECTED,
            DispatchError::NoProject(_) | DispatchError::Forwarding { .. } => REQUEST_ERRORS,
        }
    }

    /// Short tag for the error counters.
    pub fn reason(&self) -> &'static str {
        match self {
            DispatchError::NoHandler(_) => "no_handler",
            DispatchError::Parse { .. } => "parse",
            DispatchError::NoProject(_) => "no_project",
            DispatchError::Forwarding { .. } => "forwarding",
        }
    }
}
