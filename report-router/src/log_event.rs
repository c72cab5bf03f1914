use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
}

/// Event handed to the downstream pipeline, one per report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub properties: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<Vec<ExceptionInfo>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub message: String,
    pub stack: Vec<FrameInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    pub function: Option<String>,
    pub filename: Option<String>,
    pub line: u32,
    pub column: u32,
}
