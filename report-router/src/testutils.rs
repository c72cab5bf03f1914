use crate::log_event::LogEvent;
use crate::pipeline::{Pipeline, PipelineError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use std::sync::Mutex;

pub const CSP_REPORT: &str = include_str!("../testdata/csp.json");
pub const PKP_REPORT: &str = include_str!("../testdata/pkp.json");
pub const STACKTRACE_REPORT: &str = include_str!("../testdata/stacktrace.json");
pub const APP_SCRIPT: &str = include_str!("../testdata/app.min.js");
pub const APP_SOURCEMAP: &str = include_str!("../testdata/app.min.js.map");
pub const VENDOR_SCRIPT: &str = include_str!("../testdata/vendor.min.js");

#[derive(Debug, Clone)]
pub struct Push {
    pub routing_key: String,
    pub event: LogEvent,
    pub timestamp: DateTime<Utc>,
}

/// Pipeline that keeps every pushed event in memory.
#[derive(Default)]
pub struct RecordingPipeline {
    pushes: Mutex<Vec<Push>>,
    fail: bool,
}

impl RecordingPipeline {
    pub fn failing() -> Self {
        RecordingPipeline {
            pushes: Mutex::default(),
            fail: true,
        }
    }

    pub fn pushes(&self) -> Vec<Push> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pipeline for RecordingPipeline {
    async fn push(
        &self,
        routing_key: &str,
        event: &LogEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        if self.fail {
            return Err(PipelineError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }

        self.pushes.lock().unwrap().push(Push {
            routing_key: routing_key.to_string(),
            event: event.clone(),
            timestamp,
        });
        Ok(())
    }
}
