use crate::config::PipelineConfig;
use crate::log_event::LogEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("pipeline request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("pipeline responded with status {0}")]
    Status(StatusCode),
}

/// Downstream telemetry pipeline. Delivery is best effort, callers do not retry.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn push(
        &self,
        routing_key: &str,
        event: &LogEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PipelineError>;
}

pub fn from_config(config: &PipelineConfig) -> Result<Arc<dyn Pipeline>, reqwest::Error> {
    let pipeline: Arc<dyn Pipeline> = match config {
        PipelineConfig::Http { url, timeout_secs } => Arc::new(HttpPipeline::new(
            url.clone(),
            Duration::from_secs(*timeout_secs),
        )?),
        PipelineConfig::Log => Arc::new(LogPipeline),
    };
    Ok(pipeline)
}

#[derive(Serialize)]
struct PushRequest<'a> {
    routing_key: &'a str,
    timestamp: DateTime<Utc>,
    event: &'a LogEvent,
}

/// Posts events as JSON to a pipeline gateway.
pub struct HttpPipeline {
    client: reqwest::Client,
    url: Url,
}

impl HttpPipeline {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpPipeline { client, url })
    }
}

#[async_trait]
impl Pipeline for HttpPipeline {
    async fn push(
        &self,
        routing_key: &str,
        event: &LogEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&PushRequest {
                routing_key,
                timestamp,
                event,
            })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(PipelineError::Status(status)),
        }
    }
}

/// Writes events to the service log. Used when no gateway is configured.
pub struct LogPipeline;

#[async_trait]
impl Pipeline for LogPipeline {
    async fn push(
        &self,
        routing_key: &str,
        event: &LogEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let event = serde_json::to_string(event).unwrap_or_else(|e| format!("<{e}>"));
        tracing::info!(routing_key, %timestamp, %event, "Report event");
        Ok(())
    }
}
