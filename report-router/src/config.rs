use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Environment cannot be empty")]
    EmptyEnvironment,

    #[error("Service name cannot be empty")]
    EmptyServiceName,

    #[error("Body limit cannot be 0")]
    InvalidBodyLimit,

    #[error("Sourcemap setting {0} cannot be 0")]
    InvalidSourcemapSetting(&'static str),

    #[error("Pipeline timeout cannot be 0")]
    InvalidPipelineTimeout,

    #[error("Mirror URL must be http or https: {0}")]
    InvalidMirrorUrl(Url),

    #[error("Mirror timeout cannot be 0")]
    InvalidMirrorTimeout,
}

/// Report router configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for incoming reports
    #[serde(default)]
    pub listener: Listener,
    /// Deployment environment, part of every routing key
    pub environment: String,
    /// Prefix of the stream name, `<service_name>_<report kind>`
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Maximum accepted size of an inbound report body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Hosts allowed to report and to receive CORS headers. Empty allows all.
    #[serde(default)]
    pub domain_whitelist: Vec<String>,
    /// Hosts whose scripts are never fetched for sourcemaps.
    #[serde(default)]
    pub sourcemap_blacklist: Vec<String>,
    /// Base URL that every POST is replayed to, if set.
    #[serde(default)]
    pub resend_to: Option<Url>,
    #[serde(default = "default_resend_timeout_secs")]
    pub resend_timeout_secs: u64,
    #[serde(default)]
    pub sourcemaps: SourcemapConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_service_name() -> String {
    "frontier".into()
}

fn default_resend_timeout_secs() -> u64 {
    5
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if self.environment.trim().is_empty() {
            return Err(ValidationError::EmptyEnvironment);
        }

        if self.service_name.trim().is_empty() {
            return Err(ValidationError::EmptyServiceName);
        }

        if self.max_body_bytes == 0 {
            return Err(ValidationError::InvalidBodyLimit);
        }

        if let Some(url) = &self.resend_to
            && !matches!(url.scheme(), "http" | "https")
        {
            return Err(ValidationError::InvalidMirrorUrl(url.clone()));
        }

        if self.resend_timeout_secs == 0 {
            return Err(ValidationError::InvalidMirrorTimeout);
        }

        self.sourcemaps.validate()?;
        self.pipeline.validate()?;

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 6307,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Settings for fetching and caching sourcemaps
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcemapConfig {
    /// Timeout for each outbound script or sourcemap request
    pub fetch_timeout_secs: u64,
    /// Largest script or sourcemap body that will be read
    pub max_fetch_bytes: usize,
    /// How long a fetched sourcemap, or its absence, is remembered
    pub cache_ttl_secs: u64,
    /// Interval of the background scan that evicts expired entries
    pub eviction_interval_secs: u64,
    pub max_cache_entries: u64,
}

impl Default for SourcemapConfig {
    fn default() -> Self {
        SourcemapConfig {
            fetch_timeout_secs: 5,
            max_fetch_bytes: 10 * 1024 * 1024,
            cache_ttl_secs: 24 * 60 * 60,
            eviction_interval_secs: 60 * 60,
            max_cache_entries: 10_000,
        }
    }
}

impl SourcemapConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let settings = [
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("max_fetch_bytes", self.max_fetch_bytes as u64),
            ("cache_ttl_secs", self.cache_ttl_secs),
            ("eviction_interval_secs", self.eviction_interval_secs),
            ("max_cache_entries", self.max_cache_entries),
        ];

        for (name, value) in settings {
            if value == 0 {
                return Err(ValidationError::InvalidSourcemapSetting(name));
            }
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }
}

/// Where normalized events are delivered
#[derive(Clone, Debug, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum PipelineConfig {
    /// POST every event to a pipeline gateway
    Http {
        url: Url,
        #[serde(default = "default_pipeline_timeout_secs")]
        timeout_secs: u64,
    },
    /// Write every event to the service log
    #[default]
    Log,
}

fn default_pipeline_timeout_secs() -> u64 {
    5
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PipelineConfig::Http { timeout_secs, .. } if *timeout_secs == 0 => {
                Err(ValidationError::InvalidPipelineTimeout)
            }
            _ => Ok(()),
        }
    }
}
