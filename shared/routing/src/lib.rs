//! Routing keys
//!
//! A routing key tells the downstream telemetry pipeline where an event
//! belongs. It is made of four components:
//!
//! ```text
//! <project>.<environment>.<stream>.<suffix>
//! ```
//!
//! Components are free-form strings. Inside a component `%` is written as
//! `%25` and `.` as `%2E`, so every key produced by [`RoutingKey::to_string`]
//! parses back into exactly the same four components.

use std::fmt;
use std::str::FromStr;

/// Suffix used for log event streams.
pub const LOGS_SUFFIX: &str = "logs";

const SEPARATOR: char = '.';

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RoutingKeyError {
    #[error("routing key must have 4 components, found {0}")]
    ComponentCount(usize),
    #[error("invalid escape sequence in routing key component {0:?}")]
    InvalidEscape(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    pub project: String,
    pub environment: String,
    pub stream: String,
    pub suffix: String,
}

impl RoutingKey {
    pub fn new(
        project: impl Into<String>,
        environment: impl Into<String>,
        stream: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        RoutingKey {
            project: project.into(),
            environment: environment.into(),
            stream: stream.into(),
            suffix: suffix.into(),
        }
    }

    pub fn parse(key: &str) -> Result<Self, RoutingKeyError> {
        let parts: Vec<&str> = key.split(SEPARATOR).collect();
        let [project, environment, stream, suffix] = parts.as_slice() else {
            return Err(RoutingKeyError::ComponentCount(parts.len()));
        };

        Ok(RoutingKey {
            project: unescape(project)?,
            environment: unescape(environment)?,
            stream: unescape(stream)?,
            suffix: unescape(suffix)?,
        })
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            escape(&self.project),
            escape(&self.environment),
            escape(&self.stream),
            escape(&self.suffix)
        )
    }
}

impl FromStr for RoutingKey {
    type Err = RoutingKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoutingKey::parse(s)
    }
}

fn escape(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            SEPARATOR => escaped.push_str("%2E"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape(component: &str) -> Result<String, RoutingKeyError> {
    let mut unescaped = String::with_capacity(component.len());
    let mut rest = component;

    while let Some(pos) = rest.find('%') {
        unescaped.push_str(&rest[..pos]);
        let decoded = match rest.get(pos + 1..pos + 3) {
            Some("25") => '%',
            Some("2E") | Some("2e") => SEPARATOR,
            _ => return Err(RoutingKeyError::InvalidEscape(component.to_string())),
        };
        unescaped.push(decoded);
        rest = &rest[pos + 3..];
    }
    unescaped.push_str(rest);

    Ok(unescaped)
}
