use super::SourcemapError;
use regex::Regex;
use reqwest::redirect::Policy;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

const REFERENCE_MARKER: &str = "sourceMappingURL=";

static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sourceMappingURL=(\S+)\s*$").expect("sourceMappingURL pattern is valid")
});

/// Finds the sourcemap reference at the end of a script.
///
/// Only the tail starting at the last `sourceMappingURL=` is searched, and
/// the reference must be followed by nothing but whitespace.
pub fn find_sourcemap_reference(script: &str) -> Option<&str> {
    let start = script.rfind(REFERENCE_MARKER)?;
    let captures = REFERENCE_REGEX.captures(&script[start..])?;
    captures.get(1).map(|m| m.as_str())
}

/// Plain GET client for scripts and sourcemaps.
///
/// Redirects are never followed and bodies are capped at `max_bytes`.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Fetcher { client, max_bytes })
    }

    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, SourcemapError> {
        let mut response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourcemapError::Status {
                url: url.clone(),
                status,
            });
        }

        let too_large = || SourcemapError::TooLarge {
            url: url.clone(),
            limit: self.max_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}
