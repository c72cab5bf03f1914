use crate::metrics_defs::MIRROR_ERRORS;
use http::Version;
use http::header::{CONTENT_TYPE, HOST, HeaderMap, HeaderName};
use hyper::StatusCode;
use hyper::body::Bytes;
use shared::counter;
use shared::http::{add_via_header, filter_hop_by_hop};
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum MirrorError {
    #[error("invalid mirror target: {0}")]
    InvalidTarget(#[from] url::ParseError),

    #[error("mirror request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mirror responded with status {0}")]
    Status(StatusCode),
}

/// Replays inbound reports to a secondary endpoint.
///
/// Replays run detached from the request that triggered them and never affect
/// its response.
#[derive(Clone)]
pub struct Mirror {
    client: reqwest::Client,
    base: Url,
}

impl Mirror {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Mirror { client, base })
    }

    /// `<base><path>`, keeping the query string.
    pub fn target(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path_and_query}"))
    }

    pub fn spawn_replay(
        &self,
        path_and_query: String,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
    ) -> JoinHandle<()> {
        let mirror = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mirror.replay(&path_and_query, version, headers, body).await {
                counter!(MIRROR_ERRORS).increment(1);
                tracing::error!(path = %path_and_query, error = %e, "Failed to replay request to mirror");
            }
        })
    }

    pub async fn replay(
        &self,
        path_and_query: &str,
        version: Version,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Result<(), MirrorError> {
        let url = self.target(path_and_query)?;
        tracing::debug!(%url, "Replaying request to mirror");

        // Content headers describe the original body encoding; only the media
        // type carries over to the replay
        let content_type = headers.get(CONTENT_TYPE).cloned();
        filter_hop_by_hop(&mut headers, version);
        headers.remove(HOST);

        let content_headers: Vec<HeaderName> = headers
            .keys()
            .filter(|name| name.as_str().starts_with("content-"))
            .cloned()
            .collect();
        for name in content_headers {
            headers.remove(&name);
        }

        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, content_type);
        }
        add_via_header(&mut headers, version, "frontier");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(MirrorError::Status(status)),
        }
    }
}
