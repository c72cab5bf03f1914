//! Rewrites minified stack frames to original source positions.
//!
//! For each frame the script is fetched, its trailing `sourceMappingURL`
//! reference followed, and the parsed map cached by script URL. Scripts
//! without a usable map are cached as absent so they are not fetched again
//! until the entry expires. Resolution is best effort: on any failure the
//! frame is left exactly as reported.

mod fetch;
mod map;

pub use fetch::find_sourcemap_reference;
pub use map::{OriginalPosition, ParsedSourceMap};

use crate::cache::{Cached, TtlCache};
use crate::config::SourcemapConfig;
use crate::domain_policy::DomainPolicy;
use crate::metrics_defs::{
    SOURCEMAP_CACHE_HIT, SOURCEMAP_CACHE_MISS, SOURCEMAP_FETCH_DURATION, SOURCEMAP_RESOLVED,
};
use crate::reports::StackFrame;
use fetch::Fetcher;
use hyper::StatusCode;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SourcemapError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} responded with status {status}")]
    Status { url: Url, status: StatusCode },

    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: Url, limit: usize },

    #[error("invalid sourcemap reference {0:?}")]
    InvalidReference(String),

    #[error("sourcemap location {0} is not allowed")]
    DisallowedLocation(Url),

    #[error("malformed sourcemap: {0}")]
    Malformed(#[from] sourcemap::Error),
}

impl SourcemapError {
    /// Whether retrying the same URL later would fail the same way.
    /// Only permanent failures are remembered in the cache.
    pub fn is_permanent(&self) -> bool {
        match self {
            SourcemapError::Request(_) => false,
            SourcemapError::Status { status, .. } => !status.is_server_error(),
            SourcemapError::TooLarge { .. }
            | SourcemapError::InvalidReference(_)
            | SourcemapError::DisallowedLocation(_)
            | SourcemapError::Malformed(_) => true,
        }
    }
}

pub struct SourcemapResolver {
    policy: Arc<DomainPolicy>,
    cache: TtlCache<Arc<ParsedSourceMap>>,
    fetcher: Fetcher,
    ttl: Duration,
}

impl SourcemapResolver {
    pub fn new(
        policy: Arc<DomainPolicy>,
        cache: TtlCache<Arc<ParsedSourceMap>>,
        config: &SourcemapConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(SourcemapResolver {
            policy,
            cache,
            fetcher: Fetcher::new(config.fetch_timeout(), config.max_fetch_bytes)?,
            ttl: config.cache_ttl(),
        })
    }

    /// Resolves every frame in order. Frames do not affect each other.
    pub async fn resolve_frames(&self, frames: &mut [StackFrame]) {
        for frame in frames {
            self.resolve_frame(frame).await;
        }
    }

    pub async fn resolve_frame(&self, frame: &mut StackFrame) {
        let Some(script_url) = self.script_url(frame) else {
            return;
        };

        if frame.line_number == 0 || frame.column_number == 0 {
            return;
        }

        let Some(map) = self.sourcemap_for(&script_url).await else {
            return;
        };

        let Some(position) = map.lookup(frame.line_number - 1, frame.column_number - 1) else {
            return;
        };

        // A position that has no 1-based equivalent is treated as unmapped
        let (Some(line_number), Some(column_number)) =
            (position.line.checked_add(1), position.column.checked_add(1))
        else {
            return;
        };

        tracing::debug!(
            url = %script_url,
            line = frame.line_number,
            column = frame.column_number,
            source = %position.source,
            "Resolved stack frame"
        );
        counter!(SOURCEMAP_RESOLVED).increment(1);

        frame.file_name = Some(position.source);
        frame.function_name = position.name;
        frame.line_number = line_number;
        frame.column_number = column_number;
    }

    /// The frame's script URL, if it is eligible for resolution.
    fn script_url(&self, frame: &StackFrame) -> Option<Url> {
        let file_name = frame.file_name.as_deref().filter(|name| !name.is_empty())?;

        // Inline, eval and blob frames have no fetchable script
        let url = Url::parse(file_name).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let host = url.host_str()?;
        if !self.policy.is_allowed_domain(host) {
            tracing::warn!(url = file_name, "Script host is not allowed, skipping sourcemap");
            return None;
        }

        if !self.policy.is_allowed_for_sourcemap(host) {
            return None;
        }

        Some(url)
    }

    async fn sourcemap_for(&self, script_url: &Url) -> Option<Arc<ParsedSourceMap>> {
        if let Some(cached) = self.cache.get(script_url.as_str()) {
            counter!(SOURCEMAP_CACHE_HIT).increment(1);
            return cached.as_present().cloned();
        }
        counter!(SOURCEMAP_CACHE_MISS).increment(1);

        let start = Instant::now();
        let result = self.fetch_sourcemap(script_url).await;
        histogram!(SOURCEMAP_FETCH_DURATION).record(start.elapsed().as_secs_f64());

        match result {
            Ok(Some(map)) => {
                self.cache.set(
                    script_url.as_str(),
                    Cached::Present(map.clone()),
                    self.ttl,
                );
                Some(map)
            }
            Ok(None) => {
                tracing::warn!(url = %script_url, "Script has no sourceMappingURL");
                self.cache.set(script_url.as_str(), Cached::Absent, self.ttl);
                None
            }
            Err(e) => {
                tracing::error!(url = %script_url, error = %e, "Failed to get sourcemap");
                if e.is_permanent() {
                    self.cache.set(script_url.as_str(), Cached::Absent, self.ttl);
                }
                None
            }
        }
    }

    /// `Ok(None)` when the script carries no sourcemap reference.
    async fn fetch_sourcemap(
        &self,
        script_url: &Url,
    ) -> Result<Option<Arc<ParsedSourceMap>>, SourcemapError> {
        let script = self.fetcher.fetch(script_url).await?;
        let script = String::from_utf8_lossy(&script);

        let Some(reference) = find_sourcemap_reference(&script) else {
            return Ok(None);
        };

        let map_url = script_url
            .join(reference)
            .map_err(|_| SourcemapError::InvalidReference(reference.to_string()))?;
        self.check_map_location(&map_url)?;

        let body = self.fetcher.fetch(&map_url).await?;
        let map = ParsedSourceMap::from_slice(&body)?;

        Ok(Some(Arc::new(map)))
    }

    // A script must not be able to point the fetcher at arbitrary hosts
    fn check_map_location(&self, map_url: &Url) -> Result<(), SourcemapError> {
        let allowed = matches!(map_url.scheme(), "http" | "https")
            && map_url.host_str().is_some_and(|host| {
                self.policy.is_allowed_domain(host) && self.policy.is_allowed_for_sourcemap(host)
            });

        if allowed {
            Ok(())
        } else {
            Err(SourcemapError::DisallowedLocation(map_url.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{APP_SCRIPT, APP_SOURCEMAP, VENDOR_SCRIPT};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NONE: [&str; 0] = [];

    fn resolver(policy: DomainPolicy) -> SourcemapResolver {
        SourcemapResolver::new(
            Arc::new(policy),
            TtlCache::new(100),
            &SourcemapConfig::default(),
        )
        .unwrap()
    }

    fn frame(file_name: &str, line: u32, column: u32) -> StackFrame {
        StackFrame {
            function_name: Some("o".into()),
            file_name: Some(file_name.into()),
            line_number: line,
            column_number: column,
        }
    }

    async fn mount_script(server: &MockServer, script_path: &str, body: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(script_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_and_cache() {
        let server = MockServer::start().await;
        mount_script(&server, "/static/app.min.js", APP_SCRIPT, 1).await;
        mount_script(&server, "/static/app.min.js.map", APP_SOURCEMAP, 1).await;

        let resolver = resolver(DomainPolicy::default());
        let script_url = format!("{}/static/app.min.js", server.uri());

        let expected = StackFrame {
            function_name: Some("init".into()),
            file_name: Some("app.ts".into()),
            line_number: 3,
            column_number: 4,
        };

        let mut first = frame(&script_url, 5, 12);
        resolver.resolve_frame(&mut first).await;
        assert_eq!(first, expected);

        // Served from the cache, the mocks verify no second fetch happens
        let mut second = frame(&script_url, 5, 12);
        resolver.resolve_frame(&mut second).await;
        assert_eq!(second, expected);

        assert!(matches!(
            resolver.cache.get(&script_url),
            Some(Cached::Present(_))
        ));
    }

    #[tokio::test]
    async fn test_unmapped_position_is_unchanged() {
        let server = MockServer::start().await;
        mount_script(&server, "/app.min.js", APP_SCRIPT, 1).await;
        mount_script(&server, "/app.min.js.map", APP_SOURCEMAP, 1).await;

        let resolver = resolver(DomainPolicy::default());
        let script_url = format!("{}/app.min.js", server.uri());

        let mut frames = vec![frame(&script_url, 1, 1), frame(&script_url, 5, 12)];
        resolver.resolve_frames(&mut frames).await;

        assert_eq!(frames[0], frame(&script_url, 1, 1));
        assert_eq!(frames[1].file_name.as_deref(), Some("app.ts"));
    }

    #[tokio::test]
    async fn test_missing_reference_is_cached() {
        let server = MockServer::start().await;
        mount_script(&server, "/vendor.min.js", VENDOR_SCRIPT, 1).await;

        let resolver = resolver(DomainPolicy::default());
        let script_url = format!("{}/vendor.min.js", server.uri());

        for _ in 0..2 {
            let mut f = frame(&script_url, 1, 10);
            resolver.resolve_frame(&mut f).await;
            assert_eq!(f, frame(&script_url, 1, 10));
        }

        assert!(matches!(resolver.cache.get(&script_url), Some(Cached::Absent)));
    }

    #[tokio::test]
    async fn test_permanent_failures_are_cached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gone.js"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        mount_script(
            &server,
            "/broken.js",
            "run();\n//# sourceMappingURL=broken.js.map\n",
            1,
        )
        .await;
        mount_script(&server, "/broken.js.map", "{\"version\": 3", 1).await;

        let resolver = resolver(DomainPolicy::default());

        for script in ["gone.js", "broken.js"] {
            let script_url = format!("{}/{script}", server.uri());
            for _ in 0..2 {
                let mut f = frame(&script_url, 1, 1);
                resolver.resolve_frame(&mut f).await;
                assert_eq!(f, frame(&script_url, 1, 1));
            }
            assert!(matches!(resolver.cache.get(&script_url), Some(Cached::Absent)));
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_not_cached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app.min.js"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let resolver = resolver(DomainPolicy::default());
        let script_url = format!("{}/app.min.js", server.uri());

        for _ in 0..2 {
            let mut f = frame(&script_url, 5, 12);
            resolver.resolve_frame(&mut f).await;
            assert_eq!(f, frame(&script_url, 5, 12));
        }

        assert!(resolver.cache.get(&script_url).is_none());
    }

    #[tokio::test]
    async fn test_fetch_timeouts_are_not_cached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow.min.js"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(APP_SCRIPT)
                    .set_delay(Duration::from_secs(3)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let config = SourcemapConfig {
            fetch_timeout_secs: 1,
            ..Default::default()
        };
        let resolver =
            SourcemapResolver::new(Arc::new(DomainPolicy::default()), TtlCache::new(100), &config)
                .unwrap();
        let script_url = format!("{}/slow.min.js", server.uri());

        for _ in 0..2 {
            let mut f = frame(&script_url, 5, 12);
            resolver.resolve_frame(&mut f).await;
            assert_eq!(f, frame(&script_url, 5, 12));
            assert!(resolver.cache.get(&script_url).is_none());
        }
    }

    #[tokio::test]
    async fn test_out_of_range_original_position_is_unchanged() {
        let server = MockServer::start().await;
        mount_script(
            &server,
            "/huge.min.js",
            "run();\n//# sourceMappingURL=huge.min.js.map\n",
            1,
        )
        .await;
        // Maps generated line 4, column 11 to original line u32::MAX
        mount_script(
            &server,
            "/huge.min.js.map",
            r#"{"version":3,"sources":["app.ts"],"names":[],"mappings":";;;;WA+/////HGA"}"#,
            1,
        )
        .await;

        let resolver = resolver(DomainPolicy::default());
        let script_url = format!("{}/huge.min.js", server.uri());

        let mut f = frame(&script_url, 5, 12);
        resolver.resolve_frame(&mut f).await;

        assert_eq!(f, frame(&script_url, 5, 12));
        assert!(matches!(
            resolver.cache.get(&script_url),
            Some(Cached::Present(_))
        ));
    }

    #[tokio::test]
    async fn test_map_on_foreign_host_is_not_fetched() {
        let server = MockServer::start().await;
        mount_script(
            &server,
            "/app.min.js",
            "run();\n//# sourceMappingURL=http://maps.attacker.test/app.min.js.map\n",
            1,
        )
        .await;

        let resolver = resolver(DomainPolicy::new(["127.0.0.1"], NONE));
        let script_url = format!("{}/app.min.js", server.uri());

        let mut f = frame(&script_url, 5, 12);
        resolver.resolve_frame(&mut f).await;

        assert_eq!(f, frame(&script_url, 5, 12));
        assert!(matches!(resolver.cache.get(&script_url), Some(Cached::Absent)));
    }

    #[tokio::test]
    async fn test_skipped_frames_are_unchanged() {
        let server = MockServer::start().await;

        // Nothing may be fetched
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(APP_SCRIPT))
            .expect(0)
            .mount(&server)
            .await;

        let script_url = format!("{}/app.min.js", server.uri());

        let skipped = [
            (DomainPolicy::default(), frame("blob:https://www.example.ru/1f2e", 5, 12)),
            (DomainPolicy::default(), frame("eval at run (app.js:1:1)", 5, 12)),
            (DomainPolicy::default(), frame(&script_url, 0, 12)),
            (DomainPolicy::default(), frame(&script_url, 5, 0)),
            (DomainPolicy::new(["www.example.ru"], NONE), frame(&script_url, 5, 12)),
            (DomainPolicy::new(NONE, ["127.0.0.1"]), frame(&script_url, 5, 12)),
        ];

        for (policy, original) in skipped {
            let resolver = resolver(policy);
            let mut f = original.clone();
            resolver.resolve_frame(&mut f).await;
            assert_eq!(f, original);
        }

        let resolver = resolver(DomainPolicy::default());
        let mut no_file = StackFrame {
            line_number: 5,
            column_number: 12,
            ..Default::default()
        };
        resolver.resolve_frame(&mut no_file).await;
        assert_eq!(no_file.file_name, None);
    }
}
