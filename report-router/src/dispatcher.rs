use crate::errors::DispatchError;
use crate::metrics_defs::{PIPELINE_PUSH_DURATION, REPORTS_TOTAL, REQUESTS_TOTAL};
use crate::mirror::Mirror;
use crate::pipeline::Pipeline;
use crate::reports::{Report, ReportKind};
use crate::sourcemaps::SourcemapResolver;
use chrono::Utc;
use http::header::HOST;
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use routing::{LOGS_SUFFIX, RoutingKey};
use shared::http::{make_empty_response, make_error_response};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

const LIVENESS: &str = "Frontier is running";

// Longest part of a rejected body that is written to the log
const MAX_LOGGED_BODY_BYTES: usize = 4096;

/// Classifies inbound requests and forwards the reports they carry.
///
/// This is the only place where report failures become status codes. Nothing
/// below it can fail a request, and the client never sees error details.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    handlers: Vec<ReportKind>,
    resolver: Arc<SourcemapResolver>,
    pipeline: Arc<dyn Pipeline>,
    mirror: Option<Mirror>,
    environment: String,
    service_name: String,
}

impl Dispatcher {
    pub fn new(
        resolver: Arc<SourcemapResolver>,
        pipeline: Arc<dyn Pipeline>,
        mirror: Option<Mirror>,
        environment: String,
        service_name: String,
    ) -> Self {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                handlers: ReportKind::ALL.to_vec(),
                resolver,
                pipeline,
                mirror,
                environment,
                service_name,
            }),
        }
    }

    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        counter!(REQUESTS_TOTAL).increment(1);
        tracing::debug!(method = %request.method(), path = request.uri().path(), "Request");

        match *request.method() {
            Method::GET => Response::new(Bytes::from_static(LIVENESS.as_bytes())),
            Method::OPTIONS => make_empty_response(StatusCode::NO_CONTENT),
            Method::POST => self.handle_post(request).await,
            _ => make_error_response(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    /// First registered report kind whose name is part of the path.
    pub fn find_handler(&self, path: &str) -> Option<ReportKind> {
        self.inner
            .handlers
            .iter()
            .find(|kind| path.contains(kind.name()))
            .copied()
    }

    async fn handle_post(&self, request: Request<Bytes>) -> Response<Bytes> {
        let path = request.uri().path();
        if path.is_empty() || path == "/" {
            return make_error_response(StatusCode::NOT_FOUND);
        }

        if let Some(mirror) = &self.inner.mirror {
            let path_and_query = request
                .uri()
                .path_and_query()
                .map_or(path, |pq| pq.as_str())
                .to_string();
            mirror.spawn_replay(
                path_and_query,
                request.version(),
                request.headers().clone(),
                request.body().clone(),
            );
        }

        let host = request
            .headers()
            .get(HOST)
            .and_then(|host| host.to_str().ok())
            .or_else(|| request.uri().host())
            .map(str::to_string);

        match self.handle_report(path, host, request.body()).await {
            Ok(kind) => {
                counter!(REPORTS_TOTAL, "kind" => kind.name()).increment(1);
                make_empty_response(StatusCode::NO_CONTENT)
            }
            Err(e) => {
                counter!(e.metric(), "reason" => e.reason()).increment(1);
                match &e {
                    DispatchError::NoHandler(_) => tracing::debug!(error = %e, "Rejected report"),
                    DispatchError::Parse { .. } => tracing::error!(
                        error = %e,
                        body = %body_excerpt(request.body()),
                        "Rejected report"
                    ),
                    DispatchError::NoProject(_) | DispatchError::Forwarding { .. } => {
                        tracing::error!(error = %e, path, "Failed to handle report")
                    }
                }

                match e.status_code() {
                    StatusCode::NO_CONTENT => make_empty_response(StatusCode::NO_CONTENT),
                    status => make_error_response(status),
                }
            }
        }
    }

    async fn handle_report(
        &self,
        path: &str,
        host: Option<String>,
        body: &[u8],
    ) -> Result<ReportKind, DispatchError> {
        let kind = self
            .find_handler(path)
            .ok_or_else(|| DispatchError::NoHandler(path.to_string()))?;

        let mut report =
            Report::parse(kind, body).map_err(|source| DispatchError::Parse { kind, source })?;
        report.set_host(host);

        let project = report.project().ok_or(DispatchError::NoProject(kind))?;

        if let Report::Stacktrace(stacktrace) = &mut report {
            self.inner.resolver.resolve_frames(&mut stacktrace.stack).await;
        }

        let timestamp = Utc::now();
        let event = report.to_log_event(timestamp);
        let routing_key = RoutingKey::new(
            project,
            self.inner.environment.as_str(),
            format!("{}_{}", self.inner.service_name, kind.name()),
            LOGS_SUFFIX,
        )
        .to_string();

        tracing::debug!(%routing_key, "Pushing report event");
        let start = Instant::now();
        let result = self
            .inner
            .pipeline
            .push(&routing_key, &event, timestamp)
            .await;
        histogram!(PIPELINE_PUSH_DURATION).record(start.elapsed().as_secs_f64());

        result.map_err(|source| DispatchError::Forwarding { kind, source })?;
        Ok(kind)
    }
}

fn body_excerpt(body: &[u8]) -> String {
    let excerpt = &body[..body.len().min(MAX_LOGGED_BODY_BYTES)];
    String::from_utf8_lossy(excerpt).into_owned()
}
