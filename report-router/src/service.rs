use crate::cors::apply_cors_headers;
use crate::dispatcher::Dispatcher;
use crate::domain_policy::DomainPolicy;
use crate::errors::RouterError;
use http_body_util::{BodyExt, Full, Limited, combinators::BoxBody};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::http::make_error_response;
use std::pin::Pin;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReportService {
    dispatcher: Dispatcher,
    policy: Arc<DomainPolicy>,
    max_body_bytes: usize,
}

impl ReportService {
    pub fn new(dispatcher: Dispatcher, policy: Arc<DomainPolicy>, max_body_bytes: usize) -> Self {
        ReportService {
            dispatcher,
            policy,
            max_body_bytes,
        }
    }

    /// Reads the body and dispatches the request, then applies CORS headers.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Bytes>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let (parts, body) = request.into_parts();
        let request_headers = parts.headers.clone();

        let mut response = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => {
                let request = Request::from_parts(parts, collected.to_bytes());
                let dispatcher = self.dispatcher.clone();

                // Runs detached, so a client that goes away does not cancel
                // forwarding of a report that was already read
                match tokio::spawn(async move { dispatcher.dispatch(request).await }).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::error!(error = %e, "Dispatch task failed");
                        make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, path = parts.uri.path(), "Failed to read request body");
                make_error_response(StatusCode::BAD_REQUEST)
            }
        };

        apply_cors_headers(&self.policy, &request_headers, response.headers_mut());
        response
    }
}

impl Service<Request<Incoming>> for ReportService {
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = RouterError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let service = self.clone();

        Box::pin(async move {
            let (parts, body) = service.handle(request).await.into_parts();
            Ok(Response::from_parts(
                parts,
                Full::new(body).map_err(|e| match e {}).boxed(),
            ))
        })
    }
}
