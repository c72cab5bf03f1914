pub mod cache;
pub mod config;
pub mod cors;
pub mod dispatcher;
pub mod domain_policy;
pub mod errors;
pub mod log_event;
pub mod metrics_defs;
pub mod mirror;
pub mod pipeline;
pub mod reports;
pub mod service;
pub mod sourcemaps;

#[cfg(test)]
mod testutils;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::domain_policy::DomainPolicy;
use crate::errors::RouterError;
use crate::mirror::Mirror;
use crate::service::ReportService;
use crate::sourcemaps::SourcemapResolver;
use shared::http::run_http_service;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(config: Config) -> Result<(), RouterError> {
    config.validate()?;
    shared::describe_metrics!(metrics_defs::ALL_METRICS);

    let policy = Arc::new(DomainPolicy::new(
        &config.domain_whitelist,
        &config.sourcemap_blacklist,
    ));

    let cache = TtlCache::new(config.sourcemaps.max_cache_entries);
    let eviction_task = cache.spawn_eviction(config.sourcemaps.eviction_interval());
    let resolver = SourcemapResolver::new(policy.clone(), cache, &config.sourcemaps)?;

    let pipeline = pipeline::from_config(&config.pipeline)?;
    let mirror = config
        .resend_to
        .clone()
        .map(|url| Mirror::new(url, Duration::from_secs(config.resend_timeout_secs)))
        .transpose()?;

    tracing::info!(
        environment = %config.environment,
        service_name = %config.service_name,
        mirror = ?config.resend_to.as_ref().map(|url| url.as_str()),
        "Starting report router"
    );

    let dispatcher = Dispatcher::new(
        Arc::new(resolver),
        pipeline,
        mirror,
        config.environment.clone(),
        config.service_name.clone(),
    );
    let service = ReportService::new(dispatcher, policy, config.max_body_bytes);

    let result = run_http_service(&config.listener.host, config.listener.port, service).await;
    eviction_task.abort();
    result
}
