use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS_TOTAL: MetricDef = MetricDef {
    name: "requests.total",
    metric_type: MetricType::Counter,
    description: "Number of inbound requests, any method",
};

pub const REQUEST_ERRORS: MetricDef = MetricDef {
    name: "requests.errors",
    metric_type: MetricType::Counter,
    description: "Number of requests that failed to be handled. Tagged with reason.",
};

pub const REQUESTS_REJECTED: MetricDef = MetricDef {
    name: "requests.rejected",
    metric_type: MetricType::Counter,
    description: "Number of requests with no matching handler or an unparseable body. Tagged with reason.",
};

pub const REPORTS_TOTAL: MetricDef = MetricDef {
    name: "reports.total",
    metric_type: MetricType::Counter,
    description: "Number of reports forwarded to the pipeline. Tagged with kind.",
};

pub const PIPELINE_PUSH_DURATION: MetricDef = MetricDef {
    name: "pipeline.push.duration",
    metric_type: MetricType::Histogram,
    description: "Time to push an event to the pipeline in seconds",
};

pub const SOURCEMAP_CACHE_HIT: MetricDef = MetricDef {
    name: "sourcemap.cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of sourcemap lookups served from the cache",
};

pub const SOURCEMAP_CACHE_MISS: MetricDef = MetricDef {
    name: "sourcemap.cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of sourcemap lookups that required a fetch",
};

pub const SOURCEMAP_FETCH_DURATION: MetricDef = MetricDef {
    name: "sourcemap.fetch.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch a script and its sourcemap in seconds",
};

pub const SOURCEMAP_RESOLVED: MetricDef = MetricDef {
    name: "sourcemap.resolved",
    metric_type: MetricType::Counter,
    description: "Number of stack frames rewritten to original source positions",
};

pub const MIRROR_ERRORS: MetricDef = MetricDef {
    name: "mirror.errors",
    metric_type: MetricType::Counter,
    description: "Number of requests that could not be replayed to the mirror",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS_TOTAL,
    REQUEST_ERRORS,
    REQUESTS_REJECTED,
    REPORTS_TOTAL,
    PIPELINE_PUSH_DURATION,
    SOURCEMAP_CACHE_HIT,
    SOURCEMAP_CACHE_MISS,
    SOURCEMAP_FETCH_DURATION,
    SOURCEMAP_RESOLVED,
    MIRROR_ERRORS,
];
