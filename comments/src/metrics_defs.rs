//! Metrics definitions for the comment relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with endpoint, status.",
};

pub const STORE_REQUEST_DURATION: MetricDef = MetricDef {
    name: "store.request.duration",
    metric_type: MetricType::Histogram,
    description: "Duration of the GraphQL call to the store in seconds. Tagged with operation.",
};

pub const STORE_ERRORS: MetricDef = MetricDef {
    name: "store.errors",
    metric_type: MetricType::Counter,
    description: "Number of failed store operations. Tagged with operation, kind.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, STORE_REQUEST_DURATION, STORE_ERRORS];
