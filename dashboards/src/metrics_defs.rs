//! Metrics definitions for the provisioning workflow.

use shared::metrics_defs::{MetricDef, MetricType};

pub const INVOCATIONS: MetricDef = MetricDef {
    name: "workflow.invocations",
    metric_type: MetricType::Counter,
    description: "Number of upload events processed. Tagged with outcome.",
};

pub const WORKFLOW_DURATION: MetricDef = MetricDef {
    name: "workflow.duration",
    metric_type: MetricType::Histogram,
    description: "Time to process one upload event in seconds. Tagged with outcome.",
};

pub const FOLDERS_CREATED: MetricDef = MetricDef {
    name: "grafana.folders.created",
    metric_type: MetricType::Counter,
    description: "Number of year folders created",
};

pub const UPSTREAM_ERRORS: MetricDef = MetricDef {
    name: "grafana.upstream_errors",
    metric_type: MetricType::Counter,
    description: "Number of non-success responses from Grafana. Tagged with status.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    INVOCATIONS,
    WORKFLOW_DURATION,
    FOLDERS_CREATED,
    UPSTREAM_ERRORS,
];
