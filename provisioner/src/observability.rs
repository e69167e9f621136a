use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use shared::metrics_defs::describe_metrics;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderInstalled,
}

/// Installs the global tracing subscriber. Logs go to stderr so `invoke` can
/// print its result on stdout. The returned guard flushes Sentry on drop.
pub fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

pub fn init_metrics(config: &MetricsConfig) -> Result<(), ObservabilityError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(config.prefix.as_str()))?;
    metrics::set_global_recorder(recorder).map_err(|_| ObservabilityError::RecorderInstalled)?;

    describe_metrics(dashboards::metrics_defs::ALL_METRICS);
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}
