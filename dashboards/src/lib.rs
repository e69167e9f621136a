pub mod config;
pub mod dashboard;
pub mod errors;
pub mod event;
pub mod grafana;
pub mod metrics_defs;
pub mod outcome;
pub mod secrets;
pub mod service;
pub mod workflow;

#[cfg(test)]
mod testutils;

use config::{Config, WorkflowConfig};
use outcome::InvocationResult;
use secrets::get_secret_store;
use service::{InvocationService, ServiceError};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use workflow::Workflow;

pub async fn build_workflow(config: &Config) -> Workflow {
    let secrets = get_secret_store(&config.secret_store).await;
    Workflow::new(WorkflowConfig::from(config), secrets)
}

/// Serves upload events until one of the listeners fails.
pub async fn run(config: Config) -> Result<(), ServiceError> {
    let workflow = Arc::new(build_workflow(&config).await);

    let invocation_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        InvocationService::new(workflow),
    );
    // Everything is initialised by the time the listeners start
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, ServiceError>::new(|| true),
    );

    tokio::try_join!(invocation_task, admin_task)?;
    Ok(())
}

/// Processes a single upload event document.
pub async fn invoke(config: &Config, event: &[u8]) -> InvocationResult {
    build_workflow(config).await.handle_event(event).await
}
