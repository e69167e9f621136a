//! Turns one uploaded report into a Grafana dashboard cloned from the template.

use crate::config::WorkflowConfig;
use crate::dashboard::{Folder, SaveDashboardRequest};
use crate::errors::{Result, WorkflowError};
use crate::event::{UploadNotification, extract_year, folder_title};
use crate::grafana::{GrafanaClient, GrafanaError};
use crate::metrics_defs::{FOLDERS_CREATED, INVOCATIONS, UPSTREAM_ERRORS, WORKFLOW_DURATION};
use crate::outcome::InvocationResult;
use crate::secrets::{Credentials, SecretStore};
use shared::{counter, histogram};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FolderResolution {
    Existing(i64),
    Created(i64),
}

impl FolderResolution {
    pub fn id(&self) -> i64 {
        match self {
            FolderResolution::Existing(id) | FolderResolution::Created(id) => *id,
        }
    }
}

/// Summary of a successful run
#[derive(Clone, Debug, PartialEq)]
pub struct Provisioned {
    pub uid: String,
    pub title: String,
    pub folder: FolderResolution,
    pub targets_rewritten: usize,
}

pub struct Workflow {
    config: WorkflowConfig,
    secrets: Box<dyn SecretStore>,
}

impl Workflow {
    pub fn new(config: WorkflowConfig, secrets: Box<dyn SecretStore>) -> Self {
        Workflow { config, secrets }
    }

    /// Processes a raw upload event. Never fails: every error is folded into
    /// the returned result.
    pub async fn handle_event(&self, body: &[u8]) -> InvocationResult {
        let start = Instant::now();

        let result = match UploadNotification::from_s3_event(body) {
            Ok(notification) => self.run(&notification).await,
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        counter!(INVOCATIONS, "outcome" => outcome).increment(1);
        histogram!(WORKFLOW_DURATION, "outcome" => outcome).record(start.elapsed().as_secs_f64());

        match result {
            Ok(provisioned) => {
                tracing::info!(
                    uid = %provisioned.uid,
                    title = %provisioned.title,
                    folder_id = provisioned.folder.id(),
                    targets = provisioned.targets_rewritten,
                    "Dashboard modified successfully"
                );
                InvocationResult::success()
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    kind = e.kind(),
                    status = e.status_code().as_u16(),
                    "Provisioning failed"
                );
                InvocationResult::from(&e)
            }
        }
    }

    pub async fn run(&self, notification: &UploadNotification) -> Result<Provisioned> {
        let title = notification.dashboard_title();
        let object_url = notification.object_url();
        tracing::info!(
            bucket = %notification.bucket,
            key = %notification.object_key,
            title,
            "Provisioning dashboard for upload"
        );

        let year = extract_year(title).ok_or_else(|| {
            WorkflowError::Validation("Year not found in dashboard title".into())
        })?;
        let folder_title = folder_title(&self.config.folder_prefix, year);

        let secret = self.secrets.fetch_secret().await?;
        let credentials = Credentials::from_secret(&secret, &self.config.api_key_field)?;
        let grafana = GrafanaClient::new(self.config.grafana_url.as_str(), credentials.api_key());

        let template = grafana
            .get_dashboard(&self.config.template_uid)
            .await
            .inspect_err(count_upstream_error)?;
        let copy = template.dashboard.clone_as(title);

        let folder = resolve_folder(&grafana, &folder_title).await?;

        let mut payload = SaveDashboardRequest {
            dashboard: copy,
            folder_id: folder.id(),
            overwrite: false,
        };
        let created = grafana
            .save_dashboard(&payload)
            .await
            .inspect_err(count_upstream_error)?;
        tracing::info!(uid = %created.uid, folder_id = folder.id(), "Created dashboard copy");

        // The save response only carries identifiers, the full body has to be read back
        let mut saved = grafana
            .get_dashboard(&created.uid)
            .await
            .inspect_err(count_upstream_error)?;
        tracing::debug!(panels = ?saved.dashboard.panel_titles(), "Panels to update");

        let targets_rewritten = saved
            .dashboard
            .rewrite_targets(&self.config.datasource_type, &object_url)?;
        tracing::debug!(targets_rewritten, url = %object_url, "Rewrote panel targets");

        payload.dashboard = saved.dashboard;
        grafana
            .save_dashboard(&payload)
            .await
            .inspect_err(count_upstream_error)?;

        Ok(Provisioned {
            uid: created.uid,
            title: title.to_string(),
            folder,
            targets_rewritten,
        })
    }
}

/// First folder with a matching title, in the order Grafana lists them.
pub fn find_folder_id(folders: &[Folder], title: &str) -> Option<i64> {
    folders.iter().find(|f| f.title == title).map(|f| f.id)
}

/// Looks the folder up by title and creates it when absent.
///
/// Lookup and creation are separate calls without any lock, so two
/// concurrent runs for the same year can both miss the folder and both
/// create one, leaving duplicate titles behind.
pub async fn resolve_folder(grafana: &GrafanaClient, title: &str) -> Result<FolderResolution> {
    let folders = grafana
        .list_folders()
        .await
        .inspect_err(count_upstream_error)?;

    if let Some(id) = find_folder_id(&folders, title) {
        tracing::info!(folder = title, id, "Folder already exists");
        return Ok(FolderResolution::Existing(id));
    }

    let folder = grafana
        .create_folder(title)
        .await
        .inspect_err(count_upstream_error)?;
    counter!(FOLDERS_CREATED).increment(1);
    tracing::info!(folder = %folder.title, id = folder.id, "Created folder");

    Ok(FolderResolution::Created(folder.id))
}

fn count_upstream_error(e: &GrafanaError) {
    if let GrafanaError::Upstream { status, .. } = e {
        tracing::warn!(status = status.as_u16(), "Grafana returned an error");
        counter!(UPSTREAM_ERRORS, "status" => status.as_u16().to_string()).increment(1);
    }
}
