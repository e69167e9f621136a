//! Serde model of the Grafana dashboard documents this crate reads and writes.
//!
//! Only the fields the workflow touches are typed. Everything else lands in
//! `extra_fields` and is written back as read. Typed optional fields are
//! written back only when they hold a value, so an explicit `null` in one of
//! them is dropped from the saved copy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RewriteError {
    #[error("dashboard has no panels")]
    MissingPanels,

    #[error("panel {0} has no targets")]
    MissingTargets(String),

    #[error("target {index} of panel {panel} has no datasource")]
    MissingDatasource { panel: String, index: usize },
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Folder {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub title: String,
}

/// Response of `GET /api/dashboards/uid/{uid}`
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DashboardEnvelope {
    pub dashboard: Dashboard,
    #[serde(default)]
    pub meta: Value,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Dashboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panels: Option<Vec<Panel>>,
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

impl Dashboard {
    /// Copy of this dashboard under a new title, without the identifiers Grafana
    /// uses to match an existing record. Saving it creates a new dashboard.
    pub fn clone_as(&self, title: &str) -> Dashboard {
        Dashboard {
            uid: None,
            id: None,
            title: title.to_string(),
            ..self.clone()
        }
    }

    pub fn panel_titles(&self) -> Vec<&str> {
        self.panels
            .iter()
            .flatten()
            .map(|p| p.title.as_deref().unwrap_or(""))
            .collect()
    }

    /// Points every target of every panel at `url` through the given datasource
    /// plugin. Returns the number of targets rewritten.
    ///
    /// Panels are not inspected first. A dashboard without panels, a panel
    /// without targets or a target without a datasource aborts the rewrite,
    /// leaving earlier panels mutated.
    pub fn rewrite_targets(&mut self, datasource_type: &str, url: &str) -> Result<usize, RewriteError> {
        let panels = self.panels.as_mut().ok_or(RewriteError::MissingPanels)?;
        let mut rewritten = 0;

        for (panel_index, panel) in panels.iter_mut().enumerate() {
            let panel_name = panel.display_name(panel_index);
            let targets = panel
                .targets
                .as_mut()
                .ok_or_else(|| RewriteError::MissingTargets(panel_name.clone()))?;

            for (index, target) in targets.iter_mut().enumerate() {
                let datasource =
                    target
                        .datasource
                        .as_mut()
                        .ok_or_else(|| RewriteError::MissingDatasource {
                            panel: panel_name.clone(),
                            index,
                        })?;

                datasource.r#type = Some(datasource_type.to_string());
                target.url = Some(url.to_string());
                rewritten += 1;
            }
        }

        Ok(rewritten)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Panel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<Target>>,
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

impl Panel {
    fn display_name(&self, index: usize) -> String {
        match &self.title {
            Some(title) => format!("{title:?}"),
            None => format!("#{index}"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<Datasource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Datasource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

/// Body of `POST /api/dashboards/db`
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveDashboardRequest {
    pub dashboard: Dashboard,
    pub folder_id: i64,
    pub overwrite: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SaveDashboardResponse {
    pub uid: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
}
