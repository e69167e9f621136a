use crate::dashboard::{DashboardEnvelope, Folder, SaveDashboardRequest, SaveDashboardResponse};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(thiserror::Error, Debug)]
pub enum GrafanaError {
    #[error("grafana returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("grafana request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct CreateFolderRequest<'a> {
    title: &'a str,
}

/// Minimal client for the Grafana HTTP API, authenticated with a service
/// account token.
pub struct GrafanaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GrafanaClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        GrafanaClient {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    pub async fn list_folders(&self) -> Result<Vec<Folder>, GrafanaError> {
        let response = self
            .client
            .get(self.endpoint("folders"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        parse_json(response).await
    }

    pub async fn create_folder(&self, title: &str) -> Result<Folder, GrafanaError> {
        let response = self
            .client
            .post(self.endpoint("folders"))
            .bearer_auth(&self.api_key)
            .json(&CreateFolderRequest { title })
            .send()
            .await?;

        parse_json(response).await
    }

    pub async fn get_dashboard(&self, uid: &str) -> Result<DashboardEnvelope, GrafanaError> {
        let response = self
            .client
            .get(self.endpoint(&format!("dashboards/uid/{uid}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        parse_json(response).await
    }

    pub async fn save_dashboard(
        &self,
        request: &SaveDashboardRequest,
    ) -> Result<SaveDashboardResponse, GrafanaError> {
        let response = self
            .client
            .post(self.endpoint("dashboards/db"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        parse_json(response).await
    }
}

// Only 200 counts as success: Grafana answers every call used here with 200.
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, GrafanaError> {
    match response.status() {
        StatusCode::OK => Ok(response.json::<T>().await?),
        status => {
            let body = response.text().await?;
            Err(GrafanaError::Upstream { status, body })
        }
    }
}
