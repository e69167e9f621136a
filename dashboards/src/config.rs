use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_FOLDER_PREFIX: &str = "Fin-ops-";
pub const DEFAULT_DATASOURCE_TYPE: &str = "yesoreyeram-infinity-datasource";
pub const DEFAULT_SECRET_ID: &str = "grafana/api";
pub const DEFAULT_API_KEY_FIELD: &str = "grafana-api-key";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Template dashboard uid cannot be empty")]
    EmptyTemplateUid,

    #[error("Folder prefix cannot be empty")]
    EmptyFolderPrefix,

    #[error("Secret identifier cannot be empty")]
    EmptySecretId,

    #[error("API key field cannot be empty")]
    EmptyApiKeyField,
}

/// Provisioner configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener receiving upload events when running as a service
    #[serde(default = "Listener::default_main")]
    pub listener: Listener,
    /// Listener for health and readiness probes
    #[serde(default = "Listener::default_admin")]
    pub admin_listener: Listener,
    pub grafana: GrafanaConfig,
    pub secret_store: SecretStoreConfig,
    /// Field of the secret document holding the Grafana API key
    #[serde(default = "default_api_key_field")]
    pub api_key_field: String,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.grafana.template_uid.trim().is_empty() {
            return Err(ValidationError::EmptyTemplateUid);
        }
        if self.grafana.folder_prefix.is_empty() {
            return Err(ValidationError::EmptyFolderPrefix);
        }
        if self.api_key_field.is_empty() {
            return Err(ValidationError::EmptyApiKeyField);
        }

        self.secret_store.validate()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    fn default_main() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }

    fn default_admin() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3001,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Where the Grafana instance lives and how generated dashboards are shaped.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GrafanaConfig {
    /// Base URL of the Grafana HTTP API, e.g. `http://grafana.internal:3000`
    pub url: Url,
    /// Uid of the dashboard every generated dashboard is cloned from
    pub template_uid: String,
    /// Folder titles are this prefix followed by the year
    #[serde(default = "default_folder_prefix")]
    pub folder_prefix: String,
    /// Plugin id every panel target is repointed to
    #[serde(default = "default_datasource_type")]
    pub datasource_type: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum SecretStoreConfig {
    AwsSecretsManager {
        #[serde(default = "default_secret_id")]
        secret_id: String,
        /// Falls back to the region of the ambient AWS configuration
        region: Option<String>,
    },
    File {
        path: PathBuf,
    },
    Env {
        var: String,
    },
}

impl SecretStoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let empty = match self {
            SecretStoreConfig::AwsSecretsManager { secret_id, .. } => secret_id.is_empty(),
            SecretStoreConfig::File { path } => path.as_os_str().is_empty(),
            SecretStoreConfig::Env { var } => var.is_empty(),
        };

        if empty {
            return Err(ValidationError::EmptySecretId);
        }
        Ok(())
    }
}

/// The subset of the configuration a single workflow run needs.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowConfig {
    pub grafana_url: Url,
    pub template_uid: String,
    pub folder_prefix: String,
    pub datasource_type: String,
    pub api_key_field: String,
}

impl From<&Config> for WorkflowConfig {
    fn from(config: &Config) -> Self {
        WorkflowConfig {
            grafana_url: config.grafana.url.clone(),
            template_uid: config.grafana.template_uid.clone(),
            folder_prefix: config.grafana.folder_prefix.clone(),
            datasource_type: config.grafana.datasource_type.clone(),
            api_key_field: config.api_key_field.clone(),
        }
    }
}

fn default_folder_prefix() -> String {
    DEFAULT_FOLDER_PREFIX.into()
}

fn default_datasource_type() -> String {
    DEFAULT_DATASOURCE_TYPE.into()
}

fn default_secret_id() -> String {
    DEFAULT_SECRET_ID.into()
}

fn default_api_key_field() -> String {
    DEFAULT_API_KEY_FIELD.into()
}
