//! Retrieval of the Grafana API key.

use crate::config::SecretStoreConfig;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use serde_json::{Map, Value};
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    #[error("Error retrieving secret: {0}")]
    Fetch(String),

    #[error("secret {0} has no string value")]
    NoSecretString(String),

    #[error("could not read secret file: {0}")]
    Io(#[from] io::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("secret is not a JSON object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} not found in secrets")]
    MissingField(String),
}

/// Source of the raw secret document, a JSON object holding the API key.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch_secret(&self) -> Result<String, SecretError>;
}

pub async fn get_secret_store(config: &SecretStoreConfig) -> Box<dyn SecretStore> {
    match config {
        SecretStoreConfig::AwsSecretsManager { secret_id, region } => Box::new(
            AwsSecretsManagerStore::new(secret_id.clone(), region.clone()).await,
        ),
        SecretStoreConfig::File { path } => Box::new(FileSecretStore::new(path.clone())),
        SecretStoreConfig::Env { var } => Box::new(EnvSecretStore::new(var.clone())),
    }
}

pub struct AwsSecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
    secret_id: String,
}

impl AwsSecretsManagerStore {
    pub async fn new(secret_id: String, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        AwsSecretsManagerStore {
            client: aws_sdk_secretsmanager::Client::new(&sdk_config),
            secret_id,
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    async fn fetch_secret(&self) -> Result<String, SecretError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| SecretError::Fetch(DisplayErrorContext(e).to_string()))?;

        output
            .secret_string()
            .map(String::from)
            .ok_or_else(|| SecretError::NoSecretString(self.secret_id.clone()))
    }
}

/// Reads the secret document from disk. Meant for local runs.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: PathBuf) -> Self {
        FileSecretStore { path }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn fetch_secret(&self) -> Result<String, SecretError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

pub struct EnvSecretStore {
    var: String,
}

impl EnvSecretStore {
    pub fn new(var: String) -> Self {
        EnvSecretStore { var }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch_secret(&self) -> Result<String, SecretError> {
        std::env::var(&self.var).map_err(|_| SecretError::MissingEnv(self.var.clone()))
    }
}

pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Extracts the API key from a secret document. An empty key counts as missing.
    pub fn from_secret(raw: &str, field: &str) -> Result<Self, SecretError> {
        let document: Map<String, Value> = serde_json::from_str(raw)?;

        match document.get(field) {
            Some(Value::String(key)) if !key.is_empty() => Ok(Credentials {
                api_key: key.clone(),
            }),
            _ => Err(SecretError::MissingField(field.to_string())),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
