use crate::dashboard::RewriteError;
use crate::grafana::GrafanaError;
use crate::secrets::SecretError;
use http::StatusCode;
use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;

/// Terminal failure of a single provisioning run. Every variant maps onto a
/// status code in the invocation result.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The upload event or the name derived from it is unusable
    #[error("{0}")]
    Validation(String),

    /// The credentials document lacks the expected field
    #[error("{0}")]
    Configuration(String),

    /// Grafana answered with a non-success status. The body is kept verbatim.
    #[error("{body}")]
    Upstream { status: StatusCode, body: String },

    #[error("{0}")]
    Unexpected(String),
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Upstream { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation",
            WorkflowError::Configuration(_) => "configuration",
            WorkflowError::Upstream { .. } => "upstream",
            WorkflowError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<GrafanaError> for WorkflowError {
    fn from(e: GrafanaError) -> Self {
        match e {
            GrafanaError::Upstream { status, body } => WorkflowError::Upstream { status, body },
            other => WorkflowError::Unexpected(other.to_string()),
        }
    }
}

impl From<SecretError> for WorkflowError {
    fn from(e: SecretError) -> Self {
        match e {
            SecretError::MissingField(field) => {
                WorkflowError::Configuration(format!("{field} not found in secrets"))
            }
            other => WorkflowError::Unexpected(other.to_string()),
        }
    }
}

impl From<RewriteError> for WorkflowError {
    fn from(e: RewriteError) -> Self {
        WorkflowError::Unexpected(e.to_string())
    }
}
