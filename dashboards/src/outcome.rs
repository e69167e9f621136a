use crate::errors::WorkflowError;
use http::StatusCode;
use serde::Serialize;

pub const SUCCESS_MESSAGE: &str = "Dashboard modified successfully";

/// What the caller of an invocation receives. `body` is itself JSON text:
/// either the quoted success message or an `{"error": ...}` object.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn success() -> Self {
        InvocationResult {
            status_code: StatusCode::OK.as_u16(),
            body: serde_json::Value::from(SUCCESS_MESSAGE).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == StatusCode::OK.as_u16()
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&WorkflowError> for InvocationResult {
    fn from(e: &WorkflowError) -> Self {
        InvocationResult {
            status_code: e.status_code().as_u16(),
            body: serde_json::json!({ "error": e.to_string() }).to_string(),
        }
    }
}
