use crate::workflow::Workflow;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::http::{make_boxed_error_response, make_json_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Accepts upload events over HTTP. `POST /` with the event document runs
/// the workflow; the response status mirrors the invocation result.
pub struct InvocationService {
    workflow: Arc<Workflow>,
}

impl InvocationService {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        InvocationService { workflow }
    }
}

impl Service<Request<Incoming>> for InvocationService {
    type Response = Response<BoxBody<Bytes, ServiceError>>;
    type Error = ServiceError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let workflow = self.workflow.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            if let Some(rejection) = reject(&parts.method, parts.uri.path()) {
                return Ok(rejection);
            }

            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    tracing::warn!("Failed to read request body: {e}");
                    return Ok(make_boxed_error_response(StatusCode::BAD_REQUEST));
                }
            };

            invoke(&workflow, &body).await
        })
    }
}

fn reject(method: &Method, path: &str) -> Option<Response<BoxBody<Bytes, ServiceError>>> {
    if path != "/" {
        return Some(make_boxed_error_response(StatusCode::NOT_FOUND));
    }
    if method != Method::POST {
        return Some(make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED));
    }
    None
}

async fn invoke(
    workflow: &Workflow,
    body: &[u8],
) -> Result<Response<BoxBody<Bytes, ServiceError>>, ServiceError> {
    let result = workflow.handle_event(body).await;
    let json = serde_json::to_vec(&result)?;
    Ok(make_json_response(result.status(), json))
}
