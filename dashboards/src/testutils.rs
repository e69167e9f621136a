use crate::secrets::{SecretError, SecretStore};
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TEMPLATE_UID: &str = "c5b181b2-38c4-4e1e-bde5-abdda68f2642";

/// Hands out a fixed secret document.
pub struct StaticSecretStore(pub String);

impl StaticSecretStore {
    pub fn with_api_key(api_key: &str) -> Self {
        StaticSecretStore(json!({ "grafana-api-key": api_key }).to_string())
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn fetch_secret(&self) -> Result<String, SecretError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    status: u16,
    body: String,
}

impl MockResponse {
    pub fn new(status: u16, body: &str) -> Self {
        MockResponse {
            status,
            body: body.to_string(),
        }
    }
}

struct StoredDashboard {
    dashboard: Value,
    folder_id: i64,
}

#[derive(Default)]
struct MockState {
    next_id: i64,
    folders: Vec<Value>,
    dashboards: HashMap<String, StoredDashboard>,
    requests: Vec<RecordedRequest>,
    failures: HashMap<String, VecDeque<MockResponse>>,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn route(&mut self, method: &str, path: &str, body: Value) -> (u16, Value) {
        match (method, path) {
            ("GET", "/api/folders") => (200, Value::Array(self.folders.clone())),
            ("POST", "/api/folders") => {
                let id = 100 + self.next_id();
                let folder = json!({"id": id, "uid": format!("folder-{id}"), "title": body["title"]});
                self.folders.push(folder.clone());
                (200, folder)
            }
            ("POST", "/api/dashboards/db") => self.save_dashboard(body),
            ("GET", p) if p.starts_with("/api/dashboards/uid/") => {
                let uid = &p["/api/dashboards/uid/".len()..];
                match self.dashboards.get(uid) {
                    Some(stored) => (
                        200,
                        json!({
                            "dashboard": stored.dashboard,
                            "meta": {"folderId": stored.folder_id, "canSave": true}
                        }),
                    ),
                    None => (404, json!({"message": "Dashboard not found"})),
                }
            }
            _ => (404, json!({"message": "Not found"})),
        }
    }

    // Mirrors the checks Grafana applies on save: new dashboards must have a
    // unique title within their folder, updates must carry the stored version.
    fn save_dashboard(&mut self, body: Value) -> (u16, Value) {
        let mut dashboard = body["dashboard"].clone();
        let folder_id = body["folderId"].as_i64().unwrap_or(0);
        let overwrite = body["overwrite"].as_bool().unwrap_or(false);

        let (uid, id, version) = match dashboard["uid"].as_str().map(String::from) {
            Some(uid) => match self.dashboards.get(&uid) {
                Some(existing) => {
                    let stored_version = existing.dashboard["version"].as_i64().unwrap_or(0);
                    if !overwrite && dashboard["version"].as_i64() != Some(stored_version) {
                        return (
                            412,
                            json!({"message": "The dashboard has been changed by someone else", "status": "version-mismatch"}),
                        );
                    }
                    (uid, existing.dashboard["id"].clone(), stored_version + 1)
                }
                None => (uid, json!(self.next_id()), 1),
            },
            None => {
                let name_taken = self.dashboards.values().any(|stored| {
                    stored.folder_id == folder_id && stored.dashboard["title"] == dashboard["title"]
                });
                if name_taken && !overwrite {
                    return (
                        412,
                        json!({"message": "A dashboard with the same name in the folder already exists", "status": "name-exists"}),
                    );
                }
                let id = self.next_id();
                (format!("dash-{id}"), json!(id), 1)
            }
        };

        dashboard["uid"] = json!(uid);
        dashboard["id"] = id.clone();
        dashboard["version"] = json!(version);
        self.dashboards.insert(
            uid.clone(),
            StoredDashboard {
                dashboard,
                folder_id,
            },
        );

        (
            200,
            json!({
                "id": id,
                "uid": uid,
                "url": format!("/d/{uid}"),
                "status": "success",
                "version": version
            }),
        )
    }
}

/// In-process stand-in for the Grafana HTTP API. Keeps folders and dashboards
/// in memory and records every request it receives.
#[derive(Clone)]
pub struct MockGrafana {
    port: u16,
    state: Arc<Mutex<MockState>>,
}

impl MockGrafana {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(MockState::default()));

        let server_state = state.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let state = server_state.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        async move { Ok::<_, Infallible>(handle(state, req).await) }
                    });

                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        MockGrafana { port, state }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn set_folders(&self, folders: Value) {
        let folders = folders.as_array().cloned().unwrap_or_default();
        self.state.lock().unwrap().folders = folders;
    }

    pub fn folders(&self) -> Vec<Value> {
        self.state.lock().unwrap().folders.clone()
    }

    pub fn add_dashboard(&self, dashboard: Value, folder_id: i64) {
        let uid = dashboard["uid"].as_str().unwrap().to_string();
        self.state.lock().unwrap().dashboards.insert(
            uid,
            StoredDashboard {
                dashboard,
                folder_id,
            },
        );
    }

    /// Stored dashboard and the folder it lives in
    pub fn dashboard(&self, uid: &str) -> Option<(Value, i64)> {
        self.state
            .lock()
            .unwrap()
            .dashboards
            .get(uid)
            .map(|stored| (stored.dashboard.clone(), stored.folder_id))
    }

    /// Queues a canned response for the next request matching `"METHOD /path"`.
    pub fn fail_next(&self, route: &str, response: MockResponse) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(route.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

async fn handle(state: Arc<Mutex<MockState>>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization,
        body: body.clone(),
    });

    let canned = state
        .failures
        .get_mut(&format!("{method} {path}"))
        .and_then(|queue| queue.pop_front());

    let (status, payload) = match canned {
        Some(response) => (response.status, Bytes::from(response.body)),
        None => {
            let (status, json) = state.route(&method, &path, body);
            (status, Bytes::from(json.to_string()))
        }
    };

    let mut response = Response::new(Full::new(payload));
    *response.status_mut() = StatusCode::from_u16(status).unwrap();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// A template dashboard shaped like the ones this service clones.
pub fn template_dashboard() -> Value {
    json!({
        "id": 7,
        "uid": TEMPLATE_UID,
        "title": "FinOps Template",
        "version": 3,
        "schemaVersion": 39,
        "tags": ["finops"],
        "panels": [
            {
                "id": 1,
                "title": "Monthly spend",
                "type": "timeseries",
                "targets": [
                    {
                        "refId": "A",
                        "datasource": {"type": "marcusolsson-json-datasource", "uid": "json"},
                        "url": "https://placeholder.example.com/data.json",
                        "format": "timeseries"
                    }
                ]
            },
            {
                "id": 2,
                "title": "Spend by service",
                "type": "barchart",
                "targets": [
                    {"refId": "A", "datasource": {"uid": "json"}},
                    {"refId": "B", "datasource": {"type": "prometheus", "uid": "prom"}}
                ]
            }
        ]
    })
}

pub fn s3_event(bucket: &str, key: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "awsRegion": "ap-south-1",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": {"name": bucket},
                "object": {"key": key, "size": 2048}
            }
        }]
    }))
    .unwrap()
}
