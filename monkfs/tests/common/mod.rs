//! In-process fake of the File API, served by axum on an ephemeral port.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Json;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const REPORT_PATH: &str = "/data/report.txt";
pub const REPORT: &str = "quarterly numbers are up across the board\n";
pub const MODIFIED: &str = "2025-01-01T00:00:00Z";
pub const MODIFIED_SECS: u64 = 1_735_689_600;

#[derive(Clone, Debug)]
enum FakeNode {
    Dir,
    File(String),
}

/// One request as the server saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub op: String,
    pub path: String,
    pub pick: Option<String>,
    pub auth: Option<String>,
    pub body: Value,
}

#[derive(Default)]
pub struct FakeFileApi {
    nodes: Mutex<BTreeMap<String, FakeNode>>,
    requests: Mutex<Vec<Recorded>>,
    failures: Mutex<HashMap<String, (u16, Option<String>)>>,
    raw_failures: Mutex<HashMap<String, (u16, String)>>,
    delays: Mutex<HashMap<String, Duration>>,
    ignore_pick: AtomicBool,
}

impl FakeFileApi {
    /// `/`, `/data`, `/data/report.txt`, `/data/empty.txt`, `/data/archive`.
    pub fn with_sample_tree() -> Arc<Self> {
        let api = Self::default();
        api.add_dir("/");
        api.add_dir("/data");
        api.add_dir("/data/archive");
        api.add_file(REPORT_PATH, REPORT);
        api.add_file("/data/empty.txt", "");
        Arc::new(api)
    }

    pub fn add_dir(&self, path: &str) {
        self.nodes.lock().unwrap().insert(path.to_string(), FakeNode::Dir);
    }

    pub fn add_file(&self, path: &str, content: &str) {
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_string(), FakeNode::File(content.to_string()));
    }

    /// Answer every request for `path` with an error envelope.
    pub fn fail(&self, path: &str, status: u16, code: Option<&str>) {
        self.failures
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, code.map(str::to_string)));
    }

    /// Answer every request for `path` with a plain-text body.
    pub fn fail_raw(&self, path: &str, status: u16, body: &str) {
        self.raw_failures
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(path.to_string(), delay);
    }

    /// Answer with the full payload shape even when `pick` is sent.
    pub fn ignore_pick(&self) {
        self.ignore_pick.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.op == op && r.path == path)
            .count()
    }

    fn metadata(path: &str, node: &FakeNode) -> Value {
        let (size, kind, perms) = match node {
            FakeNode::Dir => (0, "directory", "rwxr-xr-x"),
            FakeNode::File(content) => (content.len(), "file", "rw-r--r--"),
        };
        json!({
            "size": size,
            "modified_time": MODIFIED,
            "created_time": MODIFIED,
            "access_time": MODIFIED,
            "type": kind,
            "permissions": perms,
            "path": path,
        })
    }

    fn children(&self, dir: &str) -> Vec<Value> {
        let prefix = if dir == "/" { "/".to_string() } else { format!("{dir}/") };
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.starts_with(&prefix) && p.len() > prefix.len())
            .filter(|(p, _)| !p[prefix.len()..].contains('/'))
            .map(|(p, node)| {
                let (file_type, size) = match node {
                    FakeNode::Dir => ("d", 0),
                    FakeNode::File(content) => ("f", content.len()),
                };
                json!({
                    "name": &p[prefix.len()..],
                    "file_type": file_type,
                    "file_size": size,
                    "file_permissions": "rw-r--r--",
                    "file_modified": MODIFIED,
                    "path": p,
                })
            })
            .collect()
    }
}

fn ok(data: Value) -> Response {
    (StatusCode::OK, Json(json!({"success": true, "data": data}))).into_response()
}

fn err(status: u16, message: &str, code: Option<&str>) -> Response {
    let status = StatusCode::from_u16(status).unwrap();
    let mut body = json!({"success": false, "error": message});
    if let Some(code) = code {
        body["error_code"] = json!(code);
    }
    (status, Json(body)).into_response()
}

async fn handle(
    State(api): State<Arc<FakeFileApi>>,
    Path(op): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = body["path"].as_str().unwrap_or_default().to_string();
    let pick = query.get("pick").cloned();
    api.requests.lock().unwrap().push(Recorded {
        op: op.clone(),
        path: path.clone(),
        pick: pick.clone(),
        auth: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    let pick = if api.ignore_pick.load(Ordering::SeqCst) {
        None
    } else {
        pick
    };

    let delay = api.delays.lock().unwrap().get(&path).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some((status, text)) = api.raw_failures.lock().unwrap().get(&path).cloned() {
        return (StatusCode::from_u16(status).unwrap(), text).into_response();
    }
    if let Some((status, code)) = api.failures.lock().unwrap().get(&path).cloned() {
        return err(status, "injected failure", code.as_deref());
    }

    if op == "store" {
        let content = match &body["content"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        api.add_file(&path, &content);
        let meta = FakeFileApi::metadata(&path, &FakeNode::File(content));
        return ok(json!({"file_metadata": meta}));
    }

    let node = api.nodes.lock().unwrap().get(&path).cloned();
    let Some(node) = node else {
        return err(404, "no such path", Some("RECORD_NOT_FOUND"));
    };

    match (op.as_str(), &node) {
        ("stat", _) => {
            let meta = FakeFileApi::metadata(&path, &node);
            let kind = meta["type"].clone();
            match pick.as_deref() {
                Some("file_metadata") => ok(meta),
                _ => ok(json!({"file_metadata": meta, "type": kind})),
            }
        }
        ("list", FakeNode::Dir) => {
            let entries = api.children(&path);
            match pick.as_deref() {
                Some("entries") => ok(Value::Array(entries)),
                _ => ok(json!({
                    "total": entries.len(),
                    "entries": entries,
                    "has_more": false,
                })),
            }
        }
        ("list", FakeNode::File(_)) => err(400, "not a directory", Some("NOT_A_DIRECTORY")),
        ("retrieve", FakeNode::Dir) => err(400, "is a directory", Some("NOT_A_FILE")),
        ("retrieve", FakeNode::File(content)) => {
            let options = &body["file_options"];
            let bytes = content.as_bytes();
            let start = (options["start_offset"].as_u64().unwrap_or(0) as usize).min(bytes.len());
            let max = options["max_bytes"].as_u64().unwrap_or(0) as usize;
            let end = if max == 0 { bytes.len() } else { (start + max).min(bytes.len()) };
            let slice = String::from_utf8_lossy(&bytes[start..end]).into_owned();
            match pick.as_deref() {
                Some("content") => ok(json!(slice)),
                _ => ok(json!({"content": slice})),
            }
        }
        _ => err(404, "unknown operation", None),
    }
}

pub struct TestServer {
    pub url: String,
    pub api: Arc<FakeFileApi>,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn(api: Arc<FakeFileApi>) -> TestServer {
    let app = Router::new()
        .route("/api/file/{op}", post(handle))
        .with_state(api.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        url: format!("http://{addr}"),
        api,
        handle,
    }
}

/// A local address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
