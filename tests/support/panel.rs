use std::{
    fs,
    path::{Path, PathBuf},
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use dtrees::{
    config::{PanelSettings, ScriptSettings},
    server::{AppState, router},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Output root, scripts directory and a router serving them.
pub struct Panel {
    _temp: TempDir,
    pub output: PathBuf,
    pub scripts: PathBuf,
    router: Router,
}

impl Panel {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("create tempdir");
        let output = temp.path().join("output");
        let scripts = temp.path().join("scripts");
        fs::create_dir_all(&output).expect("create output root");
        fs::create_dir_all(&scripts).expect("create scripts dir");
        let settings = PanelSettings {
            output_root: output.clone(),
            scripts: ScriptSettings {
                dir: scripts.clone(),
                interpreter: "sh".into(),
                interpreter_args: Vec::new(),
                train_timeout_secs: 10,
                compare_timeout_secs: 10,
            },
            ..PanelSettings::default()
        };
        Self {
            router: router(AppState::new(&settings)),
            _temp: temp,
            output,
            scripts,
        }
    }

    pub fn make_run(&self, run_id: &str, id_file: &str) -> PathBuf {
        let dir = self.output.join(run_id);
        fs::create_dir_all(&dir).expect("create run dir");
        fs::write(dir.join(id_file), b"").expect("write id file");
        dir
    }

    pub fn write_script(&self, name: &str, body: &str) {
        fs::write(self.scripts.join(name), body).expect("write script");
    }

    pub fn output_path(&self, relative: &str) -> PathBuf {
        self.output.join(Path::new(relative))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn get_bytes(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, bytes.to_vec())
    }

    async fn send(&self, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
