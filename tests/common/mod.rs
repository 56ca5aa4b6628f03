#![allow(dead_code)]

use std::process::{Command, Output};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

use backoffice::{ApiRequest, BackofficeError, Result, Transport};

/// Helper struct to run backoffice commands in an isolated temp directory
pub struct BackofficeTest {
    pub temp_dir: TempDir,
}

impl BackofficeTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        BackofficeTest { temp_dir }
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let root = self.temp_dir.path();
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_backoffice"));
        cmd.args(args)
            .current_dir(root)
            .env("BACKOFFICE_ROOT", root.join(".backoffice"))
            .env("XDG_DATA_HOME", root.join("data"))
            .env("HOME", root)
            .env("NO_COLOR", "1")
            .env_remove("BACKOFFICE_TOKEN")
            .env_remove("BACKOFFICE_BASE_URL")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("Failed to execute backoffice command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Command {:?} should have failed\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let mut args = args.to_vec();
        args.push("--json");
        let stdout = self.run_success(&args);
        serde_json::from_str(&stdout).expect("command output should be JSON")
    }
}

/// A request waiting for the test to answer it.
pub struct PendingCall {
    pub request: ApiRequest,
    reply: oneshot::Sender<Result<Value>>,
}

impl PendingCall {
    pub fn respond(self, result: Result<Value>) {
        let _ = self.reply.send(result);
    }

    pub fn ok(self, body: Value) {
        self.respond(Ok(body));
    }
}

/// Transport whose responses are supplied by the test, in any order.
pub struct ScriptedTransport {
    calls: mpsc::UnboundedSender<PendingCall>,
}

pub struct Script {
    calls: mpsc::UnboundedReceiver<PendingCall>,
}

impl Script {
    /// Wait for the next request the code under test sends.
    pub async fn next(&mut self) -> PendingCall {
        tokio::time::timeout(Duration::from_secs(5), self.calls.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("transport dropped")
    }

    pub fn try_next(&mut self) -> Option<PendingCall> {
        self.calls.try_recv().ok()
    }
}

pub fn scripted() -> (Arc<ScriptedTransport>, Script) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Arc::new(ScriptedTransport { calls: tx }),
        Script { calls: rx },
    )
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        self.calls
            .send(PendingCall { request, reply: tx })
            .map_err(|_| BackofficeError::Network("script closed".to_string()))?;
        rx.await
            .map_err(|_| BackofficeError::Network("no response scripted".to_string()))?
    }
}

/// A record with an id and a name.
pub fn row(id: u64, name: &str) -> Value {
    json!({ "id": id, "name": name })
}

/// A paginated list response in the backend's usual envelope.
pub fn paginator(items: Vec<Value>, current_page: u32, last_page: u32, total: u32) -> Value {
    json!({
        "status": true,
        "data": {
            "data": items,
            "current_page": current_page,
            "last_page": last_page,
            "per_page": 10,
            "total": total,
        }
    })
}

pub fn request_failed(status: u16, message: &str) -> BackofficeError {
    BackofficeError::Request {
        status: Some(status),
        message: message.to_string(),
    }
}
