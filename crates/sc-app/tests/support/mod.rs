#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use sc_app::ContestConsole;
use sc_core::config::ConsoleConfig;
use sc_core::ports::{
    ClockPort, GatewayError, GatewayPort, GatewayRequest, HttpMethod, PresignedUpload, UploadPort,
};

// ---- scripted gateway ----

/// One scripted reply.
pub enum Reply {
    Now(Result<Value, GatewayError>),
    After(Duration, Result<Value, GatewayError>),
    /// Held until the gate is notified.
    Gated(Arc<Notify>, Result<Value, GatewayError>),
}

/// Gateway fake that answers from per-route queues.
///
/// The last reply of a route repeats; unscripted routes answer 404.
#[derive(Default)]
pub struct ScriptedGateway {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<GatewayRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn ok(&self, method: HttpMethod, path: &str, body: Value) {
        self.on(method, path, Reply::Now(Ok(body)));
    }

    pub fn fail(&self, method: HttpMethod, path: &str, status: u16, message: &str) {
        self.on(
            method,
            path,
            Reply::Now(Err(GatewayError::Status {
                status,
                message: message.to_string(),
            })),
        );
    }

    pub fn calls(&self) -> Vec<GatewayRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: HttpMethod, path: &str) -> Vec<GatewayRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    pub async fn wait_for_call(&self, method: HttpMethod, path: &str) {
        self.wait_for_calls(method, path, 1).await;
    }

    pub async fn wait_for_calls(&self, method: HttpMethod, path: &str, count: usize) {
        while self.calls_to(method, path).len() < count {
            tokio::task::yield_now().await;
        }
    }

    fn next_reply(&self, request: &GatewayRequest) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        let Some(queue) = routes.get_mut(&(request.method, request.path.clone())) else {
            return Reply::Now(Err(not_found()));
        };
        if queue.len() > 1 {
            return queue.pop_front().unwrap();
        }
        match queue.front() {
            Some(Reply::Now(result)) => Reply::Now(result.clone()),
            Some(Reply::After(delay, result)) => Reply::After(*delay, result.clone()),
            Some(Reply::Gated(gate, result)) => Reply::Gated(gate.clone(), result.clone()),
            None => Reply::Now(Err(not_found())),
        }
    }
}

#[async_trait]
impl GatewayPort for ScriptedGateway {
    async fn call(&self, request: GatewayRequest) -> Result<Value, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.next_reply(&request) {
            Reply::Now(result) => result,
            Reply::After(delay, result) => {
                tokio::time::sleep(delay).await;
                result
            }
            Reply::Gated(gate, result) => {
                gate.notified().await;
                result
            }
        }
    }
}

pub fn not_found() -> GatewayError {
    GatewayError::Status {
        status: 404,
        message: "Not Found".to_string(),
    }
}

// ---- upload transport ----

#[derive(Default)]
pub struct RecordingUploader {
    pub uploads: Mutex<Vec<(PresignedUpload, String, usize)>>,
    pub fail_with: Mutex<Option<GatewayError>>,
}

#[async_trait]
impl UploadPort for RecordingUploader {
    async fn upload(
        &self,
        target: &PresignedUpload,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), GatewayError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        self.uploads
            .lock()
            .unwrap()
            .push((target.clone(), file_name.to_string(), bytes.len()));
        Ok(())
    }
}

// ---- clock ----

pub struct FixedClock(pub Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap(),
        )))
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// ---- harness ----

pub struct Harness {
    pub gateway: Arc<ScriptedGateway>,
    pub uploader: Arc<RecordingUploader>,
    pub clock: Arc<FixedClock>,
    pub console: Arc<ContestConsole>,
}

pub fn harness() -> Harness {
    harness_with(ConsoleConfig::defaults())
}

pub fn harness_with(config: ConsoleConfig) -> Harness {
    let gateway = ScriptedGateway::new();
    let uploader = Arc::new(RecordingUploader::default());
    let clock = FixedClock::at(2025, 1, 5, 12, 0, 0);
    let console = Arc::new(ContestConsole::new(
        config,
        gateway.clone(),
        uploader.clone(),
        clock.clone(),
    ));
    Harness {
        gateway,
        uploader,
        clock,
        console,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Scripts the acme project listing with `0007` (December 2024) and `0008`.
pub fn script_acme_projects(gateway: &ScriptedGateway) {
    gateway.ok(
        HttpMethod::Get,
        "/buckets/acme/projects",
        serde_json::json!({"projects": [
            {"name": "0007", "flight_start_date": "2024-12-01", "flight_end_date": "2024-12-31"},
            {"name": "0008", "flight_start_date": "2025-02-01", "flight_end_date": "2025-02-28"}
        ]}),
    );
}
