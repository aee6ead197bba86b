//! Mock push endpoint for HTTP-level tests
#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const PUSH_PATH: &str = "/loki/api/v1/push";

#[derive(Clone, Debug)]
pub struct ReceivedPush {
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

impl ReceivedPush {
    pub fn lines(&self) -> Vec<String> {
        self.body["streams"][0]["values"]
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v[1].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone)]
struct MockState {
    received: Arc<Mutex<Vec<ReceivedPush>>>,
    status: Arc<AtomicU16>,
}

#[derive(Clone)]
pub struct MockPushServer {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockPushServer {
    /// Start a server that accepts every push with 204
    pub async fn start() -> Self {
        Self::start_with_status(StatusCode::NO_CONTENT).await
    }

    pub async fn start_with_status(status: StatusCode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let state = MockState {
            received: Arc::new(Mutex::new(Vec::new())),
            status: Arc::new(AtomicU16::new(status.as_u16())),
        };

        let app = Router::new()
            .route(PUSH_PATH, post(push))
            .with_state(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn push_url(&self) -> String {
        format!("http://{}{}", self.addr, PUSH_PATH)
    }

    pub fn set_status(&self, status: StatusCode) {
        self.state.status.store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<ReceivedPush> {
        self.state.received.lock().unwrap().clone()
    }

    /// Every line received so far, across pushes, in arrival order
    pub fn lines(&self) -> Vec<String> {
        self.pushes().iter().flat_map(|p| p.lines()).collect()
    }

    pub async fn wait_for_pushes(&self, count: usize, timeout: Duration) -> Vec<ReceivedPush> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let pushes = self.pushes();
            if pushes.len() >= count || tokio::time::Instant::now() >= deadline {
                return pushes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_lines(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let lines = self.lines();
            if lines.len() >= count || tokio::time::Instant::now() >= deadline {
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn push(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    state
        .received
        .lock()
        .unwrap()
        .push(ReceivedPush { content_type, body });

    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}
