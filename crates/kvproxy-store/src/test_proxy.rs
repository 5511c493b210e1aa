//! In-process stand-in for the redis HTTP proxy, used by the store tests.
//!
//! Runs an axum server on its own thread and runtime so the blocking store
//! client can be driven from ordinary test threads.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use tokio::sync::oneshot;

use crate::record::ResponseEncoding;

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: &'static str,
    pub key: Option<String>,
    pub service: Option<String>,
    pub value: Option<String>,
}

struct StubState {
    encoding: ResponseEncoding,
    records: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<SeenRequest>>,
    fail_with: Mutex<Option<StatusCode>>,
    delay: Mutex<Option<Duration>>,
}

impl StubState {
    fn observe(&self, path: &'static str, mut params: HashMap<String, String>) -> SeenRequest {
        let seen = SeenRequest {
            path,
            key: params.remove("key"),
            service: params.remove("service"),
            value: params.remove("value"),
        };
        self.requests.lock().unwrap().push(seen.clone());
        seen
    }

    async fn interfere(&self) -> Option<Response> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fail_with = *self.fail_with.lock().unwrap();
        fail_with.map(|status| (status, "stub failure").into_response())
    }
}

pub struct StubProxy {
    pub addr: SocketAddr,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubProxy {
    pub fn spawn(encoding: ResponseEncoding) -> Self {
        let state = Arc::new(StubState {
            encoding,
            records: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            delay: Mutex::new(None),
        });

        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = Router::new()
            .route("/redis/get", get(handle_get))
            .route("/redis/set", post(handle_set))
            .route("/redis/delete", post(handle_delete))
            .with_state(state.clone());

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .unwrap();
            });
        });

        Self {
            addr: addr_rx.recv().unwrap(),
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn encoding(&self) -> ResponseEncoding {
        self.state.encoding
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Store a value verbatim, bypassing the set endpoint.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.state
            .records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Answer every subsequent request with `status`.
    pub fn fail_with(&self, status: StatusCode) {
        *self.state.fail_with.lock().unwrap() = Some(status);
    }

    pub fn delay_responses(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = Some(delay);
    }
}

impl Drop for StubProxy {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_get(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let seen = state.observe("/redis/get", params);
    if let Some(resp) = state.interfere().await {
        return resp;
    }

    let stored = seen
        .key
        .and_then(|key| state.records.lock().unwrap().get(&key).cloned())
        .unwrap_or_default();

    match state.encoding {
        ResponseEncoding::Json => stored.into_response(),
        ResponseEncoding::Quoted => serde_json::to_string(&stored)
            .unwrap_or_default()
            .into_response(),
    }
}

async fn handle_set(
    State(state): State<Arc<StubState>>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let seen = state.observe("/redis/set", params);
    if let Some(resp) = state.interfere().await {
        return resp;
    }

    if let (Some(key), Some(value)) = (seen.key, seen.value) {
        state.records.lock().unwrap().insert(key, value);
    }
    "OK".into_response()
}

async fn handle_delete(
    State(state): State<Arc<StubState>>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let seen = state.observe("/redis/delete", params);
    if let Some(resp) = state.interfere().await {
        return resp;
    }

    if let Some(key) = seen.key {
        state.records.lock().unwrap().remove(&key);
    }
    "OK".into_response()
}
