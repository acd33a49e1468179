// Stub of the Gemini generateContent endpoint. Responses are queued ahead
// of time; request bodies are recorded for assertions on the payload shape.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

struct GeminiState {
    responses: Mutex<VecDeque<(StatusCode, Value)>>,
    requests: Mutex<Vec<Value>>,
}

async fn generate_handler(
    State(state): State<Arc<GeminiState>>,
    Path(model): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    log::debug!("Mock Gemini server received request for {}", model);
    state.requests.lock().unwrap().push(body);
    match state.responses.lock().unwrap().pop_front() {
        Some((status, value)) => (status, Json(value)),
        None => {
            log::error!("Mock Gemini server ran out of responses");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": {"code": 503, "message": "no responses queued"}})),
            )
        }
    }
}

pub struct MockGeminiServer {
    addr: SocketAddr,
    state: Arc<GeminiState>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockGeminiServer {
    pub async fn start() -> Self {
        let state = Arc::new(GeminiState {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/models/{model}", post(generate_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock Gemini server error: {}", e);
                });
        });

        MockGeminiServer {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn enqueue_ok(&self, body: Value) {
        self.state
            .responses
            .lock()
            .unwrap()
            .push_back((StatusCode::OK, body));
    }

    pub fn enqueue_error(&self, status: u16, body: Value) {
        self.state
            .responses
            .lock()
            .unwrap()
            .push_back((StatusCode::from_u16(status).unwrap(), body));
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<Value> {
        self.state.requests.lock().unwrap().last().cloned()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
