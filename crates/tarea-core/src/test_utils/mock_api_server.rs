// In-process stub of the remote task API, recording enough of each request
// (path, Authorization header, raw body) for tests to assert on the wire
// shape. Serves the same contract the real FastAPI service exposes.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::core_types::Task;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub auth_header: Option<String>,
    pub body_json: Option<Value>,
    pub body_text: Option<String>,
}

struct ApiState {
    expected_token: Mutex<String>,
    issued_token: String,
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicI64,
    recorded: Mutex<Vec<RecordedRequest>>,
}

impl ApiState {
    fn record(
        &self,
        method: &str,
        path: String,
        headers: &HeaderMap,
        body_json: Option<Value>,
        body_text: Option<String>,
    ) {
        let auth_header = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        self.recorded.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path,
            auth_header,
            body_json,
            body_text,
        });
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
        let expected = format!("Bearer {}", self.expected_token.lock().unwrap());
        let presented = headers.get("authorization").and_then(|v| v.to_str().ok());
        if presented == Some(expected.as_str()) {
            Ok(())
        } else {
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Not authenticated"})),
            ))
        }
    }
}

type HandlerResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

async fn register_handler(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> HandlerResult {
    state.record("POST", "/register".to_string(), &headers, Some(body.clone()), None);
    let username = body.get("username").and_then(|v| v.as_str()).unwrap_or("");
    if username == "taken" {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Username already registered"})),
        ));
    }
    Ok(Json(json!({"id": 1, "username": username})))
}

async fn token_handler(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: String,
) -> HandlerResult {
    state.record("POST", "/token".to_string(), &headers, None, Some(body.clone()));
    let password = body
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "password")
        .map(|(_, value)| value)
        .unwrap_or("");
    if password == "wrong" {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        ));
    }
    Ok(Json(
        json!({"access_token": state.issued_token.clone(), "token_type": "bearer"}),
    ))
}

async fn list_handler(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> HandlerResult {
    state.record("GET", "/todos/".to_string(), &headers, None, None);
    state.authorize(&headers)?;
    let tasks = state.tasks.lock().unwrap().clone();
    Ok(Json(serde_json::to_value(tasks).unwrap()))
}

async fn create_handler(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> HandlerResult {
    state.record("POST", "/todos/".to_string(), &headers, Some(body.clone()), None);
    state.authorize(&headers)?;
    let task = Task {
        id: state.next_id.fetch_add(1, Ordering::SeqCst),
        title: body
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        description: body
            .get("description")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string()),
        completed: body
            .get("completed")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    };
    state.tasks.lock().unwrap().push(task.clone());
    Ok(Json(serde_json::to_value(task).unwrap()))
}

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "To-do not found"})),
    )
}

async fn get_one_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> HandlerResult {
    state.record("GET", format!("/todos/{}", id), &headers, None, None);
    state.authorize(&headers)?;
    let tasks = state.tasks.lock().unwrap();
    match tasks.iter().find(|t| t.id == id) {
        Some(task) => Ok(Json(serde_json::to_value(task).unwrap())),
        None => Err(not_found()),
    }
}

async fn update_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> HandlerResult {
    state.record("PUT", format!("/todos/{}", id), &headers, Some(body.clone()), None);
    state.authorize(&headers)?;
    let mut tasks = state.tasks.lock().unwrap();
    match tasks.iter_mut().find(|t| t.id == id) {
        Some(task) => {
            task.title = body
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(&task.title)
                .to_string();
            task.description = body
                .get("description")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string());
            task.completed = body
                .get("completed")
                .and_then(|v| v.as_bool())
                .unwrap_or(task.completed);
            Ok(Json(serde_json::to_value(task.clone()).unwrap()))
        }
        None => Err(not_found()),
    }
}

async fn delete_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> HandlerResult {
    state.record("DELETE", format!("/todos/{}", id), &headers, None, None);
    state.authorize(&headers)?;
    let mut tasks = state.tasks.lock().unwrap();
    let before = tasks.len();
    tasks.retain(|t| t.id != id);
    if tasks.len() == before {
        return Err(not_found());
    }
    Ok(Json(json!({"ok": true})))
}

pub struct MockTaskServer {
    addr: SocketAddr,
    state: Arc<ApiState>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockTaskServer {
    pub async fn start() -> Self {
        let state = Arc::new(ApiState {
            expected_token: Mutex::new("T1".to_string()),
            issued_token: "T1".to_string(),
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            recorded: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/register", post(register_handler))
            .route("/token", post(token_handler))
            .route("/todos/", get(list_handler).post(create_handler))
            .route(
                "/todos/{id}",
                get(get_one_handler).put(update_handler).delete(delete_handler),
            )
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
                    log::error!("Mock task server error: {}", e);
                });
        });

        MockTaskServer {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Preload the server-side task list.
    pub fn seed(&self, tasks: Vec<Task>) {
        *self.state.tasks.lock().unwrap() = tasks;
    }

    /// Change the token the `/todos` routes accept; anything else gets 401.
    pub fn set_expected_token(&self, token: &str) {
        *self.state.expected_token.lock().unwrap() = token.to_string();
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.recorded.lock().unwrap().clone()
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.state.tasks.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
