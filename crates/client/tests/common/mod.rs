//! In-process mock of the optimization service.
//!
//! Serves `POST /optimize`, `GET /markets/gems` and
//! `GET /ws/progress/{task_id}` on an ephemeral port. Each test scripts
//! the submission reply and the frames pushed over the progress stream.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gemggark_client::api::TaskApi;
use gemggark_client::client::ProgressStreamClient;
use gemggark_client::controller::LivePageController;
use tokio::net::TcpListener;

/// How `POST /optimize` answers.
#[derive(Clone)]
pub enum SubmitReply {
    TaskId(&'static str),
    Reject(StatusCode, &'static str),
    EmptyBody,
}

/// One step of the progress stream script.
#[derive(Clone)]
pub enum Step {
    Send(String),
    SendBinary(Vec<u8>),
    Wait(Duration),
    Close,
}

#[derive(Clone)]
struct MockState {
    reply: SubmitReply,
    script: Arc<Vec<Step>>,
    submitted: Arc<Mutex<Vec<serde_json::Value>>>,
    stream_connections: Arc<AtomicUsize>,
    streamed_task_ids: Arc<Mutex<Vec<String>>>,
    client_closed: Arc<AtomicBool>,
}

/// Handle to a running mock server.
pub struct MockServer {
    pub addr: std::net::SocketAddr,
    state: MockState,
}

impl MockServer {
    pub async fn start(reply: SubmitReply, script: Vec<Step>) -> Self {
        let state = MockState {
            reply,
            script: Arc::new(script),
            submitted: Arc::new(Mutex::new(Vec::new())),
            stream_connections: Arc::new(AtomicUsize::new(0)),
            streamed_task_ids: Arc::new(Mutex::new(Vec::new())),
            client_closed: Arc::new(AtomicBool::new(false)),
        };

        let app = Router::new()
            .route("/optimize", post(submit))
            .route("/markets/gems", get(prices))
            .route("/ws/progress/{task_id}", get(progress))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn controller(&self, idle_timeout: Option<Duration>) -> LivePageController {
        LivePageController::new(
            TaskApi::new(self.api_url()),
            ProgressStreamClient::new(self.ws_url(), idle_timeout),
        )
    }

    pub fn submitted(&self) -> Vec<serde_json::Value> {
        self.state.submitted.lock().unwrap().clone()
    }

    pub fn stream_connections(&self) -> usize {
        self.state.stream_connections.load(Ordering::SeqCst)
    }

    pub fn streamed_task_ids(&self) -> Vec<String> {
        self.state.streamed_task_ids.lock().unwrap().clone()
    }

    pub fn client_closed(&self) -> bool {
        self.state.client_closed.load(Ordering::SeqCst)
    }
}

pub fn event(json: &str) -> Step {
    Step::Send(json.to_string())
}

pub fn wait_ms(ms: u64) -> Step {
    Step::Wait(Duration::from_millis(ms))
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

// ---- handlers ----

async fn submit(State(state): State<MockState>, Json(body): Json<serde_json::Value>) -> Response {
    state.submitted.lock().unwrap().push(body);
    match state.reply {
        SubmitReply::TaskId(id) => Json(serde_json::json!({ "task_id": id })).into_response(),
        SubmitReply::Reject(status, detail) => {
            (status, Json(serde_json::json!({ "detail": detail }))).into_response()
        }
        SubmitReply::EmptyBody => Json(serde_json::json!({})).into_response(),
    }
}

async fn prices() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "영웅 질서의 젬 : 안정": 120000,
        "고급 혼돈의 젬 : 침식": null,
    }))
}

async fn progress(
    ws: WebSocketUpgrade,
    Path(task_id): Path<String>,
    State(state): State<MockState>,
) -> Response {
    state.streamed_task_ids.lock().unwrap().push(task_id);
    ws.on_upgrade(move |socket| run_script(socket, state))
}

async fn run_script(mut socket: WebSocket, state: MockState) {
    state.stream_connections.fetch_add(1, Ordering::SeqCst);

    for step in state.script.iter().cloned() {
        match step {
            Step::Send(text) => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            Step::SendBinary(bytes) => {
                if socket.send(Message::Binary(bytes.into())).await.is_err() {
                    return;
                }
            }
            Step::Wait(delay) => {
                let deadline = tokio::time::sleep(delay);
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        _ = &mut deadline => break,
                        msg = socket.recv() => match msg {
                            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                                state.client_closed.store(true, Ordering::SeqCst);
                                return;
                            }
                            Some(Ok(_)) => {}
                        },
                    }
                }
            }
            Step::Close => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        }
    }

    // Script finished; hold the socket until the client leaves.
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Close(_) = msg {
            break;
        }
    }
    state.client_closed.store(true, Ordering::SeqCst);
}
