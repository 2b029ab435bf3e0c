//! WebSocket client for the progress stream.
//!
//! [`ProgressStreamClient`] holds the stream endpoint configuration.
//! [`ProgressStreamClient::open`] returns a [`StreamSession`] right away
//! and spawns a driver task that connects to
//! `{ws_url}/ws/progress/{task_id}` and forwards frames to the session.

use std::time::Duration;

use futures::StreamExt;
use gemggark_core::types::TaskId;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::session::{Frame, StreamSession};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Opens progress stream sessions for submitted tasks.
///
/// Crate-internal seam between the page controller and the stream
/// transport: sessions are only constructible inside this crate, so
/// [`ProgressStreamClient`] and the crate's own tests are the only
/// implementors.
pub trait SessionOpener: Send + Sync {
    /// Start a session for `task_id`. Must not block; the session begins
    /// in the connecting phase.
    fn open(&self, task_id: &TaskId) -> StreamSession;
}

/// Configuration handle for the progress stream endpoint.
pub struct ProgressStreamClient {
    ws_url: String,
    idle_timeout: Option<Duration>,
}

impl ProgressStreamClient {
    /// * `ws_url`       - WebSocket base URL, e.g. `ws://host:8000`.
    /// * `idle_timeout` - silence after which a session is failed.
    pub fn new(ws_url: String, idle_timeout: Option<Duration>) -> Self {
        Self {
            ws_url,
            idle_timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.ws_url.clone(), config.stream_idle_timeout)
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Full stream URL for one task.
    pub fn progress_url(&self, task_id: &TaskId) -> String {
        format!("{}/ws/progress/{}", self.ws_url, task_id)
    }
}

impl SessionOpener for ProgressStreamClient {
    /// Spawns the connection driver on the current Tokio runtime.
    fn open(&self, task_id: &TaskId) -> StreamSession {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let transport = CancellationToken::new();
        let url = self.progress_url(task_id);

        tracing::info!(task_id = %task_id, url = %url, "Opening progress stream");

        tokio::spawn(drive_connection(
            url,
            task_id.clone(),
            frame_tx,
            transport.clone(),
        ));

        StreamSession::new(task_id.clone(), frame_rx, transport, self.idle_timeout)
    }
}

/// Connect, then forward frames until the peer closes, the socket
/// fails, the session stops listening, or the token is cancelled.
async fn drive_connection(
    url: String,
    task_id: TaskId,
    frames: mpsc::UnboundedSender<Frame>,
    transport: CancellationToken,
) {
    let connected = tokio::select! {
        _ = transport.cancelled() => {
            tracing::debug!(task_id = %task_id, "Progress stream closed before connecting");
            return;
        }
        result = connect_async(url.as_str()) => result,
    };

    let mut ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "Failed to connect progress stream");
            let _ = frames.send(Frame::TransportError(e.to_string()));
            return;
        }
    };

    if frames.send(Frame::Opened).is_ok() {
        forward_messages(&mut ws_stream, &task_id, &frames, &transport).await;
    }

    if transport.is_cancelled() {
        if let Err(e) = ws_stream.close(None).await {
            tracing::debug!(task_id = %task_id, error = %e, "Error while closing progress stream");
        }
    }
    tracing::debug!(task_id = %task_id, "Progress stream driver exited");
}

/// Read loop. Text frames are forwarded unparsed; binary, ping and pong
/// frames are ignored.
async fn forward_messages(
    ws_stream: &mut WsStream,
    task_id: &TaskId,
    frames: &mpsc::UnboundedSender<Frame>,
    transport: &CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = transport.cancelled() => return,
            msg = ws_stream.next() => msg,
        };

        let frame = match msg {
            Some(Ok(Message::Text(text))) => Frame::Text(text),
            Some(Ok(Message::Close(close_frame))) => {
                tracing::info!(task_id = %task_id, ?close_frame, "Progress stream closed by server");
                let _ = frames.send(Frame::PeerClosed);
                return;
            }
            Some(Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                continue;
            }
            Some(Err(e)) => {
                let _ = frames.send(Frame::TransportError(e.to_string()));
                return;
            }
            None => {
                let _ = frames.send(Frame::PeerClosed);
                return;
            }
        };

        if frames.send(frame).is_err() {
            // The session has ended and dropped its receiver.
            return;
        }
    }
}
