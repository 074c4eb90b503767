use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{FutureExt, SinkExt, StreamExt};
use relay_core::ids::ClientId;
use relay_core::protocol::ProtocolError;
use relay_core::{ClientMessage, PatchSink, ServerMessage, Session, SessionSlot};
use relay_engine::Dispatcher;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const BUSY_MESSAGE: &str = "request already in progress";
pub const MALFORMED_MESSAGE: &str = "malformed message";
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Live WebSocket connections and their request state.
pub struct ClientRegistry {
    clients: DashMap<ClientId, Arc<SessionSlot>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Register a new connection and create its session slot.
    pub fn register(&self) -> (ClientId, Arc<SessionSlot>) {
        let id = ClientId::new();
        let slot = Arc::new(SessionSlot::new());
        let _ = self.clients.insert(id.clone(), Arc::clone(&slot));
        (id, slot)
    }

    pub fn unregister(&self, id: &ClientId) -> bool {
        self.clients.remove(id).is_some()
    }

    pub fn slot(&self, id: &ClientId) -> Option<Arc<SessionSlot>> {
        self.clients.get(id).map(|s| Arc::clone(s.value()))
    }

    /// Number of connected clients.
    pub fn count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears a request's in-flight flag when the dispatch task ends, panics included.
struct InFlightGuard(Arc<Session>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.finish_request();
    }
}

/// Per-connection context for handling inbound frames.
pub(crate) struct Connection {
    pub client_id: ClientId,
    pub slot: Arc<SessionSlot>,
    pub dispatcher: Arc<Dispatcher>,
    pub outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    /// Handle one text frame from the client.
    ///
    /// A prompt starts a dispatch task unless a live request is running; a
    /// prompt after a cancel supersedes the cancelled request. Malformed
    /// frames are answered with an error marker and otherwise ignored.
    pub(crate) fn handle_text(&self, raw: &str) -> Option<tokio::task::JoinHandle<()>> {
        match ClientMessage::parse(raw) {
            Ok(ClientMessage::Prompt(prompt)) => self.start_request(prompt),
            Ok(ClientMessage::Cancel) => {
                info!(client_id = %self.client_id, in_flight = self.slot.is_in_flight(), "cancel requested");
                self.slot.cancel();
                None
            }
            Err(e) => {
                self.reject(&e);
                None
            }
        }
    }

    fn start_request(&self, prompt: String) -> Option<tokio::task::JoinHandle<()>> {
        let Some(session) = self.slot.begin_request() else {
            warn!(client_id = %self.client_id, "prompt rejected, request already in flight");
            PatchSink::send(&self.outbound, ServerMessage::error(BUSY_MESSAGE));
            return None;
        };

        let client_id = self.client_id.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let sink: Arc<dyn PatchSink> = Arc::new(self.outbound.clone());

        Some(tokio::spawn(async move {
            let _guard = InFlightGuard(Arc::clone(&session));
            let run = AssertUnwindSafe(dispatcher.dispatch(&prompt, &session, Arc::clone(&sink)));
            match run.catch_unwind().await {
                Ok(outcome) => debug!(client_id = %client_id, ?outcome, "request finished"),
                Err(_) => {
                    error!(client_id = %client_id, "dispatch panicked");
                    if !session.is_cancelled() {
                        sink.send(ServerMessage::error(INTERNAL_MESSAGE));
                    }
                }
            }
        }))
    }

    fn reject(&self, error: &ProtocolError) {
        warn!(client_id = %self.client_id, error = %error, "malformed client message");
        PatchSink::send(&self.outbound, ServerMessage::error(MALFORMED_MESSAGE));
    }
}

/// Handle a WebSocket connection: split into reader/writer, manage lifecycle with heartbeat.
pub async fn handle_ws_connection(
    socket: WebSocket,
    client_id: ClientId,
    slot: Arc<SessionSlot>,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<Dispatcher>,
    heartbeat: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Writer task: forward messages from channel to WebSocket + periodic ping
    let writer_cid = client_id.clone();
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(msg) => {
                            if ws_tx.send(WsMessage::Text(msg.to_json().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    tracing::trace!(client_id = %writer_cid, "Sent ping");
                }
            }
        }
    });

    let conn = Connection {
        client_id: client_id.clone(),
        slot: Arc::clone(&slot),
        dispatcher,
        outbound: tx,
    };

    // Reader task: parse client frames and drive the session slot
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let _ = conn.handle_text(text.as_str());
                }
                WsMessage::Close(_) => break,
                WsMessage::Binary(_) => {
                    warn!(client_id = %conn.client_id, "binary frame ignored");
                }
                _ => {} // axum answers pings itself
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    // Stop an in-flight dispatch at its next checkpoint.
    slot.cancel();
    let _ = registry.unregister(&client_id);
    info!(client_id = %client_id, "WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::parts::ResponsePart;
    use relay_core::tools::{Tool, ToolEmitter, ToolError};
    use relay_core::Patch;
    use relay_engine::ToolRegistry;
    use relay_llm::mock::{MockProvider, MockResponse};
    use serde_json::{json, Value};

    struct ExplodingTool;

    #[async_trait]
    impl Tool for ExplodingTool {
        fn name(&self) -> &str {
            "explode"
        }
        fn description(&self) -> &str {
            "panics"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _args: Value, _emitter: &ToolEmitter) -> Result<Option<Value>, ToolError> {
            let empty: Vec<Value> = Vec::new();
            Ok(Some(empty[0].clone()))
        }
    }

    fn connection_with(
        responses: Vec<MockResponse>,
        registry: ToolRegistry,
    ) -> (Connection, mpsc::UnboundedReceiver<ServerMessage>) {
        let provider = Arc::new(MockProvider::new(responses));
        let dispatcher = Arc::new(Dispatcher::new(provider, Arc::new(registry)));
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection {
            client_id: ClientId::new(),
            slot: Arc::new(SessionSlot::new()),
            dispatcher,
            outbound: tx,
        };
        (conn, rx)
    }

    fn connection(responses: Vec<MockResponse>) -> (Connection, mpsc::UnboundedReceiver<ServerMessage>) {
        connection_with(responses, ToolRegistry::new())
    }

    #[test]
    fn registry_register_and_unregister() {
        let registry = ClientRegistry::new();
        assert_eq!(registry.count(), 0);

        let (id1, _s1) = registry.register();
        let (id2, _s2) = registry.register();
        assert_eq!(registry.count(), 2);
        assert!(registry.slot(&id1).is_some());

        assert!(registry.unregister(&id1));
        assert!(!registry.unregister(&id1));
        assert_eq!(registry.count(), 1);
        assert!(registry.slot(&id1).is_none());

        assert!(registry.unregister(&id2));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn slots_are_independent() {
        let registry = ClientRegistry::new();
        let (_a, slot_a) = registry.register();
        let (_b, slot_b) = registry.register();
        let session_a = slot_a.begin_request().unwrap();
        let session_b = slot_b.begin_request().unwrap();
        slot_a.cancel();
        assert!(session_a.is_cancelled());
        assert!(!session_b.is_cancelled());
    }

    #[tokio::test]
    async fn prompt_runs_dispatch() {
        let (conn, mut rx) = connection(vec![MockResponse::Parts(vec![ResponsePart::text("hi")])]);

        let task = conn.handle_text(r#"{"prompt":"hello"}"#).unwrap();
        task.await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::Patch(Patch::set("payload[0].output.message", "hi"))
        );
        assert!(rx.recv().await.unwrap().is_done());
        assert!(rx.recv().await.unwrap().is_done());
        assert!(!conn.slot.is_in_flight());
    }

    #[tokio::test]
    async fn malformed_frame_gets_error_marker() {
        let (conn, mut rx) = connection(Vec::new());

        assert!(conn.handle_text("{oops").is_none());
        assert!(conn.handle_text(r#"{"type":"reboot"}"#).is_none());

        for _ in 0..2 {
            assert_eq!(rx.recv().await.unwrap(), ServerMessage::error(MALFORMED_MESSAGE));
        }
        assert!(!conn.slot.is_in_flight());
    }

    #[tokio::test]
    async fn overlapping_prompt_is_rejected() {
        let (conn, mut rx) = connection(vec![MockResponse::delayed(
            Duration::from_millis(50),
            MockResponse::text("slow"),
        )]);

        let first = conn.handle_text(r#"{"prompt":"one"}"#).unwrap();
        assert!(conn.handle_text(r#"{"prompt":"two"}"#).is_none());
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::error(BUSY_MESSAGE));

        first.await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::Patch(Patch::set("payload[0].output.message", "slow"))
        );
    }

    #[tokio::test]
    async fn cancel_sets_session_flag() {
        let (conn, mut rx) = connection(vec![MockResponse::delayed(
            Duration::from_millis(30),
            MockResponse::text("never"),
        )]);

        let task = conn.handle_text(r#"{"prompt":"one"}"#).unwrap();
        assert!(conn.handle_text(r#"{"type":"cancel"}"#).is_none());
        assert!(conn.slot.current().is_cancelled());

        task.await.unwrap();
        assert!(rx.try_recv().is_err());
        assert!(!conn.slot.is_in_flight());
    }

    #[tokio::test]
    async fn prompt_after_cancel_supersedes_request() {
        let (conn, mut rx) = connection(vec![
            MockResponse::delayed(Duration::from_millis(200), MockResponse::text("stale")),
            MockResponse::text("fresh"),
        ]);

        let first = conn.handle_text(r#"{"prompt":"one"}"#).unwrap();
        assert!(conn.handle_text(r#"{"type":"cancel"}"#).is_none());
        let second = conn.handle_text(r#"{"prompt":"two"}"#).unwrap();

        second.await.unwrap();
        first.await.unwrap();

        let mut frames = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            frames.push(msg);
        }
        assert_eq!(
            frames,
            vec![
                ServerMessage::Patch(Patch::set("payload[0].output.message", "fresh")),
                ServerMessage::Done,
                ServerMessage::Done,
            ]
        );
        assert!(!conn.slot.is_in_flight());
    }

    #[tokio::test]
    async fn panicking_tool_reports_error_and_frees_session() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ExplodingTool));
        let (conn, mut rx) = connection_with(
            vec![
                MockResponse::Parts(vec![ResponsePart::tool_call("explode", json!({}))]),
                MockResponse::text("recovered"),
            ],
            registry,
        );

        let task = conn.handle_text(r#"{"prompt":"boom"}"#).unwrap();
        assert!(task.await.is_ok());
        assert!(!conn.slot.is_in_flight());

        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::Patch(Patch::set("payload[0].tool", "explode"))
        );
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::error(INTERNAL_MESSAGE));

        let next = conn.handle_text(r#"{"prompt":"again"}"#).unwrap();
        next.await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::Patch(Patch::set("payload[0].output.message", "recovered"))
        );
    }
}
