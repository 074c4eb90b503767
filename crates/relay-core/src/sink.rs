use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::patch::{self, Patch};
use crate::protocol::ServerMessage;

/// Destination for server messages produced during a request.
///
/// Producers (the dispatcher and tool executors) only ever see this trait;
/// whether messages go to a socket or into a test buffer is up to the caller.
pub trait PatchSink: Send + Sync {
    fn send(&self, message: ServerMessage);

    /// Encode `value` under `base` and send each resulting patch in order.
    fn encode(&self, value: &Value, base: &str, accumulate: bool) {
        patch::encode(value, base, accumulate, &mut |p| {
            self.send(ServerMessage::Patch(p));
        });
    }
}

impl PatchSink for mpsc::UnboundedSender<ServerMessage> {
    fn send(&self, message: ServerMessage) {
        // A closed receiver means the connection is gone; delivery is best effort.
        let _ = mpsc::UnboundedSender::send(self, message);
    }
}

/// In-memory sink that records everything sent to it.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<ServerMessage>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ServerMessage> {
        self.messages.lock().clone()
    }

    pub fn patches(&self) -> Vec<Patch> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| m.as_patch().cloned())
            .collect()
    }

    pub fn done_count(&self) -> usize {
        self.messages.lock().iter().filter(|m| m.is_done()).count()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl PatchSink for CollectingSink {
    fn send(&self, message: ServerMessage) {
        self.messages.lock().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collecting_sink_records_in_order() {
        let sink = CollectingSink::new();
        sink.encode(&json!({"a": "1", "b": "2"}), "payload[0].output", false);
        sink.send(ServerMessage::Done);

        let messages = sink.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], ServerMessage::Patch(Patch::set("payload[0].output.a", "1")));
        assert_eq!(messages[1], ServerMessage::Patch(Patch::set("payload[0].output.b", "2")));
        assert!(messages[2].is_done());
        assert_eq!(sink.done_count(), 1);
        assert_eq!(sink.patches().len(), 2);
    }

    #[tokio::test]
    async fn channel_sink_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        PatchSink::send(&tx, ServerMessage::Done);
        tx.encode(&json!("x"), "payload[0].output.body", true);

        assert!(rx.recv().await.unwrap().is_done());
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::Patch(Patch::append("payload[0].output.body", "x"))
        );
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
        drop(rx);
        PatchSink::send(&tx, ServerMessage::Done);
    }
}
