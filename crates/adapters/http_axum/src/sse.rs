//! Server-Sent Events (SSE) stream of v2 resource changes.
//!
//! Every subscriber gets its own bounded channel. Broadcasting walks the
//! client list once and drops the clients whose channel is closed or full.

use std::convert::Infallible;
use std::sync::{Mutex, PoisonError};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use huehub_app::ports::EventPublisher;
use huehub_domain::time::{Timestamp, now, rfc3339};

use crate::state::AppState;

const CLIENT_BUFFER: usize = 32;

/// One message of the Hue event stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamMessage {
    pub creationtime: String,
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: Vec<Value>,
}

impl StreamMessage {
    #[must_use]
    pub fn new(kind: &'static str, data: Vec<Value>) -> Self {
        Self {
            creationtime: rfc3339(now()),
            id: Uuid::new_v4(),
            kind,
            data,
        }
    }
}

fn to_event(at: Timestamp, message: &StreamMessage) -> Option<Event> {
    match serde_json::to_string(&[message]) {
        Ok(json) => Some(Event::default().id(format!("{}:0", at.timestamp())).data(json)),
        Err(err) => {
            tracing::warn!(%err, "failed to serialize stream message");
            None
        }
    }
}

/// The event stream subscribers of one hub.
#[derive(Debug, Default)]
pub struct SseClients {
    clients: Mutex<Vec<mpsc::Sender<Event>>>,
}

impl SseClients {
    /// Register a client. Its first message is an empty `add` event.
    ///
    /// Clients that disconnected since the last broadcast are forgotten here.
    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        if let Some(event) = to_event(now(), &StreamMessage::new("add", Vec::new())) {
            let _ = tx.try_send(event);
        }
        let mut clients = self.lock();
        clients.retain(|client| !client.is_closed());
        clients.push(tx);
        rx
    }

    /// Send `message` to every client, dropping the ones that fail.
    pub fn broadcast(&self, message: &StreamMessage) {
        let Some(event) = to_event(now(), message) else {
            return;
        };
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|tx| tx.try_send(event.clone()).is_ok());
        let dropped = before - clients.len();
        if dropped > 0 {
            tracing::debug!(dropped, "removed stream clients");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<Event>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `GET /eventstream/clip/v2`
pub async fn stream<P>(
    State(state): State<AppState<P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>
where
    P: EventPublisher + Send + Sync + 'static,
{
    let rx = state.sse.subscribe();
    tracing::debug!(hub = state.hub.index, clients = state.sse.len(), "stream client connected");
    Sse::new(ReceiverStream::new(rx).map(Ok)).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_send_empty_add_event_on_subscribe() {
        let clients = SseClients::default();
        let mut rx = clients.subscribe();
        assert!(rx.recv().await.is_some());
        assert_eq!(clients.len(), 1);
    }

    #[tokio::test]
    async fn should_broadcast_to_every_client() {
        let clients = SseClients::default();
        let mut first = clients.subscribe();
        let mut second = clients.subscribe();
        first.recv().await.unwrap();
        second.recv().await.unwrap();

        clients.broadcast(&StreamMessage::new("update", vec![serde_json::json!({"id": "x"})]));

        assert!(first.recv().await.is_some());
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn should_drop_disconnected_clients_during_broadcast() {
        let clients = SseClients::default();
        let kept = clients.subscribe();
        let gone = clients.subscribe();
        drop(gone);

        clients.broadcast(&StreamMessage::new("update", Vec::new()));

        assert_eq!(clients.len(), 1);
        drop(kept);
    }

    #[tokio::test]
    async fn should_forget_disconnected_clients_on_subscribe() {
        let clients = SseClients::default();
        for _ in 0..3 {
            drop(clients.subscribe());
        }
        let kept = clients.subscribe();

        assert_eq!(clients.len(), 1);
        drop(kept);
    }

    #[test]
    fn should_serialize_message_as_hue_event() {
        let message = StreamMessage::new("update", Vec::new());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "update");
        assert!(json["data"].as_array().unwrap().is_empty());
    }
}
