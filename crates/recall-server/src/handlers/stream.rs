//! `GET /stream`: server-sent events of every `BusEvent` a viewer
//! subscribes to, for the life of the HTTP connection. No event replay;
//! a viewer only sees events published after it connects.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use tokio::sync::mpsc;

use recall_bus::{EventBus, SubscriberId};
use recall_types::BusEvent;

use crate::state::AppState;

/// Wraps the bus receiver so the subscription is cleaned up the moment the
/// viewer disconnects and this stream is dropped, rather than lingering
/// until the next full-channel eviction.
struct BusEventStream {
    bus: EventBus,
    id: SubscriberId,
    rx: mpsc::Receiver<BusEvent>,
}

impl Stream for BusEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                let sse_event = Event::default().event(event.name()).data(payload);
                Poll::Ready(Some(Ok(sse_event)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for BusEventStream {
    fn drop(&mut self) {
        let bus = self.bus.clone();
        let id = self.id;
        tokio::spawn(async move { bus.unsubscribe(id).await });
    }
}

pub async fn stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.bus.subscribe().await;
    let stream = BusEventStream { bus: state.bus.clone(), id, rx };
    Sse::new(stream).keep_alive(KeepAlive::default())
}
