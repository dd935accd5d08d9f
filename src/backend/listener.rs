//! Push-notification listeners
//!
//! A listener is an async stream of notifications for one path plus a
//! handle that releases it. The two halves can be split so the stream is
//! polled in one place while the handle is kept in a registry. Closing the
//! handle ends the stream immediately: notifications already buffered in
//! the channel are never yielded.

use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Backend-assigned listener identifier
pub type ListenerId = u64;

/// Implemented by backends to drop a listener's registration
pub trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: ListenerId);
}

/// One item-level notification on a child query
#[derive(Debug, Clone, PartialEq)]
pub enum ChildEvent {
    Added { key: String, value: Value },
    Changed { key: String, value: Value },
    Removed { key: String, value: Value },
}

impl ChildEvent {
    pub fn key(&self) -> &str {
        match self {
            ChildEvent::Added { key, .. }
            | ChildEvent::Changed { key, .. }
            | ChildEvent::Removed { key, .. } => key,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            ChildEvent::Added { value, .. }
            | ChildEvent::Changed { value, .. }
            | ChildEvent::Removed { value, .. } => value,
        }
    }
}

/// Releases a listener. Closing is idempotent.
pub struct ListenerHandle {
    id: ListenerId,
    closed: Arc<AtomicBool>,
    backend: Arc<dyn Unsubscribe>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the listener. Returns false if it was already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.backend.unsubscribe(self.id);
        true
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Notification stream half of a listener
pub struct ListenerStream<E> {
    inner: UnboundedReceiverStream<E>,
    closed: Arc<AtomicBool>,
}

impl<E> Stream for ListenerStream<E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        let this = self.get_mut();
        if this.closed.load(Ordering::Acquire) {
            return Poll::Ready(None);
        }
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

/// A live subscription on one path
pub struct Listener<E> {
    handle: ListenerHandle,
    stream: ListenerStream<E>,
}

impl<E> Listener<E> {
    /// Create a listener around a receiver. Backends call this when
    /// registering a watch.
    pub fn new(
        id: ListenerId,
        rx: mpsc::UnboundedReceiver<E>,
        backend: Arc<dyn Unsubscribe>,
    ) -> Self {
        let closed = Arc::new(AtomicBool::new(false));
        Self {
            handle: ListenerHandle {
                id,
                closed: Arc::clone(&closed),
                backend,
            },
            stream: ListenerStream {
                inner: UnboundedReceiverStream::new(rx),
                closed,
            },
        }
    }

    pub fn handle(&self) -> &ListenerHandle {
        &self.handle
    }

    pub fn close(&self) -> bool {
        self.handle.close()
    }

    pub fn into_parts(self) -> (ListenerHandle, ListenerStream<E>) {
        (self.handle, self.stream)
    }
}

impl<E> Stream for Listener<E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        Pin::new(&mut self.get_mut().stream).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[derive(Default)]
    struct Recorder {
        released: Mutex<Vec<ListenerId>>,
    }

    impl Unsubscribe for Recorder {
        fn unsubscribe(&self, id: ListenerId) {
            self.released.lock().unwrap().push(id);
        }
    }

    #[test]
    fn test_stream_yields_in_arrival_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Arc::new(Recorder::default());
        let mut listener = task::spawn(Listener::new(1, rx, recorder));

        assert_pending!(listener.poll_next());
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        assert!(listener.is_woken());
        assert_ready_eq!(listener.poll_next(), Some(1));
        assert_ready_eq!(listener.poll_next(), Some(2));
    }

    #[test]
    fn test_close_drops_buffered_notifications() {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Arc::new(Recorder::default());
        let listener = Listener::new(7, rx, recorder.clone());
        tx.send("pending").unwrap();

        let (handle, stream) = listener.into_parts();
        let mut stream = task::spawn(stream);

        assert!(handle.close());
        assert!(!handle.close());
        assert_ready_eq!(stream.poll_next(), None);
        assert_eq!(*recorder.released.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_child_event_accessors() {
        let event = ChildEvent::Changed {
            key: "p1".into(),
            value: serde_json::json!({"text": "x"}),
        };
        assert_eq!(event.key(), "p1");
        assert_eq!(event.value()["text"], "x");
    }
}
