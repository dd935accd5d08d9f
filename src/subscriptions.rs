//! Per-session registry of live listeners
//!
//! Every listener the controller opens goes through a `SubscriptionSet`.
//! Each one is tagged on the way in, so notifications from all of them come
//! out of a single merged stream as `T`. `close_all` releases every handle
//! exactly once and leaves the set empty and reusable.

use futures::stream::{BoxStream, SelectAll};
use futures::{FutureExt, StreamExt};
use tracing::debug;

use crate::backend::{Listener, ListenerHandle};

pub struct SubscriptionSet<T> {
    handles: Vec<ListenerHandle>,
    streams: SelectAll<BoxStream<'static, T>>,
}

impl<T: Send + 'static> SubscriptionSet<T> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            streams: SelectAll::new(),
        }
    }

    /// Register a listener, mapping each of its notifications with `tag`
    pub fn insert<E, F>(&mut self, listener: Listener<E>, tag: F)
    where
        E: Send + 'static,
        F: Fn(E) -> T + Send + 'static,
    {
        let (handle, stream) = listener.into_parts();
        self.handles.push(handle);
        self.streams.push(stream.map(tag).boxed());
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Close every registered listener and empty the set. Returns how many
    /// were closed.
    pub fn close_all(&mut self) -> usize {
        let closed = self
            .handles
            .drain(..)
            .filter(|handle| handle.close())
            .count();
        self.streams = SelectAll::new();
        if closed > 0 {
            debug!(closed, "Subscriptions released");
        }
        closed
    }

    /// Next notification that is already buffered, without waiting
    pub fn next_ready(&mut self) -> Option<T> {
        self.streams.next().now_or_never().flatten()
    }

    /// Wait for the next notification. Never resolves while the set is
    /// empty, so it can sit in a `select!` next to other sources.
    pub async fn next(&mut self) -> T {
        loop {
            if self.streams.is_empty() {
                futures::future::pending::<()>().await;
            }
            if let Some(item) = self.streams.next().await {
                return item;
            }
        }
    }
}

impl<T: Send + 'static> Default for SubscriptionSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SubscriptionSet<T> {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Database, DbPath, MemoryDatabase};
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    enum Tagged {
        A(Option<serde_json::Value>),
        B(Option<serde_json::Value>),
    }

    #[tokio::test]
    async fn test_merges_tagged_notifications() {
        let db = MemoryDatabase::default();
        let a = DbPath::parse("/a").unwrap();
        let b = DbPath::parse("/b").unwrap();

        let mut set = SubscriptionSet::new();
        set.insert(db.watch_value(&a).await.unwrap(), Tagged::A);
        set.insert(db.watch_value(&b).await.unwrap(), Tagged::B);
        assert_eq!(set.len(), 2);

        let mut initial = vec![set.next_ready().unwrap(), set.next_ready().unwrap()];
        initial.sort_by_key(|t| matches!(t, Tagged::B(_)));
        assert_eq!(initial, vec![Tagged::A(None), Tagged::B(None)]);
        assert!(set.next_ready().is_none());

        db.set(&b, json!(1)).await.unwrap();
        assert_eq!(set.next().await, Tagged::B(Some(json!(1))));
    }

    #[tokio::test]
    async fn test_close_all_is_idempotent() {
        let db = MemoryDatabase::default();
        let mut set: SubscriptionSet<()> = SubscriptionSet::new();
        assert_eq!(set.close_all(), 0);

        set.insert(db.watch_value(&DbPath::root()).await.unwrap(), |_| ());
        set.insert(db.watch_value(&DbPath::root()).await.unwrap(), |_| ());
        assert_eq!(db.listener_count(), 2);

        assert_eq!(set.close_all(), 2);
        assert!(set.is_empty());
        assert_eq!(db.listener_count(), 0);
        assert!(set.next_ready().is_none());
        assert_eq!(set.close_all(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_listeners() {
        let db = MemoryDatabase::default();
        {
            let mut set = SubscriptionSet::new();
            set.insert(db.watch_value(&DbPath::root()).await.unwrap(), |v| v);
            assert_eq!(db.listener_count(), 1);
        }
        assert_eq!(db.listener_count(), 0);
    }
}
