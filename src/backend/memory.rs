//! In-process realtime database
//!
//! Holds the whole tree as one JSON document behind a mutex. Every write
//! re-evaluates all registered watches against the new tree while the lock
//! is still held, so each listener observes writes in commit order and a
//! multi-path update is observed as a single change.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

use super::listener::{ChildEvent, Listener, ListenerId, Unsubscribe};
use super::path::DbPath;
use super::push_id::PushIdGenerator;
use super::query::Query;
use super::{Database, TransactionUpdate};
use crate::config::BackendConfig;
use crate::error::{ProverbError, Result};

/// A registered watch and the last state its listener was told about
enum Watch {
    Children {
        query: Query,
        last: Vec<(String, Value)>,
        tx: mpsc::UnboundedSender<ChildEvent>,
    },
    Value {
        path: DbPath,
        last: Option<Value>,
        tx: mpsc::UnboundedSender<Option<Value>>,
    },
}

impl Watch {
    /// Bring the listener up to date with `tree`. Returns false once the
    /// receiving side is gone so the watch can be pruned.
    fn refresh(&mut self, tree: &Value) -> bool {
        match self {
            Watch::Children { query, last, tx } => {
                let next = query.window(lookup(tree, query.path()));
                for event in diff_children(last, &next) {
                    if tx.send(event).is_err() {
                        return false;
                    }
                }
                *last = next;
                !tx.is_closed()
            }
            Watch::Value { path, last, tx } => {
                let next = lookup(tree, path).cloned();
                if next != *last {
                    if tx.send(next.clone()).is_err() {
                        return false;
                    }
                    *last = next;
                }
                !tx.is_closed()
            }
        }
    }
}

struct DbInner {
    tree: Mutex<Value>,
    watches: DashMap<ListenerId, Watch>,
    next_listener: AtomicU64,
    push_ids: std::sync::Mutex<PushIdGenerator>,
    transaction_retries: u32,
}

impl DbInner {
    fn notify(&self, tree: &Value) {
        self.watches.retain(|id, watch| {
            let alive = watch.refresh(tree);
            if !alive {
                trace!(listener = id, "Pruning watch with dropped receiver");
            }
            alive
        });
    }

    fn next_push_id(&self) -> String {
        self.push_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_id()
    }
}

impl Unsubscribe for DbInner {
    fn unsubscribe(&self, id: ListenerId) {
        if self.watches.remove(&id).is_some() {
            debug!(listener = id, "Watch released");
        }
    }
}

/// In-process implementation of [`Database`]
#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Arc<DbInner>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new(&BackendConfig::default())
    }
}

impl MemoryDatabase {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(DbInner {
                tree: Mutex::new(Value::Object(Map::new())),
                watches: DashMap::new(),
                next_listener: AtomicU64::new(1),
                push_ids: std::sync::Mutex::new(PushIdGenerator::new()),
                transaction_retries: config.transaction_retries,
            }),
        }
    }

    /// Number of live watches (child and value)
    pub fn listener_count(&self) -> usize {
        self.inner.watches.len()
    }

    /// Copy of the whole tree
    pub async fn snapshot(&self) -> Value {
        self.inner.tree.lock().await.clone()
    }

    fn register(&self, watch: Watch) -> ListenerId {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.watches.insert(id, watch);
        id
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn get(&self, path: &DbPath) -> Result<Option<Value>> {
        let tree = self.inner.tree.lock().await;
        Ok(lookup(&tree, path).cloned())
    }

    async fn set(&self, path: &DbPath, value: Value) -> Result<()> {
        let mut tree = self.inner.tree.lock().await;
        write(&mut tree, path.segments(), normalize(value));
        self.inner.notify(&tree);
        Ok(())
    }

    async fn update(&self, updates: Vec<(DbPath, Value)>) -> Result<()> {
        for (i, (a, _)) in updates.iter().enumerate() {
            for (b, _) in &updates[i + 1..] {
                if a.contains(b) || b.contains(a) {
                    return Err(ProverbError::InvalidPath(format!(
                        "overlapping paths {a} and {b} in one update"
                    )));
                }
            }
        }

        let mut tree = self.inner.tree.lock().await;
        for (path, value) in updates {
            write(&mut tree, path.segments(), normalize(value));
        }
        self.inner.notify(&tree);
        Ok(())
    }

    fn push_key(&self, _parent: &DbPath) -> String {
        self.inner.next_push_id()
    }

    async fn push(&self, parent: &DbPath, value: Value) -> Result<String> {
        let key = self.inner.next_push_id();
        self.set(&parent.child(&key), value).await?;
        Ok(key)
    }

    async fn transaction(
        &self,
        path: &DbPath,
        mut update: TransactionUpdate,
    ) -> Result<Option<Value>> {
        let attempts = self.inner.transaction_retries.max(1);
        for attempt in 1..=attempts {
            let current = {
                let tree = self.inner.tree.lock().await;
                lookup(&tree, path).cloned()
            };

            // The handler runs outside the lock; other writers may interleave
            let proposed = update(current.clone()).and_then(normalize);

            let mut tree = self.inner.tree.lock().await;
            if lookup(&tree, path) != current.as_ref() {
                debug!(%path, attempt, "Transaction conflict, retrying");
                continue;
            }
            if proposed != current {
                write(&mut tree, path.segments(), proposed.clone());
                self.inner.notify(&tree);
            }
            return Ok(proposed);
        }

        Err(ProverbError::TransactionAborted {
            path: path.to_string(),
            attempts,
        })
    }

    async fn watch_children(&self, query: Query) -> Result<Listener<ChildEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Hold the tree so the initial children and registration are atomic
        let tree = self.inner.tree.lock().await;
        let initial = query.window(lookup(&tree, query.path()));
        for (key, value) in &initial {
            let _ = tx.send(ChildEvent::Added {
                key: key.clone(),
                value: value.clone(),
            });
        }
        debug!(path = %query.path(), children = initial.len(), "Child watch opened");
        let id = self.register(Watch::Children {
            query,
            last: initial,
            tx,
        });
        drop(tree);
        Ok(Listener::new(id, rx, self.inner.clone()))
    }

    async fn watch_value(&self, path: &DbPath) -> Result<Listener<Option<Value>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let tree = self.inner.tree.lock().await;
        let initial = lookup(&tree, path).cloned();
        let _ = tx.send(initial.clone());
        debug!(%path, "Value watch opened");
        let id = self.register(Watch::Value {
            path: path.clone(),
            last: initial,
            tx,
        });
        drop(tree);
        Ok(Listener::new(id, rx, self.inner.clone()))
    }
}

/// Find the node at `path`. Empty objects count as absent.
fn lookup<'a>(tree: &'a Value, path: &DbPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| node.get(segment.as_str()))
        .filter(|node| !is_empty_node(node))
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Strip nulls and empty objects; a value that strips to nothing is absent
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other),
    }
}

/// Store or remove a value, creating intermediate objects on the way down
/// and pruning the ones left empty on the way back up.
fn write(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or_else(|| Value::Object(Map::new()));
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };

    if rest.is_empty() {
        match value {
            Some(value) => {
                map.insert(head.clone(), value);
            }
            None => {
                map.remove(head);
            }
        }
        return;
    }

    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    write(child, rest, value);
    if is_empty_node(child) {
        map.remove(head);
    }
}

/// Child events turning `old` into `new`: removals first, then additions
/// and changes in the new window's order.
fn diff_children(old: &[(String, Value)], new: &[(String, Value)]) -> Vec<ChildEvent> {
    let previous: HashMap<&str, &Value> = old.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let current: HashSet<&str> = new.iter().map(|(k, _)| k.as_str()).collect();

    let mut events: Vec<ChildEvent> = old
        .iter()
        .filter(|(k, _)| !current.contains(k.as_str()))
        .map(|(key, value)| ChildEvent::Removed {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();

    for (key, value) in new {
        match previous.get(key.as_str()) {
            None => events.push(ChildEvent::Added {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(old_value) if *old_value != value => events.push(ChildEvent::Changed {
                key: key.clone(),
                value: value.clone(),
            }),
            Some(_) => {}
        }
    }

    events
}
