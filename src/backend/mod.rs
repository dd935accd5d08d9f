//! Realtime database and identity backend
//!
//! The hosted backend is an opaque collaborator. This module pins down the
//! contract the view controller relies on:
//!
//! - **Database**: hierarchical JSON tree with single-value reads, sets,
//!   atomic multi-path updates, push ids, optimistic transactions and
//!   push-notification listeners (child events or whole values)
//! - **AuthProvider**: current identity, popup sign-in, sign-out and an
//!   auth-state stream
//!
//! `MemoryDatabase` and `MemoryAuth` honour the same contract in-process.
//! They back the tests and the demo binary.

mod auth;
mod listener;
mod memory;
mod path;
mod push_id;
mod query;

pub use auth::{AuthProvider, MemoryAuth, User};
pub use listener::{
    ChildEvent, Listener, ListenerHandle, ListenerId, ListenerStream, Unsubscribe,
};
pub use memory::MemoryDatabase;
pub use path::DbPath;
pub use push_id::PushIdGenerator;
pub use query::Query;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Transaction handler: receives the current value (absent = `None`) and
/// returns the value to store. It may run several times when concurrent
/// writers conflict, so it must be a pure function of its input.
pub type TransactionUpdate = Box<dyn FnMut(Option<Value>) -> Option<Value> + Send>;

#[async_trait]
pub trait Database: Send + Sync {
    /// Read a value once
    async fn get(&self, path: &DbPath) -> Result<Option<Value>>;

    /// Replace the value at `path`. `Value::Null` removes it.
    async fn set(&self, path: &DbPath, value: Value) -> Result<()>;

    /// Apply several path assignments as one unit. Listeners observe either
    /// none or all of them. Paths may not overlap.
    async fn update(&self, updates: Vec<(DbPath, Value)>) -> Result<()>;

    /// Generate a fresh push id under `parent` without writing anything
    fn push_key(&self, parent: &DbPath) -> String;

    /// Store `value` under a freshly generated child key and return the key
    async fn push(&self, parent: &DbPath, value: Value) -> Result<String>;

    /// Optimistic read-modify-write. Returns the committed value.
    async fn transaction(&self, path: &DbPath, update: TransactionUpdate) -> Result<Option<Value>>;

    /// Subscribe to item-level changes of a query. Existing children are
    /// delivered as `Added` in query order before any later change.
    async fn watch_children(&self, query: Query) -> Result<Listener<ChildEvent>>;

    /// Subscribe to a whole value. The current value is delivered first.
    async fn watch_value(&self, path: &DbPath) -> Result<Listener<Option<Value>>>;
}
