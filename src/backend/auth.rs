//! Identity provider contract and in-process implementation

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use super::listener::{Listener, ListenerId, Unsubscribe};
use crate::error::{ProverbError, Result};

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;

    /// Interactive sign-in through the provider popup
    async fn sign_in_with_popup(&self) -> Result<User>;

    async fn sign_out(&self) -> Result<()>;

    /// Auth-state notifications. The current state is delivered first; a
    /// token refresh re-delivers the same user.
    async fn watch(&self) -> Listener<Option<User>>;
}

#[derive(Default)]
struct AuthState {
    current: Option<User>,
    /// Identity the next popup sign-in resolves to
    popup_identity: Option<User>,
}

#[derive(Default)]
struct AuthInner {
    state: RwLock<AuthState>,
    watchers: DashMap<ListenerId, mpsc::UnboundedSender<Option<User>>>,
    next_id: AtomicU64,
}

impl AuthInner {
    fn broadcast(&self, user: Option<User>) {
        self.watchers.retain(|_, tx| tx.send(user.clone()).is_ok());
    }
}

impl Unsubscribe for AuthInner {
    fn unsubscribe(&self, id: ListenerId) {
        self.watchers.remove(&id);
    }
}

/// In-process identity provider
#[derive(Clone, Default)]
pub struct MemoryAuth {
    inner: Arc<AuthInner>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identity the next popup sign-in will return
    pub fn queue_popup_identity(&self, user: User) {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .popup_identity = Some(user);
    }

    /// Sign in directly, bypassing the popup
    pub fn sign_in_as(&self, user: User) {
        debug!(uid = %user.uid, "Auth: signed in");
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .current = Some(user.clone());
        self.inner.broadcast(Some(user));
    }

    /// Re-deliver the current identity, as a token refresh does
    pub fn refresh_token(&self) {
        if let Some(user) = self.current_user() {
            debug!(uid = %user.uid, "Auth: token refreshed");
            self.inner.broadcast(Some(user));
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.len()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<User> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    async fn sign_in_with_popup(&self) -> Result<User> {
        let user = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .popup_identity
            .take()
            .ok_or_else(|| ProverbError::Auth("popup closed by user".into()))?;
        self.sign_in_as(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        debug!("Auth: signed out");
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .current = None;
        self.inner.broadcast(None);
        Ok(())
    }

    async fn watch(&self) -> Listener<Option<User>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        // Initial state goes out before registration so it precedes any broadcast
        let _ = tx.send(self.current_user());
        self.inner.watchers.insert(id, tx);
        Listener::new(id, rx, self.inner.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};

    #[tokio::test]
    async fn test_watch_delivers_initial_state_then_changes() {
        let auth = MemoryAuth::new();
        let mut watch = auth.watch().await;

        assert_eq!(watch.next().await, Some(None));

        auth.sign_in_as(User::new("alice"));
        assert_eq!(watch.next().await, Some(Some(User::new("alice"))));

        auth.refresh_token();
        assert_eq!(watch.next().await, Some(Some(User::new("alice"))));

        auth.sign_out().await.unwrap();
        assert_eq!(watch.next().await, Some(None));
    }

    #[tokio::test]
    async fn test_popup_without_identity_fails() {
        let auth = MemoryAuth::new();
        assert!(matches!(
            auth.sign_in_with_popup().await,
            Err(ProverbError::Auth(_))
        ));
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_popup_consumes_queued_identity() {
        let auth = MemoryAuth::new();
        auth.queue_popup_identity(User::new("bob").with_display_name("Bob"));

        let user = auth.sign_in_with_popup().await.unwrap();
        assert_eq!(user.uid, "bob");
        assert_eq!(auth.current_user(), Some(user));
        assert!(auth.sign_in_with_popup().await.is_err());
    }

    #[tokio::test]
    async fn test_closed_watch_is_unregistered() {
        let auth = MemoryAuth::new();
        let mut watch = auth.watch().await;
        assert_eq!(auth.watcher_count(), 1);

        watch.close();
        assert_eq!(auth.watcher_count(), 0);

        auth.sign_in_as(User::new("carol"));
        assert_eq!(watch.next().now_or_never(), Some(None));
    }
}
