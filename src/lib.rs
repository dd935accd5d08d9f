//! Proverbs - live proverb-sharing client
//!
//! Signed-in users post proverbs with a translation, star posts and comment
//! on them. Three live sections (recent posts, my posts, my top posts) stay
//! in sync with a hosted realtime database through push subscriptions.
//!
//! # Architecture
//!
//! - **backend**: database and identity contracts, with in-memory
//!   implementations
//! - **controller**: the single-owner view controller. It owns the page and
//!   the session's subscriptions, and reacts to UI events, auth changes and
//!   data notifications.
//! - **view**: the page as a view-model plus HTML rendering
//! - **subscriptions**: registry of live listeners, closed in bulk on
//!   sign-out
//!
//! # Example
//!
//! ```rust,ignore
//! use proverbs::{MemoryAuth, MemoryDatabase, ProverbsConfig, User, ViewController};
//! use std::sync::Arc;
//!
//! let config = ProverbsConfig::default();
//! let db = Arc::new(MemoryDatabase::new(&config.backend));
//! let auth = Arc::new(MemoryAuth::new());
//!
//! let mut controller = ViewController::new(db, auth.clone(), config);
//! controller.start().await;
//!
//! auth.sign_in_as(User::new("alice").with_display_name("Alice"));
//! controller.process_pending().await?;
//! ```

// Database and identity backends
pub mod backend;

// Configuration
pub mod config;

// View controller and its inputs
pub mod controller;

// Error types
pub mod error;

// Stored records
pub mod model;

// Listener registry
pub mod subscriptions;

// Page view-model and rendering
pub mod view;

pub use backend::{AuthProvider, ChildEvent, Database, DbPath, MemoryAuth, MemoryDatabase, Query, User};
pub use config::{BackendConfig, CollectionsConfig, ProverbsConfig, ViewConfig};
pub use controller::{AuthState, Notification, UiEvent, ViewController};
pub use error::{ProverbError, Result};
pub use model::{Comment, Post, UserProfile};
pub use subscriptions::SubscriptionSet;
pub use view::{render_page, MenuButton, Page, Panel, SectionKind};
