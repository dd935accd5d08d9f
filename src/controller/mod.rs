//! View controller
//!
//! Owns the page projection and the session's subscriptions, and turns
//! three kinds of input into backend calls and page updates:
//!
//! - **UI events**: clicks and form submissions ([`UiEvent`])
//! - **Auth notifications**: sign-in, sign-out and token refresh
//! - **Data notifications**: child and value changes on watched paths
//!   ([`Notification`])
//!
//! Everything runs on one task. [`ViewController::run`] is the event loop;
//! [`ViewController::process_pending`] drains whatever is already buffered
//! without waiting, which is what tests and the demo binary step with.
//!
//! # Session lifecycle
//!
//! ```text
//! SignedOut --(auth: user U)--> cleanup, SignedIn{U}, upsert profile, start queries
//! SignedIn{U} --(auth: user U)--> token refresh, ignored
//! SignedIn{U} --(auth: user V)--> cleanup, SignedIn{V}, ...
//! any --(auth: none)--> cleanup, SignedOut, splash shown
//! ```

mod events;

pub use events::{Notification, UiEvent};

use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{AuthProvider, ChildEvent, Database, Listener, Query, User};
use crate::config::ProverbsConfig;
use crate::error::{ProverbError, Result};
use crate::model::{toggle_star_snapshot, Comment, Post, UserProfile};
use crate::subscriptions::SubscriptionSet;
use crate::view::{CardId, CommentView, Page, Panel, PostCard, SectionKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn { uid: String },
}

pub struct ViewController {
    db: Arc<dyn Database>,
    auth: Arc<dyn AuthProvider>,
    config: ProverbsConfig,
    page: Page,
    /// Remembered to tell a token refresh from a real sign-in
    current_uid: Option<String>,
    subscriptions: SubscriptionSet<Notification>,
    auth_events: Option<Listener<Option<User>>>,
}

impl ViewController {
    pub fn new(db: Arc<dyn Database>, auth: Arc<dyn AuthProvider>, config: ProverbsConfig) -> Self {
        let collections = &config.collections;
        if collections.write_read_diverge() {
            warn!(
                write_posts = %collections.write_posts,
                write_user_posts = %collections.write_user_posts,
                read_posts = %collections.read_posts,
                read_user_posts = %collections.read_user_posts,
                "New posts are written to collections the live sections do not read"
            );
        }

        Self {
            db,
            auth,
            config,
            page: Page::new(),
            current_uid: None,
            subscriptions: SubscriptionSet::new(),
            auth_events: None,
        }
    }

    /// Page-load bindings: follow auth state and select the recent panel
    pub async fn start(&mut self) {
        self.auth_events = Some(self.auth.watch().await);
        self.show_panel(Panel::Recent);
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn config(&self) -> &ProverbsConfig {
        &self.config
    }

    pub fn current_uid(&self) -> Option<&str> {
        self.current_uid.as_deref()
    }

    pub fn auth_state(&self) -> AuthState {
        match &self.current_uid {
            Some(uid) => AuthState::SignedIn { uid: uid.clone() },
            None => AuthState::SignedOut,
        }
    }

    /// Number of listeners registered for this session
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // === Auth ===

    /// React to an auth-state notification
    pub async fn on_auth_state_changed(&mut self, user: Option<User>) -> Result<()> {
        if let Some(user) = &user {
            if self.current_uid.as_deref() == Some(user.uid.as_str()) {
                debug!(uid = %user.uid, "Token refresh, session unchanged");
                return Ok(());
            }
        }

        self.cleanup_ui();

        match user {
            Some(user) => {
                info!(uid = %user.uid, "Signed in");
                self.current_uid = Some(user.uid.clone());
                self.page.splash_visible = false;
                if let Err(e) = self.write_user_data(&user).await {
                    warn!(uid = %user.uid, error = %e, "Profile upsert failed");
                }
                self.start_database_queries().await
            }
            None => {
                info!("Signed out");
                self.current_uid = None;
                self.page.splash_visible = true;
                Ok(())
            }
        }
    }

    /// Remove every card and release every listener of the session
    pub fn cleanup_ui(&mut self) {
        self.page.clear_sections();
        let closed = self.subscriptions.close_all();
        debug!(closed, "UI cleaned up");
    }

    async fn write_user_data(&self, user: &User) -> Result<()> {
        let profile = UserProfile {
            username: user.display_name.clone(),
            email: user.email.clone(),
            profile_picture: user.photo_url.clone(),
        };
        let path = self.config.collections.user(&user.uid);
        self.db.set(&path, serde_json::to_value(&profile)?).await
    }

    /// Open the three section queries for the signed-in user
    async fn start_database_queries(&mut self) -> Result<()> {
        let uid = self.current_uid.clone().ok_or(ProverbError::NotSignedIn)?;
        let collections = &self.config.collections;
        let queries = [
            (SectionKind::MyTopPosts, collections.top_user_posts_query(&uid)),
            (
                SectionKind::Recent,
                collections.recent_posts_query(self.config.view.recent_limit),
            ),
            (SectionKind::MyPosts, collections.user_posts_query(&uid)),
        ];

        for (section, query) in queries {
            let listener = self.db.watch_children(query).await?;
            self.subscriptions
                .insert(listener, move |event| Notification::Section(section, event));
        }
        debug!(uid = %uid, "Section queries started");
        Ok(())
    }

    // === Writes ===

    /// Create a post authored by the signed-in user. The author name comes
    /// from the stored profile.
    pub async fn new_post_for_current_user(&self, proverb: &str, translation: &str) -> Result<String> {
        let user = self.auth.current_user().ok_or(ProverbError::NotSignedIn)?;
        let profile = self.db.get(&self.config.collections.user(&user.uid)).await?;
        let username = profile
            .and_then(|value| serde_json::from_value::<UserProfile>(value).ok())
            .and_then(|profile| profile.username)
            .unwrap_or_else(|| self.config.view.anonymous_name.clone());

        self.write_new_post(&user.uid, &username, user.photo_url.clone(), proverb, translation)
            .await
    }

    /// Write one post payload to the global and the author's collection in
    /// a single update. Returns the new post id.
    pub async fn write_new_post(
        &self,
        uid: &str,
        username: &str,
        picture: Option<String>,
        proverb: &str,
        translation: &str,
    ) -> Result<String> {
        let post = Post::new(uid, username, picture, proverb, translation);
        let payload = serde_json::to_value(&post)?;

        let collections = &self.config.collections;
        let post_id = self.db.push_key(&collections.new_posts_root());
        let updates = collections
            .new_post_targets(uid, &post_id)
            .into_iter()
            .map(|path| (path, payload.clone()))
            .collect();

        self.db.update(updates).await?;
        debug!(post_id = %post_id, uid = %uid, "Post written");
        Ok(post_id)
    }

    /// Star or unstar a post for the signed-in user, on both the global and
    /// the author's copy
    pub async fn toggle_star(&self, post_id: &str, author_id: &str) -> Result<()> {
        let uid = self.current_uid.clone().ok_or(ProverbError::NotSignedIn)?;
        // An empty segment would collapse the path onto its parent
        if post_id.is_empty() || author_id.is_empty() {
            return Err(ProverbError::InvalidPath(format!(
                "star toggle needs a post id and an author id (post {post_id:?}, author {author_id:?})"
            )));
        }
        let collections = &self.config.collections;

        let global = {
            let uid = uid.clone();
            self.db
                .transaction(
                    &collections.post(post_id),
                    Box::new(move |snapshot| toggle_star_snapshot(snapshot, &uid)),
                )
                .await
        };
        let own = self
            .db
            .transaction(
                &collections.user_post(author_id, post_id),
                Box::new(move |snapshot| toggle_star_snapshot(snapshot, &uid)),
            )
            .await;

        global?;
        own?;
        Ok(())
    }

    /// Append a comment by the signed-in user. Empty text writes nothing and
    /// returns `None`.
    pub async fn create_new_comment(&self, post_id: &str, text: &str) -> Result<Option<String>> {
        let user = self.auth.current_user().ok_or(ProverbError::NotSignedIn)?;
        if text.is_empty() {
            return Ok(None);
        }

        let comment = Comment {
            text: text.to_string(),
            author: user.display_name,
            uid: user.uid,
        };
        let comment_id = self
            .db
            .push(
                &self.config.collections.comments(post_id),
                serde_json::to_value(&comment)?,
            )
            .await?;
        debug!(post_id = %post_id, comment_id = %comment_id, "Comment written");
        Ok(Some(comment_id))
    }

    // === UI ===

    /// Show one panel and hide the rest. Opening the add panel clears the
    /// post form.
    pub fn show_panel(&mut self, panel: Panel) {
        self.page.show_panel(panel);
        if panel == Panel::AddPost {
            self.page.post_form.clear();
        }
    }

    pub async fn handle_ui_event(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::SignInClicked => {
                self.auth.sign_in_with_popup().await?;
            }
            UiEvent::SignOutClicked => self.auth.sign_out().await?,
            UiEvent::MenuClicked(button) => self.show_panel(button.panel()),
            UiEvent::AddClicked => self.show_panel(Panel::AddPost),
            UiEvent::ProverbInput(value) => self.page.post_form.proverb.set_value(value),
            UiEvent::TranslationInput(value) => self.page.post_form.translation.set_value(value),
            UiEvent::SubmitPost => self.submit_post().await?,
            UiEvent::StarClicked { section, post_id } => {
                let author_id = self
                    .page
                    .section(section)
                    .card(&post_id)
                    .map(|card| card.author_id.clone());
                match author_id {
                    Some(author_id) => self.toggle_star(&post_id, &author_id).await?,
                    None => debug!(post_id = %post_id, ?section, "Star click on missing card"),
                }
            }
            UiEvent::CommentInput {
                section,
                post_id,
                text,
            } => {
                if let Some(card) = self.page.section_mut(section).card_mut(&post_id) {
                    card.comment_input.set_value(text);
                }
            }
            UiEvent::SubmitComment { section, post_id } => {
                self.submit_comment(section, &post_id).await?
            }
        }
        Ok(())
    }

    async fn submit_post(&mut self) -> Result<()> {
        let proverb = self.page.post_form.proverb.value.clone();
        let translation = self.page.post_form.translation.value.clone();
        if proverb.is_empty() || translation.is_empty() {
            return Ok(());
        }

        self.page.post_form.clear();
        self.new_post_for_current_user(&proverb, &translation).await?;
        self.show_panel(Panel::MyPosts);
        Ok(())
    }

    async fn submit_comment(&mut self, section: SectionKind, post_id: &str) -> Result<()> {
        let Some(card) = self.page.section_mut(section).card_mut(post_id) else {
            debug!(post_id = %post_id, ?section, "Comment submit on missing card");
            return Ok(());
        };
        let text = std::mem::take(&mut card.comment_input.value);
        card.comment_input.refresh_classes();

        self.create_new_comment(post_id, &text).await?;
        Ok(())
    }

    // === Notifications ===

    /// Apply one backend notification to the page
    pub async fn dispatch(&mut self, notification: Notification) -> Result<()> {
        match notification {
            Notification::Section(section, event) => self.apply_section_event(section, event).await?,
            Notification::Comments(card_id, event) => self.apply_comment_event(card_id, event),
            Notification::StarCount(card_id, value) => match self.page.card_by_id_mut(card_id) {
                Some(card) => card.set_star_count(value.as_ref()),
                None => debug!(?card_id, "Star count for detached card dropped"),
            },
            Notification::Starred(card_id, value) => match self.page.card_by_id_mut(card_id) {
                Some(card) => card.set_starred(value.as_ref()),
                None => debug!(?card_id, "Starred flag for detached card dropped"),
            },
        }
        Ok(())
    }

    async fn apply_section_event(&mut self, section: SectionKind, event: ChildEvent) -> Result<()> {
        match event {
            ChildEvent::Added { key, value } => self.attach_post(section, key, value).await?,
            ChildEvent::Changed { key, value } => {
                let post = parse_post(&key, value);
                match self.page.section_mut(section).card_mut(&key) {
                    Some(card) => card.patch(&post, &self.config.view),
                    None => debug!(post_id = %key, ?section, "Change for missing card dropped"),
                }
            }
            ChildEvent::Removed { key, .. } => {
                if self.page.section_mut(section).remove(&key).is_none() {
                    debug!(post_id = %key, ?section, "Removal of missing card ignored");
                }
            }
        }
        Ok(())
    }

    /// Build a card at the front of `section` and open its listeners
    async fn attach_post(&mut self, section: SectionKind, post_id: String, value: Value) -> Result<()> {
        let Some(uid) = self.current_uid.clone() else {
            debug!(post_id = %post_id, "Post added while signed out, ignored");
            return Ok(());
        };

        let post = parse_post(&post_id, value);
        let card_id = self.page.allocate_card_id();
        let card = PostCard::new(card_id, &post_id, &post, &self.config.view);

        let collections = &self.config.collections;
        let comments_query = Query::new(collections.comments(&post_id));
        let star_count_path = collections.star_count(&post_id);
        let starred_path = collections.starred_by(&post_id, &uid);

        let comments = self.db.watch_children(comments_query).await?;
        self.subscriptions
            .insert(comments, move |event| Notification::Comments(card_id, event));

        let star_count = self.db.watch_value(&star_count_path).await?;
        self.subscriptions
            .insert(star_count, move |value| Notification::StarCount(card_id, value));

        let starred = self.db.watch_value(&starred_path).await?;
        self.subscriptions
            .insert(starred, move |value| Notification::Starred(card_id, value));

        self.page.section_mut(section).prepend(card);
        debug!(post_id = %post_id, ?section, ?card_id, "Card attached");
        Ok(())
    }

    fn apply_comment_event(&mut self, card_id: CardId, event: ChildEvent) {
        let view = &self.config.view;
        let Some(card) = self.page.card_by_id_mut(card_id) else {
            debug!(?card_id, comment_id = %event.key(), "Comment for detached card dropped");
            return;
        };

        match event {
            ChildEvent::Added { key, value } => {
                let comment = parse_comment(&key, value);
                card.add_comment(CommentView::new(key, &comment, view));
            }
            ChildEvent::Changed { key, value } => {
                let comment = parse_comment(&key, value);
                match card.comment_mut(&key) {
                    Some(existing) => *existing = CommentView::new(key, &comment, view),
                    None => debug!(?card_id, comment_id = %key, "Change for missing comment dropped"),
                }
            }
            ChildEvent::Removed { key, .. } => {
                if card.remove_comment(&key).is_none() {
                    debug!(?card_id, comment_id = %key, "Removal of missing comment ignored");
                }
            }
        }
    }

    // === Event loop ===

    /// Handle every auth and data notification already buffered, including
    /// the ones produced while handling. Returns how many were handled.
    pub async fn process_pending(&mut self) -> Result<usize> {
        let mut handled = 0;
        loop {
            if let Some(user) = self.next_ready_auth_event() {
                self.on_auth_state_changed(user).await?;
            } else if let Some(notification) = self.subscriptions.next_ready() {
                self.dispatch(notification).await?;
            } else {
                break;
            }
            handled += 1;
        }
        Ok(handled)
    }

    fn next_ready_auth_event(&mut self) -> Option<Option<User>> {
        self.auth_events.as_mut()?.next().now_or_never().flatten()
    }

    /// Serve UI events, auth changes and data notifications until the UI
    /// channel closes. Handler failures are logged and do not stop the loop.
    pub async fn run(mut self, mut ui_events: mpsc::UnboundedReceiver<UiEvent>) -> Self {
        enum Step {
            Ui(Option<UiEvent>),
            Auth(Option<Option<User>>),
            Data(Notification),
        }

        loop {
            let step = tokio::select! {
                event = ui_events.recv() => Step::Ui(event),
                user = next_auth_event(&mut self.auth_events) => Step::Auth(user),
                notification = self.subscriptions.next() => Step::Data(notification),
            };

            let result = match step {
                Step::Ui(None) => break,
                Step::Ui(Some(event)) => self.handle_ui_event(event).await,
                Step::Auth(Some(user)) => self.on_auth_state_changed(user).await,
                Step::Auth(None) => {
                    warn!("Auth stream ended");
                    self.auth_events = None;
                    Ok(())
                }
                Step::Data(notification) => self.dispatch(notification).await,
            };

            if let Err(e) = result {
                warn!(error = %e, "Event handler failed");
            }
        }

        if let Err(e) = self.process_pending().await {
            warn!(error = %e, "Draining notifications failed");
        }
        self
    }
}

async fn next_auth_event(events: &mut Option<Listener<Option<User>>>) -> Option<Option<User>> {
    match events {
        Some(listener) => listener.next().await,
        None => futures::future::pending().await,
    }
}

fn parse_post(post_id: &str, value: Value) -> Post {
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(post_id = %post_id, error = %e, "Malformed post snapshot");
        Post::default()
    })
}

fn parse_comment(comment_id: &str, value: Value) -> Comment {
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(comment_id = %comment_id, error = %e, "Malformed comment snapshot");
        Comment::default()
    })
}
