//! Client configuration
//!
//! Everything has a default, so an empty TOML file (or none at all) gives
//! the stock behavior: posts are written under `/proverbs` and
//! `/user-proverbs` while the live sections read `/posts` and `/user-posts`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::backend::{DbPath, Query};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProverbsConfig {
    #[serde(default)]
    pub collections: CollectionsConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl ProverbsConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Top-level collection names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// Global collection new posts are written to
    #[serde(default = "default_write_posts")]
    pub write_posts: String,

    /// Per-author collection new posts are written to
    #[serde(default = "default_write_user_posts")]
    pub write_user_posts: String,

    /// Global collection the recent section reads and stars target
    #[serde(default = "default_read_posts")]
    pub read_posts: String,

    /// Per-author collection the personal sections read and stars target
    #[serde(default = "default_read_user_posts")]
    pub read_user_posts: String,

    #[serde(default = "default_comments")]
    pub comments: String,

    #[serde(default = "default_users")]
    pub users: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// How many posts the recent section keeps
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Shown when a post or comment has no author
    #[serde(default = "default_anonymous_name")]
    pub anonymous_name: String,

    /// Avatar used when a post has no author picture
    #[serde(default = "default_placeholder_avatar")]
    pub placeholder_avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Attempts before an in-process transaction gives up
    #[serde(default = "default_transaction_retries")]
    pub transaction_retries: u32,
}

// Defaults
fn default_write_posts() -> String { "proverbs".to_string() }
fn default_write_user_posts() -> String { "user-proverbs".to_string() }
fn default_read_posts() -> String { "posts".to_string() }
fn default_read_user_posts() -> String { "user-posts".to_string() }
fn default_comments() -> String { "post-comments".to_string() }
fn default_users() -> String { "users".to_string() }
fn default_recent_limit() -> usize { 100 }
fn default_anonymous_name() -> String { "Anonymous".to_string() }
fn default_placeholder_avatar() -> String { "./silhouette.jpg".to_string() }
fn default_transaction_retries() -> u32 { 25 }

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            write_posts: default_write_posts(),
            write_user_posts: default_write_user_posts(),
            read_posts: default_read_posts(),
            read_user_posts: default_read_user_posts(),
            comments: default_comments(),
            users: default_users(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            anonymous_name: default_anonymous_name(),
            placeholder_avatar: default_placeholder_avatar(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            transaction_retries: default_transaction_retries(),
        }
    }
}

impl CollectionsConfig {
    /// True when new posts land somewhere the live sections never read
    pub fn write_read_diverge(&self) -> bool {
        self.write_posts != self.read_posts || self.write_user_posts != self.read_user_posts
    }

    /// Write new posts where the sections read them
    pub fn mirror_write_paths(&mut self) {
        self.write_posts = self.read_posts.clone();
        self.write_user_posts = self.read_user_posts.clone();
    }

    /// Parent used to mint new post ids
    pub fn new_posts_root(&self) -> DbPath {
        DbPath::root().child(&self.write_posts)
    }

    /// Global and per-author destinations of a new post
    pub fn new_post_targets(&self, uid: &str, post_id: &str) -> [DbPath; 2] {
        [
            DbPath::root().child(&self.write_posts).child(post_id),
            DbPath::root()
                .child(&self.write_user_posts)
                .child(uid)
                .child(post_id),
        ]
    }

    pub fn post(&self, post_id: &str) -> DbPath {
        DbPath::root().child(&self.read_posts).child(post_id)
    }

    pub fn user_post(&self, uid: &str, post_id: &str) -> DbPath {
        self.user_posts(uid).child(post_id)
    }

    pub fn user_posts(&self, uid: &str) -> DbPath {
        DbPath::root().child(&self.read_user_posts).child(uid)
    }

    pub fn recent_posts_query(&self, limit: usize) -> Query {
        Query::new(DbPath::root().child(&self.read_posts)).limit_to_last(limit)
    }

    pub fn user_posts_query(&self, uid: &str) -> Query {
        Query::new(self.user_posts(uid))
    }

    pub fn top_user_posts_query(&self, uid: &str) -> Query {
        Query::new(self.user_posts(uid)).order_by_child("starCount")
    }

    pub fn comments(&self, post_id: &str) -> DbPath {
        DbPath::root().child(&self.comments).child(post_id)
    }

    pub fn star_count(&self, post_id: &str) -> DbPath {
        self.post(post_id).child("starCount")
    }

    pub fn starred_by(&self, post_id: &str, uid: &str) -> DbPath {
        self.post(post_id).child("stars").child(uid)
    }

    pub fn user(&self, uid: &str) -> DbPath {
        DbPath::root().child(&self.users).child(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_write_read_split() {
        let collections = CollectionsConfig::default();
        assert!(collections.write_read_diverge());

        let [global, own] = collections.new_post_targets("u1", "k1");
        assert_eq!(global.to_string(), "/proverbs/k1");
        assert_eq!(own.to_string(), "/user-proverbs/u1/k1");
        assert_eq!(collections.user_post("u1", "k1").to_string(), "/user-posts/u1/k1");
        assert_eq!(collections.starred_by("k1", "u2").to_string(), "/posts/k1/stars/u2");
    }

    #[test]
    fn test_mirror_write_paths() {
        let mut collections = CollectionsConfig::default();
        collections.mirror_write_paths();
        assert!(!collections.write_read_diverge());
        assert_eq!(collections.new_posts_root().to_string(), "/posts");
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = ProverbsConfig::from_toml(
            r#"
[view]
recent_limit = 10
"#,
        )
        .unwrap();
        assert_eq!(config.view.recent_limit, 10);
        assert_eq!(config.view.anonymous_name, "Anonymous");
        assert_eq!(config.backend.transaction_retries, 25);
        assert_eq!(config.collections, CollectionsConfig::default());
    }
}
