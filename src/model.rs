//! Records stored in the database
//!
//! Field names on the wire follow the stored layout exactly (`starCount`,
//! `authorPic`, `profile_picture`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// A proverb post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub uid: String,
    /// The proverb itself
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default, deserialize_with = "deserialize_star_count")]
    pub star_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_pic: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stars: BTreeMap<String, bool>,
}

impl Post {
    pub fn new(
        uid: impl Into<String>,
        author: impl Into<String>,
        author_pic: Option<String>,
        proverb: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            author: Some(author.into()),
            uid: uid.into(),
            text: proverb.into(),
            translation: translation.into(),
            star_count: 0,
            author_pic,
            stars: BTreeMap::new(),
        }
    }

    pub fn is_starred_by(&self, uid: &str) -> bool {
        self.stars.get(uid).copied().unwrap_or(false)
    }

    /// Flip `uid`'s star. Returns whether the post is starred afterwards.
    pub fn toggle_star(&mut self, uid: &str) -> bool {
        if self.is_starred_by(uid) {
            self.stars.remove(uid);
            self.star_count = self.star_count.saturating_sub(1);
            false
        } else {
            self.stars.insert(uid.to_string(), true);
            self.star_count += 1;
            true
        }
    }
}

/// Read a stored star count. The database keeps numbers as doubles, so
/// `2.0` counts as 2; negative and non-numeric values count as 0.
pub fn star_count_from(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn deserialize_star_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(star_count_from(&Value::deserialize(deserializer)?))
}

/// Apply [`Post::toggle_star`] to a raw snapshot, touching only `starCount`
/// and `stars`. Absent or unparseable snapshots pass through unchanged.
pub fn toggle_star_snapshot(snapshot: Option<Value>, uid: &str) -> Option<Value> {
    let mut fields = match snapshot {
        Some(Value::Object(fields)) => fields,
        other => return other,
    };

    let mut post: Post = match serde_json::from_value(Value::Object(fields.clone())) {
        Ok(post) => post,
        Err(e) => {
            warn!(error = %e, "Star toggle on malformed post, leaving it untouched");
            return Some(Value::Object(fields));
        }
    };
    post.toggle_star(uid);

    fields.insert("starCount".into(), Value::from(post.star_count));
    if post.stars.is_empty() {
        fields.remove("stars");
    } else {
        let stars = post
            .stars
            .into_iter()
            .map(|(k, v)| (k, Value::Bool(v)))
            .collect();
        fields.insert("stars".into(), Value::Object(stars));
    }
    Some(Value::Object(fields))
}

/// A comment on a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub uid: String,
}

/// Profile stored for every signed-in identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_wire_names() {
        let post = Post::new("u1", "Ana", Some("pic.png".into()), "P", "T");
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(
            value,
            json!({
                "author": "Ana",
                "uid": "u1",
                "text": "P",
                "translation": "T",
                "starCount": 0,
                "authorPic": "pic.png"
            })
        );
    }

    #[test]
    fn test_toggle_star_parity() {
        let mut post = Post::new("author", "A", None, "P", "T");
        post.star_count = 3;
        for n in 1..=7u64 {
            let starred = post.toggle_star("u1");
            assert_eq!(starred, n % 2 == 1);
            assert_eq!(post.star_count, 3 + n % 2);
            assert_eq!(post.is_starred_by("u1"), n % 2 == 1);
        }
    }

    #[test]
    fn test_toggle_star_snapshot_keeps_other_fields() {
        let snapshot = json!({
            "text": "P",
            "translation": "T",
            "starCount": 1,
            "stars": {"other": true},
            "extra": "kept"
        });

        let starred = toggle_star_snapshot(Some(snapshot), "me").unwrap();
        assert_eq!(starred["starCount"], 2);
        assert_eq!(starred["stars"], json!({"other": true, "me": true}));
        assert_eq!(starred["extra"], "kept");

        let unstarred = toggle_star_snapshot(Some(starred), "me").unwrap();
        assert_eq!(unstarred["starCount"], 1);
        assert_eq!(unstarred["stars"], json!({"other": true}));
    }

    #[test]
    fn test_toggle_star_snapshot_last_star_removes_map() {
        let snapshot = json!({"starCount": 1, "stars": {"me": true}});
        let toggled = toggle_star_snapshot(Some(snapshot), "me").unwrap();
        assert_eq!(toggled, json!({"starCount": 0}));
    }

    #[test]
    fn test_toggle_star_snapshot_missing_passes_through() {
        assert_eq!(toggle_star_snapshot(None, "me"), None);
        assert_eq!(toggle_star_snapshot(Some(json!(5)), "me"), Some(json!(5)));
    }

    #[test]
    fn test_toggle_star_snapshot_tolerates_loose_counts() {
        let snapshot = json!({"text": "P", "starCount": 1.0, "stars": {"me": true}});
        let toggled = toggle_star_snapshot(Some(snapshot), "me").unwrap();
        assert_eq!(toggled, json!({"text": "P", "starCount": 0}));

        let snapshot = json!({"starCount": 1.0});
        let toggled = toggle_star_snapshot(Some(snapshot), "me").unwrap();
        assert_eq!(toggled, json!({"starCount": 2, "stars": {"me": true}}));

        let snapshot = json!({"starCount": -1});
        let toggled = toggle_star_snapshot(Some(snapshot), "me").unwrap();
        assert_eq!(toggled, json!({"starCount": 1, "stars": {"me": true}}));
    }

    #[test]
    fn test_star_count_from() {
        assert_eq!(star_count_from(&json!(3)), 3);
        assert_eq!(star_count_from(&json!(3.0)), 3);
        assert_eq!(star_count_from(&json!(-2)), 0);
        assert_eq!(star_count_from(&json!("7")), 0);
    }

    #[test]
    fn test_comment_without_author() {
        let comment: Comment = serde_json::from_value(json!({"text": "hi", "uid": "u"})).unwrap();
        assert_eq!(comment.author, None);
        assert_eq!(serde_json::to_value(&comment).unwrap(), json!({"text": "hi", "uid": "u"}));
    }
}
