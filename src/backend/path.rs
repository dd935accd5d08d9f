//! Hierarchical database paths
//!
//! Paths are slash-separated (`/posts/{postId}/starCount`). Empty segments
//! are ignored, so `posts//abc/` and `/posts/abc` name the same node.

use std::fmt;

use crate::error::{ProverbError, Result};

/// Characters the realtime database refuses inside a key
const FORBIDDEN_KEY_CHARS: &[char] = &['.', '#', '$', '[', ']'];

/// A location in the database tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The root of the tree
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path, rejecting keys with forbidden characters
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            if segment.contains(FORBIDDEN_KEY_CHARS) {
                return Err(ProverbError::InvalidPath(format!(
                    "segment {segment:?} in {raw:?} contains one of . # $ [ ]"
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Descend into a child. The key may itself contain slashes.
    pub fn child(&self, key: impl AsRef<str>) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            key.as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` for the root
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when `self` is `other` or one of its ancestors
    pub fn contains(&self, other: &DbPath) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_empty_segments() {
        let path = DbPath::parse("posts//abc/").unwrap();
        assert_eq!(path.to_string(), "/posts/abc");
        assert_eq!(path.key(), Some("abc"));
    }

    #[test]
    fn test_parse_rejects_forbidden_chars() {
        assert!(matches!(
            DbPath::parse("/users/a.b"),
            Err(ProverbError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_child_splits_nested_keys() {
        let path = DbPath::root().child("user-posts").child("u1/p1");
        assert_eq!(path.segments(), ["user-posts", "u1", "p1"]);
        assert_eq!(path.parent().unwrap().to_string(), "/user-posts/u1");
    }

    #[test]
    fn test_contains() {
        let posts = DbPath::parse("/posts").unwrap();
        let star_count = posts.child("p1").child("starCount");
        assert!(posts.contains(&star_count));
        assert!(posts.contains(&posts));
        assert!(!star_count.contains(&posts));
        assert!(DbPath::root().contains(&posts));
    }
}
