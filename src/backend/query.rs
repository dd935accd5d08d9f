//! Child queries: ordering and windowing over a collection node

use serde_json::Value;
use std::cmp::Ordering;

use super::path::DbPath;

/// How children of a queried node are ordered
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum OrderBy {
    /// Lexicographic key order (push ids sort chronologically)
    #[default]
    Key,
    /// Order by the value of a named child, ties broken by key
    Child(String),
}

/// A child query rooted at a collection path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    path: DbPath,
    order_by: OrderBy,
    limit_to_last: Option<usize>,
}

impl Query {
    pub fn new(path: DbPath) -> Self {
        Self {
            path,
            order_by: OrderBy::Key,
            limit_to_last: None,
        }
    }

    pub fn order_by_child(mut self, child: impl Into<String>) -> Self {
        self.order_by = OrderBy::Child(child.into());
        self
    }

    /// Keep only the last `limit` children in query order
    pub fn limit_to_last(mut self, limit: usize) -> Self {
        self.limit_to_last = Some(limit);
        self
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// The children of `node` visible through this query, in query order
    pub fn window(&self, node: Option<&Value>) -> Vec<(String, Value)> {
        let Some(Value::Object(map)) = node else {
            return Vec::new();
        };

        let mut children: Vec<(String, Value)> =
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        match &self.order_by {
            OrderBy::Key => children.sort_by(|a, b| a.0.cmp(&b.0)),
            OrderBy::Child(name) => children.sort_by(|a, b| {
                compare_values(a.1.get(name), b.1.get(name)).then_with(|| a.0.cmp(&b.0))
            }),
        }

        if let Some(limit) = self.limit_to_last {
            let skip = children.len().saturating_sub(limit);
            children.drain(..skip);
        }

        children
    }
}

/// Sort rank: missing < numbers < strings < anything else
fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(_) => 3,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(window: &[(String, Value)]) -> Vec<&str> {
        window.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_window_by_key_with_limit() {
        let node = json!({"c": 1, "a": 2, "b": 3, "d": 4});
        let query = Query::new(DbPath::root().child("posts")).limit_to_last(2);
        assert_eq!(keys(&query.window(Some(&node))), ["c", "d"]);
    }

    #[test]
    fn test_window_by_child_star_count() {
        let node = json!({
            "p1": {"starCount": 5},
            "p2": {"starCount": 1},
            "p3": {},
            "p4": {"starCount": 1}
        });
        let query = Query::new(DbPath::root()).order_by_child("starCount");
        assert_eq!(keys(&query.window(Some(&node))), ["p3", "p2", "p4", "p1"]);
    }

    #[test]
    fn test_window_ranks_missing_then_numbers_then_strings() {
        let node = json!({
            "a": {"starCount": "many"},
            "b": {"starCount": 2.5},
            "c": {"starCount": true},
            "d": {"other": 1}
        });
        let query = Query::new(DbPath::root()).order_by_child("starCount");
        assert_eq!(keys(&query.window(Some(&node))), ["d", "b", "a", "c"]);
    }

    #[test]
    fn test_window_of_leaf_is_empty() {
        let query = Query::new(DbPath::root());
        assert!(query.window(Some(&json!(42))).is_empty());
        assert!(query.window(None).is_empty());
    }
}
