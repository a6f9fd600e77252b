//! Dot-delimited field paths
//!
//! Paths are plain dot-joined key sequences (`profile.contacts.0.phone`).
//! There is no escaping: a key that itself contains a dot cannot be addressed.

use crate::value::Value;

/// Split a path into its segments. The empty path has no segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
	path.split('.').filter(move |_| !path.is_empty())
}

/// Append a segment to a base path without a leading dot for the root
///
/// # Examples
///
/// ```
/// use schemaform_core::join_path;
///
/// assert_eq!(join_path("", "user"), "user");
/// assert_eq!(join_path("user", "name"), "user.name");
/// assert_eq!(join_path("items", &0.to_string()), "items.0");
/// ```
pub fn join_path(base: &str, segment: &str) -> String {
	if base.is_empty() {
		segment.to_string()
	} else {
		format!("{}.{}", base, segment)
	}
}

/// Resolve a path against a value tree
///
/// Any missing segment, or an intermediate value that is not an object,
/// resolves to [`Value::Undefined`]. The empty path resolves to `root`.
///
/// # Examples
///
/// ```
/// use schemaform_core::{Value, get_by_path};
/// use serde_json::json;
///
/// let tree = Value::from(json!({"user": {"tags": ["a", "b"]}}));
/// assert_eq!(get_by_path(&tree, "user.tags.1"), Value::from("b"));
/// assert!(get_by_path(&tree, "user.tags.1.x").is_undefined());
/// assert!(get_by_path(&tree, "missing.deep").is_undefined());
/// ```
pub fn get_by_path(root: &Value, path: &str) -> Value {
	let mut current = root.clone();
	for segment in split_path(path) {
		if !current.is_object_like() {
			return Value::Undefined;
		}
		current = current.get(segment);
	}
	current
}
