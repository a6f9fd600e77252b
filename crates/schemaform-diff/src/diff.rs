//! Path-level diff of two value trees

use crate::equality::deep_equal;
use schemaform_core::{Value, join_path};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffType {
	Added,
	Removed,
	Changed,
	Unchanged,
}

impl DiffType {
	pub fn as_str(&self) -> &'static str {
		match self {
			DiffType::Added => "added",
			DiffType::Removed => "removed",
			DiffType::Changed => "changed",
			DiffType::Unchanged => "unchanged",
		}
	}

	/// Anything but `Unchanged`
	pub fn is_dirty(&self) -> bool {
		*self != DiffType::Unchanged
	}
}

impl std::fmt::Display for DiffType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One compared path
///
/// `Removed` carries only the old value, `Added` only the new one; the
/// other kinds carry both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
	pub path: String,
	#[serde(rename = "type")]
	pub kind: DiffType,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub old_value: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub new_value: Option<Value>,
}

impl DiffEntry {
	pub fn added(path: impl Into<String>, new_value: Value) -> Self {
		Self {
			path: path.into(),
			kind: DiffType::Added,
			old_value: None,
			new_value: Some(new_value),
		}
	}

	pub fn removed(path: impl Into<String>, old_value: Value) -> Self {
		Self {
			path: path.into(),
			kind: DiffType::Removed,
			old_value: Some(old_value),
			new_value: None,
		}
	}

	pub fn changed(path: impl Into<String>, old_value: Value, new_value: Value) -> Self {
		Self {
			path: path.into(),
			kind: DiffType::Changed,
			old_value: Some(old_value),
			new_value: Some(new_value),
		}
	}

	pub fn unchanged(path: impl Into<String>, old_value: Value, new_value: Value) -> Self {
		Self {
			path: path.into(),
			kind: DiffType::Unchanged,
			old_value: Some(old_value),
			new_value: Some(new_value),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
	/// Every compared path, in discovery order
	pub entries: Vec<DiffEntry>,
	pub added: Vec<DiffEntry>,
	pub removed: Vec<DiffEntry>,
	pub changed: Vec<DiffEntry>,
	pub has_diff: bool,
}

impl DiffResult {
	fn from_entries(entries: Vec<DiffEntry>) -> Self {
		let of_kind = |kind: DiffType| -> Vec<DiffEntry> {
			entries.iter().filter(|e| e.kind == kind).cloned().collect()
		};
		let added = of_kind(DiffType::Added);
		let removed = of_kind(DiffType::Removed);
		let changed = of_kind(DiffType::Changed);
		let has_diff = !(added.is_empty() && removed.is_empty() && changed.is_empty());

		Self {
			entries,
			added,
			removed,
			changed,
			has_diff,
		}
	}

	pub fn entry(&self, path: &str) -> Option<&DiffEntry> {
		self.entries.iter().find(|e| e.path == path)
	}

	/// Whether `path` was added, removed or changed
	pub fn is_dirty(&self, path: &str) -> bool {
		self.entry(path).is_some_and(|e| e.kind.is_dirty())
	}
}

/// Diff two value trees
///
/// Plain objects are compared key by key (keys of `old` first, then keys
/// only in `new`), arrays index by index. Every other pair, including an
/// object against a non-object, is a leaf compared with
/// [`deep_equal`](crate::deep_equal). Paths are dot-joined onto `base_path`.
/// The walk keeps its own work list, so tree depth is not bounded by the
/// call stack.
///
/// # Examples
///
/// ```
/// use schemaform_core::Value;
/// use schemaform_diff::{DiffType, diff};
/// use serde_json::json;
///
/// let old = Value::from(json!({ "user": { "name": "Alice", "age": 30 } }));
/// let new = Value::from(json!({ "user": { "name": "Alice", "age": 31 } }));
///
/// let result = diff(&old, &new, "");
/// assert!(result.has_diff);
/// assert_eq!(result.changed.len(), 1);
/// assert_eq!(result.changed[0].path, "user.age");
/// assert_eq!(result.entry("user.name").unwrap().kind, DiffType::Unchanged);
/// ```
pub fn diff(old: &Value, new: &Value, base_path: &str) -> DiffResult {
	let result = DiffResult::from_entries(collect_diff(old, new, base_path));
	tracing::trace!(
		base_path,
		entries = result.entries.len(),
		has_diff = result.has_diff,
		"computed diff"
	);
	result
}

enum Pending {
	Compare(Value, Value, String),
	Emit(DiffEntry),
}

fn collect_diff(old: &Value, new: &Value, base_path: &str) -> Vec<DiffEntry> {
	let mut entries = Vec::new();
	// Explicit stack; children are pushed in reverse to keep discovery order
	let mut stack = vec![Pending::Compare(old.clone(), new.clone(), base_path.to_string())];

	while let Some(next) = stack.pop() {
		let (old, new, path) = match next {
			Pending::Emit(entry) => {
				entries.push(entry);
				continue;
			}
			Pending::Compare(old, new, path) => (old, new, path),
		};

		let mut children = Vec::new();
		match (&old, &new) {
			(Value::Object(old_map), Value::Object(new_map)) => {
				let keys = old_map
					.keys()
					.chain(new_map.keys().filter(|key| !old_map.contains_key(*key)));
				for key in keys {
					let child = join_path(&path, key);
					children.extend(pair_child(old_map.get(key), new_map.get(key), child));
				}
			}
			(Value::Array(old_items), Value::Array(new_items)) => {
				for idx in 0..old_items.len().max(new_items.len()) {
					let child = join_path(&path, &idx.to_string());
					children.extend(pair_child(old_items.get(idx), new_items.get(idx), child));
				}
			}
			_ if deep_equal(&old, &new) => {
				entries.push(DiffEntry::unchanged(path, old.clone(), new.clone()))
			}
			_ => entries.push(DiffEntry::changed(path, old.clone(), new.clone())),
		}
		stack.extend(children.into_iter().rev());
	}

	entries
}

fn pair_child(old: Option<&Value>, new: Option<&Value>, path: String) -> Option<Pending> {
	match (old, new) {
		(Some(o), Some(n)) => Some(Pending::Compare(o.clone(), n.clone(), path)),
		(Some(o), None) => Some(Pending::Emit(DiffEntry::removed(path, o.clone()))),
		(None, Some(n)) => Some(Pending::Emit(DiffEntry::added(path, n.clone()))),
		(None, None) => None,
	}
}
