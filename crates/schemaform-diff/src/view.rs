//! Field-oriented diff view for UI consumers

use crate::diff::{DiffType, diff};
use crate::equality::deep_equal;
use schemaform_core::{Value, get_by_path};
use serde::Serialize;

/// One row of a diff view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffFieldView {
	pub path: String,
	#[serde(rename = "type")]
	pub kind: DiffType,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub old_value: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub new_value: Option<Value>,
	/// `true` for anything but `Unchanged`
	pub dirty: bool,
}

impl DiffFieldView {
	fn new(
		path: String,
		kind: DiffType,
		old_value: Option<Value>,
		new_value: Option<Value>,
	) -> Self {
		Self {
			path,
			kind,
			old_value,
			new_value,
			dirty: kind.is_dirty(),
		}
	}
}

/// Build a diff view, either for declared `paths` or for the whole tree
///
/// With `paths`, each path is resolved independently against both trees and
/// rows follow the given order. Without, rows are the entries of
/// [`diff`](crate::diff) in discovery order.
///
/// # Examples
///
/// ```
/// use schemaform_core::Value;
/// use schemaform_diff::{DiffType, get_diff_view};
/// use serde_json::json;
///
/// let old = Value::from(json!({ "name": "Ada", "email": "ada@example.com" }));
/// let new = Value::from(json!({ "name": "Ada L.", "email": "ada@example.com" }));
///
/// let view = get_diff_view(&old, &new, Some(&["email", "name", "phone"]));
/// let kinds: Vec<_> = view.iter().map(|row| (row.path.as_str(), row.kind)).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         ("email", DiffType::Unchanged),
///         ("name", DiffType::Changed),
///         ("phone", DiffType::Unchanged),
///     ]
/// );
/// assert!(view[1].dirty);
/// ```
pub fn get_diff_view(old: &Value, new: &Value, paths: Option<&[&str]>) -> Vec<DiffFieldView> {
	match paths {
		Some(paths) => paths
			.iter()
			.map(|path| classify(path, get_by_path(old, path), get_by_path(new, path)))
			.collect(),
		None => diff(old, new, "")
			.entries
			.into_iter()
			.map(|entry| {
				DiffFieldView::new(entry.path, entry.kind, entry.old_value, entry.new_value)
			})
			.collect(),
	}
}

fn classify(path: &str, old: Value, new: Value) -> DiffFieldView {
	let path = path.to_string();
	match (old.is_undefined(), new.is_undefined()) {
		(true, false) => DiffFieldView::new(path, DiffType::Added, None, Some(new)),
		(false, true) => DiffFieldView::new(path, DiffType::Removed, Some(old), None),
		_ => {
			let kind = if deep_equal(&old, &new) {
				DiffType::Unchanged
			} else {
				DiffType::Changed
			};
			DiffFieldView::new(path, kind, Some(old), Some(new))
		}
	}
}
