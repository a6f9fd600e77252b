//! Structural equality

use schemaform_core::Value;

/// Structural equality of two value trees
///
/// Identical values are equal. `null` and `undefined` equal nothing but
/// themselves. Dates compare by timestamp, regexes by their `/source/flags`
/// form. Any other pair of objects is equal when both expose the same set of
/// own keys with recursively equal members; arrays take this generic path
/// too, so `[1]` equals `{"0": 1}`. Primitives of equal value are identical.
///
/// Nested members are compared from an explicit work list, so tree depth is
/// not bounded by the call stack.
///
/// # Examples
///
/// ```
/// use schemaform_core::Value;
/// use schemaform_diff::deep_equal;
/// use serde_json::json;
///
/// let a = Value::from(json!({ "x": [1, { "y": 2 }], "z": null }));
/// let b = Value::from(json!({ "z": null, "x": [1, { "y": 2 }] }));
/// assert!(deep_equal(&a, &b));
/// assert!(!deep_equal(&Value::Null, &Value::Undefined));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> bool {
	// Explicit stack of member pairs still to compare
	let mut pending = vec![(a.clone(), b.clone())];

	while let Some((a, b)) = pending.pop() {
		if Value::same_identity(&a, &b) {
			continue;
		}
		if !a.is_object_like() || !b.is_object_like() {
			return false;
		}

		match (&a, &b) {
			(Value::Date(x), Value::Date(y)) => {
				if x.timestamp_millis() != y.timestamp_millis() {
					return false;
				}
			}
			(Value::Regex(x), Value::Regex(y)) => {
				if x.to_string() != y.to_string() {
					return false;
				}
			}
			_ => {
				let keys = a.enumerable_keys();
				if keys.len() != b.enumerable_keys().len() {
					return false;
				}
				for key in keys {
					if !b.has_own_key(&key) {
						return false;
					}
					pending.push((a.get(&key), b.get(&key)));
				}
			}
		}
	}

	true
}
