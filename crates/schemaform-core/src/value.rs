//! Dynamic value tree
//!
//! Schemas, form values and expression results all flow through [`Value`], a
//! JSON superset that additionally distinguishes `undefined` from `null` and
//! carries dates, regular expressions and externally owned object handles.
//!
//! Arrays and objects are reference counted. Cloning a [`Value`] is cheap and
//! two clones of the same array or object share *identity*, which is what
//! [`Value::same_identity`] observes.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered object representation
pub type Map = IndexMap<String, Value>;

/// An externally owned object whose members are read lazily.
///
/// Field and form handles (`$self`, `$form`) are owned by the reactive runtime
/// that embeds the engines. They are exposed to expressions through this trait
/// instead of being snapshotted into a [`Map`]. Implementations may call back
/// into the expression compiler from [`ObjectHandle::get`].
///
/// # Examples
///
/// ```
/// use schemaform_core::{ObjectHandle, Value};
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct FieldHandle;
///
/// impl ObjectHandle for FieldHandle {
/// 	fn get(&self, key: &str) -> Value {
/// 		match key {
/// 			"value" => Value::from("alice"),
/// 			_ => Value::Undefined,
/// 		}
/// 	}
/// }
///
/// let handle = Value::handle(Arc::new(FieldHandle));
/// assert_eq!(handle.get("value"), Value::from("alice"));
/// assert!(handle.get("missing").is_undefined());
/// ```
pub trait ObjectHandle: fmt::Debug + Send + Sync {
	/// Read a member. Missing members are [`Value::Undefined`].
	fn get(&self, key: &str) -> Value;

	/// Enumerable member names, used by structural comparison and serialization
	fn keys(&self) -> Vec<String> {
		Vec::new()
	}
}

/// A regular expression value
///
/// Keeps the source text and flags it was created from; the compiled pattern is
/// used by the `test` expression method.
#[derive(Debug, Clone)]
pub struct RegexValue {
	source: String,
	flags: String,
	compiled: regex::Regex,
}

impl RegexValue {
	/// Build a regex value, validating both the pattern and the flags.
	///
	/// Supported flags are `d g i m s u y`; `i`, `m` and `s` change matching,
	/// the others are kept for display only.
	pub fn new(source: impl Into<String>, flags: impl Into<String>) -> CoreResult<Self> {
		let source = source.into();
		let flags = flags.into();

		if let Some(flag) = flags.chars().find(|c| !"dgimsuy".contains(*c)) {
			return Err(CoreError::InvalidRegexFlags { flags, flag });
		}

		let compiled = regex::RegexBuilder::new(&source)
			.case_insensitive(flags.contains('i'))
			.multi_line(flags.contains('m'))
			.dot_matches_new_line(flags.contains('s'))
			.build()
			.map_err(|e| CoreError::InvalidRegex {
				pattern: source.clone(),
				message: e.to_string(),
			})?;

		Ok(Self {
			source,
			flags,
			compiled,
		})
	}

	/// Pattern source text
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Flag characters
	pub fn flags(&self) -> &str {
		&self.flags
	}

	/// Whether the pattern matches anywhere in `haystack`
	pub fn is_match(&self, haystack: &str) -> bool {
		self.compiled.is_match(haystack)
	}
}

impl fmt::Display for RegexValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "/{}/{}", self.source, self.flags)
	}
}

/// Dynamic value
#[derive(Debug, Clone, Default)]
pub enum Value {
	/// Absent value; distinct from `Null`
	#[default]
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Array(Arc<Vec<Value>>),
	Object(Arc<Map>),
	Date(DateTime<Utc>),
	Regex(RegexValue),
	/// Lazily read external object
	Handle(Arc<dyn ObjectHandle>),
}

impl Value {
	/// Build an array value
	///
	/// # Examples
	///
	/// ```
	/// use schemaform_core::Value;
	///
	/// let list = Value::array([Value::from(1), Value::from(2)]);
	/// assert_eq!(list.get("length"), Value::from(2));
	/// ```
	pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
		Value::Array(Arc::new(items.into_iter().collect()))
	}

	/// Build an object value, keeping the given key order
	///
	/// # Examples
	///
	/// ```
	/// use schemaform_core::Value;
	///
	/// let user = Value::object([("name", Value::from("Alice"))]);
	/// assert_eq!(user.get("name"), Value::from("Alice"));
	/// ```
	pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
		Value::Object(Arc::new(
			entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
		))
	}

	/// Build a regex value
	pub fn regex(source: impl Into<String>, flags: impl Into<String>) -> CoreResult<Self> {
		RegexValue::new(source, flags).map(Value::Regex)
	}

	/// Wrap an external object handle
	pub fn handle(handle: Arc<dyn ObjectHandle>) -> Self {
		Value::Handle(handle)
	}

	pub fn is_undefined(&self) -> bool {
		matches!(self, Value::Undefined)
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// `null` or `undefined`
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::Undefined | Value::Null)
	}

	pub fn is_array(&self) -> bool {
		matches!(self, Value::Array(_))
	}

	/// A plain object: neither array, date, regex nor handle
	pub fn is_plain_object(&self) -> bool {
		matches!(self, Value::Object(_))
	}

	/// Anything the host language would report as `typeof x === "object"`,
	/// excluding `null`
	pub fn is_object_like(&self) -> bool {
		matches!(
			self,
			Value::Array(_) | Value::Object(_) | Value::Date(_) | Value::Regex(_) | Value::Handle(_)
		)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Value::Array(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<&Map> {
		match self {
			Value::Object(map) => Some(map),
			_ => None,
		}
	}

	/// Read a member the way property access does on a non-nullish value.
	///
	/// Arrays and strings expose `length` and numeric indices, regexes expose
	/// `source` and `flags`, handles delegate to [`ObjectHandle::get`].
	/// Anything else (including `null` and `undefined`) yields `Undefined`;
	/// callers that must reject nullish receivers check before calling.
	pub fn get(&self, key: &str) -> Value {
		match self {
			Value::Object(map) => map.get(key).cloned().unwrap_or_default(),
			Value::Array(items) => {
				if key == "length" {
					return Value::Number(items.len() as f64);
				}
				parse_index(key)
					.and_then(|idx| items.get(idx))
					.cloned()
					.unwrap_or_default()
			}
			Value::String(s) => {
				if key == "length" {
					return Value::Number(s.encode_utf16().count() as f64);
				}
				parse_index(key)
					.and_then(|idx| s.chars().nth(idx))
					.map(|c| Value::String(c.to_string()))
					.unwrap_or_default()
			}
			Value::Regex(re) => match key {
				"source" => Value::String(re.source().to_string()),
				"flags" => Value::String(re.flags().to_string()),
				_ => Value::Undefined,
			},
			Value::Handle(handle) => handle.get(key),
			_ => Value::Undefined,
		}
	}

	/// Own enumerable keys, in enumeration order.
	///
	/// Arrays enumerate their indices; dates and regexes have none.
	pub fn enumerable_keys(&self) -> Vec<String> {
		match self {
			Value::Object(map) => map.keys().cloned().collect(),
			Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
			Value::Handle(handle) => handle.keys(),
			_ => Vec::new(),
		}
	}

	/// Whether `key` is an own enumerable key
	pub fn has_own_key(&self, key: &str) -> bool {
		match self {
			Value::Object(map) => map.contains_key(key),
			Value::Array(items) => parse_index(key).is_some_and(|idx| idx < items.len()),
			Value::Handle(handle) => handle.keys().iter().any(|k| k == key),
			_ => false,
		}
	}

	/// Identity comparison (`===`).
	///
	/// Primitives compare by value (`NaN` is not identical to itself); arrays,
	/// objects and handles compare by reference. Dates and regexes are inline
	/// values without a shared reference and are never identical.
	pub fn same_identity(a: &Value, b: &Value) -> bool {
		match (a, b) {
			(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
			(Value::Bool(x), Value::Bool(y)) => x == y,
			(Value::Number(x), Value::Number(y)) => x == y,
			(Value::String(x), Value::String(y)) => x == y,
			(Value::Array(x), Value::Array(y)) => Arc::ptr_eq(x, y),
			(Value::Object(x), Value::Object(y)) => Arc::ptr_eq(x, y),
			(Value::Handle(x), Value::Handle(y)) => {
				std::ptr::addr_eq(Arc::as_ptr(x), Arc::as_ptr(y))
			}
			_ => false,
		}
	}

	/// Convert to JSON.
	///
	/// Follows JSON serialization rules of the host: `undefined` members are
	/// dropped from objects and become `null` inside arrays, non-finite numbers
	/// become `null`, dates become ISO-8601 strings.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Undefined | Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Number(n) => number_to_json(*n),
			Value::String(s) => serde_json::Value::String(s.clone()),
			Value::Array(items) => {
				serde_json::Value::Array(items.iter().map(Value::to_json).collect())
			}
			Value::Object(map) => serde_json::Value::Object(
				map.iter()
					.filter(|(_, v)| !v.is_undefined())
					.map(|(k, v)| (k.clone(), v.to_json()))
					.collect(),
			),
			Value::Date(dt) => {
				serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
			}
			Value::Regex(re) => serde_json::Value::String(re.to_string()),
			Value::Handle(handle) => serde_json::Value::Object(
				handle
					.keys()
					.into_iter()
					.filter_map(|k| {
						let v = handle.get(&k);
						(!v.is_undefined()).then(|| (k, v.to_json()))
					})
					.collect(),
			),
		}
	}
}

fn parse_index(key: &str) -> Option<usize> {
	if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
		return None;
	}
	key.parse::<usize>().ok()
}

fn number_to_json(n: f64) -> serde_json::Value {
	if !n.is_finite() {
		return serde_json::Value::Null;
	}
	if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
		return serde_json::Value::from(n as i64);
	}
	serde_json::Number::from_f64(n)
		.map(serde_json::Value::Number)
		.unwrap_or(serde_json::Value::Null)
}

/// Structural equality used by tests and `assert_eq!`.
///
/// Same variant and recursively equal contents; handles compare by reference.
/// This is *not* the diff engine's `deep_equal`, whose rules follow the host
/// semantics more closely.
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || a == b,
			(Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
			(Value::Date(a), Value::Date(b)) => a == b,
			(Value::Regex(a), Value::Regex(b)) => a.source == b.source && a.flags == b.flags,
			(Value::Handle(_), Value::Handle(_)) => Value::same_identity(self, other),
			_ => false,
		}
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
			serde_json::Value::Object(map) => {
				Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))))
			}
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Value::Number(n)
	}
}

macro_rules! impl_from_integer {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Value {
				fn from(n: $ty) -> Self {
					Value::Number(n as f64)
				}
			}
		)*
	};
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::Array(Arc::new(items))
	}
}

impl From<Map> for Value {
	fn from(map: Map) -> Self {
		Value::Object(Arc::new(map))
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(dt: DateTime<Utc>) -> Self {
		Value::Date(dt)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(Value::Null)
	}
}

impl Serialize for Value {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Value {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		serde_json::Value::deserialize(deserializer).map(Value::from)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[derive(Debug)]
	struct StaticHandle;

	impl ObjectHandle for StaticHandle {
		fn get(&self, key: &str) -> Value {
			match key {
				"value" => Value::from(42),
				_ => Value::Undefined,
			}
		}

		fn keys(&self) -> Vec<String> {
			vec!["value".to_string()]
		}
	}

	#[rstest]
	fn test_from_json_preserves_key_order() {
		// Arrange
		let json = json!({"zeta": 1, "alpha": 2, "mid": 3});

		// Act
		let value = Value::from(json);

		// Assert
		assert_eq!(value.enumerable_keys(), vec!["zeta", "alpha", "mid"]);
	}

	#[rstest]
	#[case(Value::from("abc"), "length", Value::from(3))]
	#[case(Value::from("abc"), "1", Value::from("b"))]
	#[case(Value::array([Value::from(1), Value::from(2)]), "length", Value::from(2))]
	#[case(Value::array([Value::from(1), Value::from(2)]), "1", Value::from(2))]
	#[case(Value::array([Value::from(1)]), "01", Value::Undefined)]
	#[case(Value::from(5), "anything", Value::Undefined)]
	#[case(Value::Null, "a", Value::Undefined)]
	fn test_get_member(#[case] receiver: Value, #[case] key: &str, #[case] expected: Value) {
		// Act
		let result = receiver.get(key);

		// Assert
		assert_eq!(result, expected);
	}

	#[rstest]
	fn test_handle_members_are_read_lazily() {
		// Arrange
		let handle = Value::handle(Arc::new(StaticHandle));

		// Act & Assert
		assert_eq!(handle.get("value"), Value::from(42));
		assert_eq!(handle.enumerable_keys(), vec!["value"]);
		assert_eq!(handle.to_json(), json!({"value": 42}));
	}

	#[rstest]
	fn test_clone_shares_identity() {
		// Arrange
		let original = Value::object([("a", Value::from(1))]);
		let copy = original.clone();
		let rebuilt = Value::object([("a", Value::from(1))]);

		// Assert
		assert!(Value::same_identity(&original, &copy));
		assert!(!Value::same_identity(&original, &rebuilt));
		assert_eq!(original, rebuilt);
	}

	#[rstest]
	fn test_nan_is_not_identical_to_itself() {
		let nan = Value::Number(f64::NAN);
		assert!(!Value::same_identity(&nan, &nan));
	}

	#[rstest]
	fn test_to_json_drops_undefined_members() {
		// Arrange
		let value = Value::object([
			("kept", Value::from(1)),
			("dropped", Value::Undefined),
			("list", Value::array([Value::Undefined, Value::Number(f64::NAN)])),
		]);

		// Act
		let json = value.to_json();

		// Assert
		assert_eq!(json, json!({"kept": 1, "list": [null, null]}));
	}

	#[rstest]
	fn test_regex_rejects_unknown_flags() {
		let result = Value::regex("a+", "x");
		assert!(matches!(
			result,
			Err(CoreError::InvalidRegexFlags { flag: 'x', .. })
		));
	}

	#[rstest]
	fn test_regex_rejects_invalid_pattern() {
		let result = Value::regex("(unclosed", "");
		assert!(matches!(result, Err(CoreError::InvalidRegex { .. })));
	}

	#[rstest]
	fn test_regex_case_insensitive_flag() {
		// Arrange
		let re = RegexValue::new("^abc$", "i").unwrap();

		// Assert
		assert!(re.is_match("ABC"));
		assert_eq!(re.to_string(), "/^abc$/i");
	}

	#[rstest]
	fn test_serialize_round_trip_through_serde_json() {
		// Arrange
		let value = Value::object([("n", Value::from(1.5)), ("s", Value::from("x"))]);

		// Act
		let text = serde_json::to_string(&value).unwrap();
		let back: Value = serde_json::from_str(&text).unwrap();

		// Assert
		assert_eq!(text, r#"{"n":1.5,"s":"x"}"#);
		assert_eq!(back, value);
	}
}
