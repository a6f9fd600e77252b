//! Scope contract visible to expressions
//!
//! Exactly six names resolve inside an expression body. Everything else is a
//! reference error at runtime; nothing from the embedding process leaks in.

use schemaform_core::Value;

/// Names bound inside every compiled expression
pub const SCOPE_NAMES: [&str; 6] = ["$self", "$values", "$form", "$record", "$index", "$deps"];

/// Values bound to the scope names
///
/// Every member is optional; an absent member resolves to `undefined`.
///
/// # Examples
///
/// ```
/// use schemaform_core::Value;
/// use schemaform_expr::Scope;
///
/// let scope = Scope::new()
/// 	.with_values(Value::object([("a", Value::from(1))]))
/// 	.with_index(2);
/// assert_eq!(scope.lookup("$index"), Some(Value::from(2)));
/// assert_eq!(scope.lookup("$record"), Some(Value::Undefined));
/// assert_eq!(scope.lookup("window"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scope {
	self_field: Option<Value>,
	values: Option<Value>,
	form: Option<Value>,
	record: Option<Value>,
	index: Option<Value>,
	deps: Option<Value>,
}

impl Scope {
	pub fn new() -> Self {
		Self::default()
	}

	/// Read the scope members out of an object, ignoring unknown members
	///
	/// Non-object inputs (including `null`) produce an empty scope.
	pub fn from_object(object: &Value) -> Self {
		if !object.is_object_like() {
			return Self::default();
		}
		let member = |name: &str| object.has_own_key(name).then(|| object.get(name));
		Self {
			self_field: member("$self"),
			values: member("$values"),
			form: member("$form"),
			record: member("$record"),
			index: member("$index"),
			deps: member("$deps"),
		}
	}

	/// Bind `$self`, the field that owns the expression
	pub fn with_self(mut self, field: impl Into<Value>) -> Self {
		self.self_field = Some(field.into());
		self
	}

	/// Bind `$values`, the whole form value tree
	pub fn with_values(mut self, values: impl Into<Value>) -> Self {
		self.values = Some(values.into());
		self
	}

	/// Bind `$form`
	pub fn with_form(mut self, form: impl Into<Value>) -> Self {
		self.form = Some(form.into());
		self
	}

	/// Bind `$record`, the current row inside an array field
	pub fn with_record(mut self, record: impl Into<Value>) -> Self {
		self.record = Some(record.into());
		self
	}

	/// Bind `$index`, the current row index inside an array field
	pub fn with_index(mut self, index: impl Into<Value>) -> Self {
		self.index = Some(index.into());
		self
	}

	/// Bind `$deps`, the watched values of a reaction in watch order
	pub fn with_deps(mut self, deps: impl IntoIterator<Item = Value>) -> Self {
		self.deps = Some(Value::array(deps));
		self
	}

	/// Resolve a scope name.
	///
	/// Returns `None` when `name` is not one of [`SCOPE_NAMES`], and
	/// `Some(Value::Undefined)` for a scope name that was not bound.
	pub fn lookup(&self, name: &str) -> Option<Value> {
		let slot = match name {
			"$self" => &self.self_field,
			"$values" => &self.values,
			"$form" => &self.form,
			"$record" => &self.record,
			"$index" => &self.index,
			"$deps" => &self.deps,
			_ => return None,
		};
		Some(slot.clone().unwrap_or_default())
	}
}
