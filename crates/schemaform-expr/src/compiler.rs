//! Expression compilation and evaluation

use crate::ast::Expr;
use crate::builtins::check_calls;
use crate::cache::{CacheStatistics, ExpressionCache};
use crate::config::CompilerConfig;
use crate::error::{EvalResult, ExpressionError, ExpressionResult};
use crate::interpreter::Interpreter;
use crate::parser::parse_body;
use crate::scope::Scope;
use regex::Regex;
use schemaform_core::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

static EXPRESSION_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\{\{([\s\S]+)\}\}$").expect("Invalid expression regex"));

/// Extract the body of a `{{...}}` string
///
/// Returns `None` when the wrapper is missing or the body is blank.
///
/// # Examples
///
/// ```
/// use schemaform_expr::expression_body;
///
/// assert_eq!(expression_body("{{ $values.a }}"), Some(" $values.a "));
/// assert_eq!(expression_body("{{   }}"), None);
/// assert_eq!(expression_body("plain text"), None);
/// ```
pub fn expression_body(source: &str) -> Option<&str> {
	EXPRESSION_REGEX
		.captures(source)
		.and_then(|caps| caps.get(1))
		.map(|body| body.as_str())
		.filter(|body| !body.trim().is_empty())
}

/// Whether `value` is a `{{...}}` expression string
///
/// # Examples
///
/// ```
/// use schemaform_expr::is_expression;
/// use schemaform_core::Value;
///
/// assert!(is_expression(&Value::from("{{$self.value}}")));
/// assert!(!is_expression(&Value::from("{{}}")));
/// assert!(!is_expression(&Value::from(42)));
/// ```
pub fn is_expression(value: &Value) -> bool {
	value.as_str().and_then(expression_body).is_some()
}

/// A parsed, validated expression ready to evaluate against a [`Scope`]
#[derive(Debug)]
pub struct CompiledExpression {
	source: String,
	body: String,
	ast: Expr,
	warn_on_error: bool,
}

impl CompiledExpression {
	pub(crate) fn parse(source: &str, warn_on_error: bool) -> ExpressionResult<Self> {
		let body = expression_body(source).ok_or_else(|| ExpressionError::Malformed {
			input: source.to_string(),
		})?;

		let ast = parse_body(body).map_err(|err| ExpressionError::Compile {
			expression: source.to_string(),
			message: err.message,
			offset: err.offset,
		})?;
		check_calls(&ast).map_err(|message| ExpressionError::Compile {
			expression: source.to_string(),
			message,
			offset: 0,
		})?;

		Ok(Self {
			source: source.to_string(),
			body: body.to_string(),
			ast,
			warn_on_error,
		})
	}

	/// The full `{{...}}` string
	pub fn source(&self) -> &str {
		&self.source
	}

	/// The text between the braces
	pub fn body(&self) -> &str {
		&self.body
	}

	/// Evaluate, turning any runtime failure into `Value::Undefined`
	///
	/// `None` stands for a missing scope: every scope name reads as undefined.
	pub fn evaluate(&self, scope: Option<&Scope>) -> Value {
		match self.try_evaluate(scope) {
			Ok(value) => value,
			Err(error) => {
				if self.warn_on_error {
					tracing::warn!(
						expression = %self.source,
						error = %error,
						"expression evaluation failed"
					);
				}
				Value::Undefined
			}
		}
	}

	/// Evaluate, returning the runtime error instead of swallowing it
	pub fn try_evaluate(&self, scope: Option<&Scope>) -> EvalResult<Value> {
		Interpreter::new(scope).eval(&self.ast)
	}
}

/// Compiles `{{...}}` strings and caches the result
///
/// # Examples
///
/// ```
/// use schemaform_expr::{ExpressionCompiler, Scope};
/// use schemaform_core::Value;
/// use serde_json::json;
///
/// let compiler = ExpressionCompiler::new();
/// let compiled = compiler.compile("{{$values.a + $values.b}}").unwrap();
///
/// let scope = Scope::new().with_values(Value::from(json!({ "a": 1, "b": 2 })));
/// assert_eq!(compiled.evaluate(Some(&scope)), Value::from(3));
/// assert_eq!(compiled.evaluate(None), Value::Undefined);
/// ```
#[derive(Debug)]
pub struct ExpressionCompiler {
	cache: ExpressionCache,
	config: CompilerConfig,
	compilations: AtomicU64,
}

impl ExpressionCompiler {
	pub fn new() -> Self {
		Self::with_config(CompilerConfig::default())
	}

	pub fn with_config(config: CompilerConfig) -> Self {
		Self {
			cache: ExpressionCache::new(config.effective_capacity()),
			config,
			compilations: AtomicU64::new(0),
		}
	}

	pub fn config(&self) -> &CompilerConfig {
		&self.config
	}

	/// Compile `source`, or return the cached instance
	///
	/// Parsing runs without holding the cache lock. Two threads racing on the
	/// same new source may both parse it, but only the first insertion is kept
	/// and both receive it.
	pub fn compile(&self, source: &str) -> ExpressionResult<Arc<CompiledExpression>> {
		if let Some(compiled) = self.cache.get(source) {
			return Ok(compiled);
		}

		let compiled = CompiledExpression::parse(source, self.config.warn_on_runtime_error)?;
		self.compilations.fetch_add(1, Ordering::Relaxed);
		tracing::debug!(expression = %source, "compiled expression");

		Ok(self.cache.insert(Arc::new(compiled)))
	}

	/// Evaluate `value` if it is an expression, otherwise return it unchanged
	///
	/// Only compile errors are reported; runtime failures yield `Value::Undefined`.
	pub fn evaluate(&self, value: &Value, scope: Option<&Scope>) -> ExpressionResult<Value> {
		match value.as_str() {
			Some(source) if expression_body(source).is_some() => {
				Ok(self.compile(source)?.evaluate(scope))
			}
			_ => Ok(value.clone()),
		}
	}

	/// Evaluate every expression string inside a value tree
	///
	/// Arrays and objects are rebuilt with their expression members replaced
	/// by the evaluated result; a subtree without expressions is returned as
	/// the same shared instance.
	///
	/// # Examples
	///
	/// ```
	/// use schemaform_expr::{ExpressionCompiler, Scope};
	/// use schemaform_core::Value;
	/// use serde_json::json;
	///
	/// let compiler = ExpressionCompiler::new();
	/// let schema = Value::from(json!({
	///     "title": "{{'Item ' + ($index + 1)}}",
	///     "props": { "visible": "{{$index > 0}}", "kind": "text" },
	/// }));
	///
	/// let resolved = compiler
	///     .evaluate_deep(&schema, Some(&Scope::new().with_index(1)))
	///     .unwrap();
	/// assert_eq!(
	///     resolved,
	///     Value::from(json!({
	///         "title": "Item 2",
	///         "props": { "visible": true, "kind": "text" },
	///     }))
	/// );
	/// ```
	pub fn evaluate_deep(&self, value: &Value, scope: Option<&Scope>) -> ExpressionResult<Value> {
		match value {
			Value::String(_) => self.evaluate(value, scope),
			Value::Array(items) => {
				let mut changed = false;
				let mut resolved = Vec::with_capacity(items.len());
				for item in items.iter() {
					let next = self.evaluate_deep(item, scope)?;
					changed |= !Value::same_identity(item, &next);
					resolved.push(next);
				}
				Ok(if changed {
					Value::array(resolved)
				} else {
					value.clone()
				})
			}
			Value::Object(members) => {
				let mut changed = false;
				let mut resolved = Map::with_capacity(members.len());
				for (key, member) in members.iter() {
					let next = self.evaluate_deep(member, scope)?;
					changed |= !Value::same_identity(member, &next);
					resolved.insert(key.clone(), next);
				}
				Ok(if changed {
					Value::from(resolved)
				} else {
					value.clone()
				})
			}
			_ => Ok(value.clone()),
		}
	}

	/// Drop every cached expression
	pub fn clear(&self) {
		self.cache.clear();
	}

	/// Number of expression bodies parsed so far (cache misses that compiled)
	pub fn compile_count(&self) -> u64 {
		self.compilations.load(Ordering::Relaxed)
	}

	pub fn cached_len(&self) -> usize {
		self.cache.len()
	}

	pub fn is_cached(&self, source: &str) -> bool {
		self.cache.contains(source)
	}

	pub fn statistics(&self) -> CacheStatistics {
		CacheStatistics {
			compilations: self.compile_count(),
			..self.cache.statistics()
		}
	}
}

impl Default for ExpressionCompiler {
	fn default() -> Self {
		Self::new()
	}
}
