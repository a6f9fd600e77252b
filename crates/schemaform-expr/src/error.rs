//! Expression errors
//!
//! Authoring errors (a missing `{{...}}` wrapper, a syntax error in the body,
//! a call outside the allow-list) are reported as [`ExpressionError`] at
//! compile time. Runtime failures are [`EvalError`]s; they are caught by
//! [`CompiledExpression::evaluate`](crate::CompiledExpression::evaluate) and
//! never reach callers of the non-`try` entry points.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpressionError {
	#[error("malformed expression `{input}`: expected a non-empty `{{{{...}}}}` wrapper")]
	Malformed { input: String },
	#[error("failed to compile expression `{expression}`: {message}")]
	Compile {
		expression: String,
		message: String,
		/// Byte offset of the error within the expression body
		offset: usize,
	},
	#[error("invalid compiler configuration: {0}")]
	Config(#[from] toml::de::Error),
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Runtime evaluation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
	#[error("TypeError: {0}")]
	Type(String),
	#[error("ReferenceError: {0} is not defined")]
	Reference(String),
}

impl EvalError {
	pub(crate) fn cannot_read(receiver: &schemaform_core::Value, property: &str) -> Self {
		let kind = if receiver.is_null() { "null" } else { "undefined" };
		EvalError::Type(format!(
			"Cannot read properties of {} (reading '{}')",
			kind, property
		))
	}

	pub(crate) fn not_a_function(name: &str) -> Self {
		EvalError::Type(format!("{} is not a function", name))
	}
}

pub type EvalResult<T> = Result<T, EvalError>;
