//! Process-wide default compiler
//!
//! Most callers never construct an [`ExpressionCompiler`] themselves; the free
//! functions here share one lazily created instance.

use crate::compiler::{CompiledExpression, ExpressionCompiler};
use crate::config::CompilerConfig;
use crate::error::ExpressionResult;
use crate::scope::Scope;
use schemaform_core::Value;
use std::sync::Arc;

static COMPILER: once_cell::sync::OnceCell<ExpressionCompiler> = once_cell::sync::OnceCell::new();

/// Configure the global compiler
///
/// Must run before the first use of [`global_compiler`]. Returns `false` if the
/// global compiler already exists, in which case `config` is ignored.
pub fn init_global_compiler(config: CompilerConfig) -> bool {
	let initialized = COMPILER.set(ExpressionCompiler::with_config(config)).is_ok();
	if !initialized {
		tracing::debug!("global expression compiler already initialized");
	}
	initialized
}

/// The shared compiler, created with the default configuration on first use
pub fn global_compiler() -> &'static ExpressionCompiler {
	COMPILER.get_or_init(ExpressionCompiler::new)
}

/// Compile with the global compiler
///
/// # Examples
///
/// ```
/// use schemaform_expr::{compile_expression, Scope};
/// use schemaform_core::Value;
///
/// let title = compile_expression("{{'Row ' + $index}}").unwrap();
/// assert_eq!(title.evaluate(Some(&Scope::new().with_index(3))), Value::from("Row 3"));
/// ```
pub fn compile_expression(source: &str) -> ExpressionResult<Arc<CompiledExpression>> {
	global_compiler().compile(source)
}

/// Evaluate with the global compiler, passing non-expressions through
pub fn evaluate_expression(value: &Value, scope: Option<&Scope>) -> ExpressionResult<Value> {
	global_compiler().evaluate(value, scope)
}

/// Empty the global compiler's cache
pub fn clear_expression_cache() {
	global_compiler().clear();
}
