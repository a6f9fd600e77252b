//! `{{...}}` expression compiler for schemaform
//!
//! Schemas stay pure data: computed titles, visibility rules and derived values
//! are written as `{{...}}` strings and evaluated here against a fixed
//! [`Scope`] (`$self`, `$values`, `$form`, `$record`, `$index`, `$deps`).
//!
//! This crate provides:
//! - a nom-based parser for a small, side-effect-free expression grammar
//! - a compile-time allow-list for function and method calls
//! - an interpreter with host-compatible operator semantics
//! - a bounded FIFO cache of compiled expressions
//! - a process-wide default compiler behind free functions
//!
//! Authoring errors surface as [`ExpressionError`]. Runtime failures are
//! logged with `tracing` and evaluate to [`Value::Undefined`](schemaform_core::Value).
//!
//! ```
//! use schemaform_core::Value;
//! use schemaform_expr::{Scope, evaluate_expression};
//! use serde_json::json;
//!
//! let scope = Scope::new().with_values(Value::from(json!({ "age": 20 })));
//! let adult = evaluate_expression(&Value::from("{{$values.age >= 18}}"), Some(&scope)).unwrap();
//! assert_eq!(adult, Value::Bool(true));
//!
//! // Anything that is not an expression passes through
//! let plain = evaluate_expression(&Value::from("Age"), Some(&scope)).unwrap();
//! assert_eq!(plain, Value::from("Age"));
//! ```

mod ast;
mod builtins;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod error;
pub mod global;
mod interpreter;
mod parser;
pub mod scope;

pub use builtins::{GLOBAL_FUNCTIONS, METHODS, NAMESPACED_FUNCTIONS};
pub use cache::{CacheStatistics, ExpressionCache};
pub use compiler::{CompiledExpression, ExpressionCompiler, expression_body, is_expression};
pub use config::{CompilerConfig, DEFAULT_CACHE_CAPACITY};
pub use error::{EvalError, EvalResult, ExpressionError, ExpressionResult};
pub use global::{
	clear_expression_cache, compile_expression, evaluate_expression, global_compiler,
	init_global_compiler,
};
pub use scope::{SCOPE_NAMES, Scope};
