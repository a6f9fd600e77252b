//! # schemaform
//!
//! The reactive computation substrate behind schema-driven forms. Forms are
//! declared as JSON-serializable trees; this crate supplies the three engines
//! that make such trees dynamic without embedding code in them:
//!
//! - **expressions** compile `{{...}}` strings into cached, sandboxed
//!   evaluators over a fixed scope (`$self`, `$values`, `$form`, `$record`,
//!   `$index`, `$deps`)
//! - **graph** validates reaction wiring (cycle detection) and orders
//!   recomputation (topological sort)
//! - **diff** compares a baseline value tree with the live one for review and
//!   audit views
//!
//! The engines do not call each other. A reaction runtime composes them.
//!
//! ## Feature Flags
//!
//! - `expr` - expression compiler ([`expr`])
//! - `graph` - dependency graph ([`graph`])
//! - `diff` - diff engine ([`diff`])
//! - `full` (default) - all of the above
//!
//! ## Example
//!
//! ```
//! use schemaform::prelude::*;
//! use serde_json::json;
//!
//! // Wiring: total watches price and qty
//! let mut graph = DependencyGraph::new();
//! graph.add_watches("total", ["price", "qty"]);
//! assert!(graph.detect_cycle().is_none());
//!
//! // Computation
//! let values = Value::from(json!({ "price": 2.5, "qty": 4 }));
//! let scope = Scope::new().with_values(values.clone());
//! let total = Value::from("{{$values.price * $values.qty}}");
//! let total = evaluate_expression(&total, Some(&scope)).unwrap();
//! assert_eq!(total, Value::from(10));
//!
//! // Review
//! let edited = Value::from(json!({ "price": 3, "qty": 4 }));
//! assert!(diff(&values, &edited, "").is_dirty("price"));
//! ```

pub use schemaform_core as core;
#[cfg(feature = "diff")]
pub use schemaform_diff as diff;
#[cfg(feature = "expr")]
pub use schemaform_expr as expr;
#[cfg(feature = "graph")]
pub use schemaform_graph as graph;

pub use schemaform_core::{ObjectHandle, Value, get_by_path, join_path};

#[cfg(feature = "expr")]
pub use schemaform_expr::{
	CompiledExpression, CompilerConfig, EvalError, ExpressionCompiler, ExpressionError, Scope,
	clear_expression_cache, compile_expression, evaluate_expression, is_expression,
};

#[cfg(feature = "graph")]
pub use schemaform_graph::{DependencyGraph, GraphError};

#[cfg(feature = "diff")]
pub use schemaform_diff::{
	DiffEntry, DiffFieldView, DiffResult, DiffType, deep_equal, get_diff_view,
};

/// Common imports
pub mod prelude {
	pub use crate::{ObjectHandle, Value, get_by_path, join_path};

	#[cfg(feature = "expr")]
	pub use crate::{
		CompiledExpression, ExpressionCompiler, ExpressionError, Scope, compile_expression,
		evaluate_expression, is_expression,
	};

	#[cfg(feature = "graph")]
	pub use crate::{DependencyGraph, GraphError};

	#[cfg(feature = "diff")]
	pub use crate::{DiffResult, DiffType, deep_equal, get_diff_view};
	#[cfg(feature = "diff")]
	pub use schemaform_diff::diff;
}
