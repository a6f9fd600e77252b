//! Dependency graph errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
	/// Kahn's algorithm could not place these nodes
	#[error("cyclic dependency detected among: {}", unresolved.join(", "))]
	CyclicDependency { unresolved: Vec<String> },
}

pub type GraphResult<T> = Result<T, GraphError>;
