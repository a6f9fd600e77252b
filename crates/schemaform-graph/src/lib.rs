//! Field dependency graph for schemaform reactions
//!
//! Reactions declare which paths they watch. Registering those watches as
//! edges lets the runtime reject cyclic wiring when a schema loads and decide
//! the order in which computed fields are recomputed.

pub mod error;
pub mod graph;

pub use error::{GraphError, GraphResult};
pub use graph::DependencyGraph;
