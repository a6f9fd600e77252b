//! Field dependency graph
//!
//! An edge `from -> to` records that `from` depends on `to`: a reaction on
//! field `from` watches the path `to`. Nodes exist only through edges; there is
//! no separate node list.
//!
//! # Examples
//!
//! ```rust
//! use schemaform_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//!
//! // total watches price and qty; price watches currency
//! graph.add_watches("total", ["price", "qty"]);
//! graph.add_edge("price", "currency");
//!
//! assert!(graph.detect_cycle().is_none());
//! assert_eq!(graph.get_dependents("price"), vec!["total"]);
//!
//! let order = graph.evaluation_order().unwrap();
//! let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
//! assert!(pos("currency") < pos("price"));
//! assert!(pos("price") < pos("total"));
//! ```

use crate::error::{GraphError, GraphResult};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
	/// Outgoing edges per source node, in insertion order
	adjacency: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record that `from` depends on `to`; adding an existing edge is a no-op
	pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
		self.adjacency
			.entry(from.into())
			.or_default()
			.insert(to.into());
	}

	/// Register every watched path of one reaction on `field`
	pub fn add_watches<I, S>(&mut self, field: &str, watches: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for watch in watches {
			self.add_edge(field, watch);
		}
	}

	/// Remove an edge if present
	pub fn remove_edge(&mut self, from: &str, to: &str) {
		if let Some(targets) = self.adjacency.get_mut(from) {
			targets.shift_remove(to);
			if targets.is_empty() {
				self.adjacency.shift_remove(from);
			}
		}
	}

	/// Remove every edge into or out of `node`
	pub fn remove_node(&mut self, node: &str) {
		self.adjacency.shift_remove(node);
		self.adjacency.retain(|_, targets| {
			targets.shift_remove(node);
			!targets.is_empty()
		});
	}

	pub fn has_edge(&self, from: &str, to: &str) -> bool {
		self.adjacency
			.get(from)
			.is_some_and(|targets| targets.contains(to))
	}

	/// Direct successors of `node`: what it depends on
	pub fn get_dependencies(&self, node: &str) -> Vec<String> {
		self.adjacency
			.get(node)
			.map(|targets| targets.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Direct predecessors of `node`: what depends on it
	pub fn get_dependents(&self, node: &str) -> Vec<String> {
		self.adjacency
			.iter()
			.filter(|(_, targets)| targets.contains(node))
			.map(|(source, _)| source.clone())
			.collect()
	}

	/// Every node that appears in an edge, in first-seen order
	pub fn get_nodes(&self) -> Vec<String> {
		let mut nodes: IndexSet<&str> = IndexSet::new();
		for (source, targets) in &self.adjacency {
			nodes.insert(source.as_str());
			nodes.extend(targets.iter().map(String::as_str));
		}
		nodes.into_iter().map(str::to_string).collect()
	}

	pub fn edge_count(&self) -> usize {
		self.adjacency.values().map(IndexSet::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.adjacency.is_empty()
	}

	/// Remove every edge
	pub fn clear(&mut self) {
		self.adjacency.clear();
	}

	/// Find one cycle, if any
	///
	/// Depth-first search from each source node in insertion order. The
	/// returned path starts at the first node revisited while still on the
	/// current search path and lists nodes in traversal order; a self-loop
	/// yields a single node.
	pub fn detect_cycle(&self) -> Option<Vec<String>> {
		let mut visited: HashSet<&str> = HashSet::new();
		let mut on_path: HashSet<&str> = HashSet::new();

		for start in self.adjacency.keys() {
			if visited.contains(start.as_str()) {
				continue;
			}

			// Explicit stack: (node, index of the next dependency to visit)
			let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
			visited.insert(start.as_str());
			on_path.insert(start.as_str());

			while let Some((node, next)) = stack.last_mut() {
				let Some(target) = self.adjacency.get(*node).and_then(|t| t.get_index(*next))
				else {
					on_path.remove(*node);
					stack.pop();
					continue;
				};
				*next += 1;

				let target = target.as_str();
				if on_path.contains(target) {
					let start_at = stack.iter().position(|(n, _)| *n == target).unwrap_or(0);
					let cycle: Vec<String> =
						stack[start_at..].iter().map(|(n, _)| n.to_string()).collect();
					tracing::debug!(cycle = ?cycle, "dependency cycle detected");
					return Some(cycle);
				}
				if visited.insert(target) {
					on_path.insert(target);
					stack.push((target, 0));
				}
			}
		}

		None
	}

	/// Order nodes so every node precedes the nodes it depends on
	///
	/// Kahn's algorithm. Fails with [`GraphError::CyclicDependency`] rather
	/// than returning a partial order when some nodes cannot be placed.
	pub fn topological_sort(&self) -> GraphResult<Vec<String>> {
		let nodes = self.get_nodes();

		// Calculate in-degree for each node
		let mut in_degree: IndexMap<&str, usize> =
			nodes.iter().map(|node| (node.as_str(), 0)).collect();
		for targets in self.adjacency.values() {
			for target in targets {
				if let Some(degree) = in_degree.get_mut(target.as_str()) {
					*degree += 1;
				}
			}
		}

		let mut queue: VecDeque<&str> = in_degree
			.iter()
			.filter(|(_, degree)| **degree == 0)
			.map(|(node, _)| *node)
			.collect();

		let mut sorted = Vec::with_capacity(nodes.len());
		while let Some(node) = queue.pop_front() {
			sorted.push(node.to_string());

			if let Some(targets) = self.adjacency.get(node) {
				for target in targets {
					if let Some(degree) = in_degree.get_mut(target.as_str()) {
						*degree -= 1;
						if *degree == 0 {
							queue.push_back(target.as_str());
						}
					}
				}
			}
		}

		if sorted.len() < nodes.len() {
			let unresolved: Vec<String> = in_degree
				.into_iter()
				.filter(|(_, degree)| *degree > 0)
				.map(|(node, _)| node.to_string())
				.collect();
			tracing::debug!(unresolved = ?unresolved, "topological sort found a cycle");
			return Err(GraphError::CyclicDependency { unresolved });
		}

		Ok(sorted)
	}

	/// Dependencies before dependents: the order in which to recompute fields
	pub fn evaluation_order(&self) -> GraphResult<Vec<String>> {
		let mut order = self.topological_sort()?;
		order.reverse();
		Ok(order)
	}

	/// Render as Graphviz DOT
	///
	/// # Example
	///
	/// ```rust
	/// use schemaform_graph::DependencyGraph;
	///
	/// let mut graph = DependencyGraph::new();
	/// graph.add_edge("total", "price");
	///
	/// let dot = graph.to_dot();
	/// assert!(dot.starts_with("digraph FieldDependencies {"));
	/// assert!(dot.contains("\"total\" -> \"price\";"));
	/// ```
	pub fn to_dot(&self) -> String {
		let mut output = String::from("digraph FieldDependencies {\n");
		output.push_str("  rankdir=LR;\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		for node in self.get_nodes() {
			output.push_str(&format!("  \"{}\";\n", escape_dot(&node)));
		}

		output.push('\n');

		for (from, targets) in &self.adjacency {
			for to in targets {
				output.push_str(&format!(
					"  \"{}\" -> \"{}\";\n",
					escape_dot(from),
					escape_dot(to)
				));
			}
		}

		output.push_str("}\n");
		output
	}
}

fn escape_dot(name: &str) -> String {
	name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
		let mut graph = DependencyGraph::new();
		for (from, to) in edges {
			graph.add_edge(*from, *to);
		}
		graph
	}

	#[rstest]
	fn test_add_edge_is_idempotent() {
		// Arrange
		let mut graph = graph(&[("a", "b")]);

		// Act
		graph.add_edge("a", "b");

		// Assert
		assert_eq!(graph.edge_count(), 1);
		assert_eq!(graph.get_dependencies("a"), vec!["b"]);
	}

	#[rstest]
	fn test_remove_missing_edge_or_node_is_noop() {
		// Arrange
		let mut graph = graph(&[("a", "b")]);
		let before = graph.clone();

		// Act
		graph.remove_edge("b", "a");
		graph.remove_edge("x", "y");
		graph.remove_node("z");

		// Assert
		assert_eq!(graph, before);
	}

	#[rstest]
	fn test_removing_last_edge_drops_nodes() {
		// Arrange
		let mut graph = graph(&[("a", "b")]);

		// Act
		graph.remove_edge("a", "b");

		// Assert
		assert!(graph.is_empty());
		assert!(graph.get_nodes().is_empty());
	}

	#[rstest]
	fn test_remove_node_drops_incoming_and_outgoing_edges() {
		// Arrange
		let mut graph = graph(&[("a", "b"), ("b", "c"), ("d", "b"), ("d", "c")]);

		// Act
		graph.remove_node("b");

		// Assert
		assert!(!graph.has_edge("a", "b"));
		assert!(!graph.has_edge("b", "c"));
		assert!(!graph.has_edge("d", "b"));
		assert!(graph.has_edge("d", "c"));
		assert_eq!(graph.get_nodes(), vec!["d", "c"]);
	}

	#[rstest]
	fn test_dependencies_and_dependents() {
		let graph = graph(&[("total", "price"), ("total", "qty"), ("tax", "price")]);
		assert_eq!(graph.get_dependencies("total"), vec!["price", "qty"]);
		assert_eq!(graph.get_dependents("price"), vec!["total", "tax"]);
		assert!(graph.get_dependencies("price").is_empty());
		assert!(graph.get_dependents("unknown").is_empty());
	}

	#[rstest]
	fn test_get_nodes_deduplicates() {
		let graph = graph(&[("a", "b"), ("b", "a"), ("c", "a")]);
		assert_eq!(graph.get_nodes(), vec!["a", "b", "c"]);
	}

	#[rstest]
	fn test_detect_cycle_returns_path_from_first_revisit() {
		// Arrange
		let graph = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);

		// Act
		let cycle = graph.detect_cycle();

		// Assert
		assert_eq!(cycle, Some(vec!["a".into(), "b".into(), "c".into()]));
	}

	#[rstest]
	fn test_detect_cycle_excludes_entry_path() {
		// Arrange
		let graph = graph(&[("start", "x"), ("x", "y"), ("y", "x")]);

		// Act
		let cycle = graph.detect_cycle();

		// Assert
		assert_eq!(cycle, Some(vec!["x".into(), "y".into()]));
	}

	#[rstest]
	fn test_self_loop_is_single_node_cycle() {
		let graph = graph(&[("a", "a")]);
		assert_eq!(graph.detect_cycle(), Some(vec!["a".to_string()]));
	}

	#[rstest]
	fn test_diamond_is_acyclic() {
		let graph = graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
		assert_eq!(graph.detect_cycle(), None);
	}

	#[rstest]
	fn test_topological_sort_of_chain() {
		// Arrange
		let graph = graph(&[("a", "b"), ("b", "c")]);

		// Act
		let order = graph.topological_sort().unwrap();

		// Assert
		assert_eq!(order, vec!["a", "b", "c"]);
		assert_eq!(graph.evaluation_order().unwrap(), vec!["c", "b", "a"]);
	}

	#[rstest]
	fn test_topological_sort_rejects_cycle() {
		// Arrange
		let graph = graph(&[("root", "a"), ("a", "b"), ("b", "a")]);

		// Act
		let err = graph.topological_sort().unwrap_err();

		// Assert
		assert_eq!(
			err,
			GraphError::CyclicDependency {
				unresolved: vec!["a".into(), "b".into()]
			}
		);
		assert_eq!(err.to_string(), "cyclic dependency detected among: a, b");
	}

	#[rstest]
	fn test_queries_do_not_mutate() {
		// Arrange
		let graph = graph(&[("a", "b"), ("b", "a")]);
		let before = graph.clone();

		// Act
		let _ = graph.detect_cycle();
		let _ = graph.topological_sort();

		// Assert
		assert_eq!(graph, before);
	}

	#[rstest]
	fn test_empty_graph() {
		let graph = DependencyGraph::new();
		assert_eq!(graph.detect_cycle(), None);
		assert_eq!(graph.topological_sort(), Ok(vec![]));
		assert_eq!(graph.edge_count(), 0);
	}

	#[rstest]
	fn test_serializes_as_adjacency_map() {
		let graph = graph(&[("a", "b"), ("a", "c")]);
		assert_eq!(
			serde_json::to_value(&graph).unwrap(),
			serde_json::json!({ "a": ["b", "c"] })
		);
	}
}
