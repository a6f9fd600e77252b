//! End-to-end reaction pipeline
//!
//! A miniature reaction runtime: read each field's watch list from a schema,
//! validate the wiring with the dependency graph, recompute computed fields in
//! evaluation order with the expression compiler, then compare the result
//! against the submitted baseline with the diff engine.

use rstest::{fixture, rstest};
use schemaform::core::Map;
use schemaform::prelude::*;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;

/// Computed field declaration: `(field, watched paths, value expression)`
type Reaction = (String, Vec<String>, Value);

fn reactions_of(schema: &Value) -> Vec<Reaction> {
	let properties = schema.get("properties");
	properties
		.enumerable_keys()
		.into_iter()
		.filter_map(|field| {
			let reaction = properties.get(&field).get("x-reactions");
			if reaction.is_undefined() {
				return None;
			}
			let watches = reaction
				.get("dependencies")
				.as_array()
				.unwrap_or(&[])
				.iter()
				.filter_map(|w| w.as_str().map(str::to_string))
				.collect();
			Some((field, watches, reaction.get("value")))
		})
		.collect()
}

fn wire(reactions: &[Reaction]) -> DependencyGraph {
	let mut graph = DependencyGraph::new();
	for (field, watches, _) in reactions {
		graph.add_watches(field, watches.iter().cloned());
	}
	graph
}

fn recompute(reactions: &[Reaction], graph: &DependencyGraph, values: &Value) -> Value {
	let order = graph.evaluation_order().unwrap();
	let mut current = values.clone();
	for node in order {
		let Some((field, watches, expression)) = reactions.iter().find(|(f, _, _)| *f == node)
		else {
			continue;
		};
		let deps: Vec<Value> = watches.iter().map(|w| get_by_path(&current, w)).collect();
		let scope = Scope::new().with_values(current.clone()).with_deps(deps);
		let computed = evaluate_expression(expression, Some(&scope)).unwrap();

		let mut map: Map = current.as_object().cloned().unwrap_or_default();
		map.insert(field.clone(), computed);
		current = Value::from(map);
	}
	current
}

#[fixture]
fn invoice_schema() -> Value {
	Value::from(json!({
		"type": "object",
		"properties": {
			"total": {
				"type": "number",
				"x-reactions": {
					"dependencies": ["subtotal", "tax"],
					"value": "{{$deps[0] + $deps[1]}}"
				}
			},
			"price": { "type": "number" },
			"qty": { "type": "number" },
			"subtotal": {
				"type": "number",
				"x-reactions": {
					"dependencies": ["price", "qty"],
					"value": "{{$values.price * $values.qty}}"
				}
			},
			"tax": {
				"type": "number",
				"x-reactions": {
					"dependencies": ["subtotal"],
					"value": "{{Math.round($deps[0] * 0.25)}}"
				}
			},
			"label": {
				"type": "string",
				"x-reactions": {
					"dependencies": ["total"],
					"value": "{{$deps[0] > 100 ? 'large order' : 'order'}}"
				}
			}
		}
	}))
}

#[rstest]
#[serial]
fn test_computed_fields_follow_dependency_order(invoice_schema: Value) {
	// Arrange
	let reactions = reactions_of(&invoice_schema);
	let graph = wire(&reactions);
	let baseline = Value::from(json!({
		"price": 20, "qty": 4, "subtotal": 80, "tax": 20, "total": 100, "label": "order"
	}));
	let edited = Value::from(json!({
		"price": 20, "qty": 5, "subtotal": 80, "tax": 20, "total": 100, "label": "order"
	}));

	// Act
	assert_eq!(graph.detect_cycle(), None);
	let recomputed = recompute(&reactions, &graph, &edited);
	let result = diff(&baseline, &recomputed, "");

	// Assert
	assert_eq!(get_by_path(&recomputed, "subtotal"), Value::from(100));
	assert_eq!(get_by_path(&recomputed, "tax"), Value::from(25));
	assert_eq!(get_by_path(&recomputed, "total"), Value::from(125));
	assert_eq!(get_by_path(&recomputed, "label"), Value::from("large order"));
	let mut dirty: Vec<&str> = result.changed.iter().map(|e| e.path.as_str()).collect();
	dirty.sort_unstable();
	assert_eq!(dirty, vec!["label", "qty", "subtotal", "tax", "total"]);
	assert!(!result.is_dirty("price"));
}

#[rstest]
#[serial]
fn test_cyclic_wiring_is_rejected_before_evaluation(invoice_schema: Value) {
	// Arrange
	let reactions = reactions_of(&invoice_schema);
	let mut graph = wire(&reactions);
	graph.add_edge("subtotal", "total");

	// Act
	let cycle = graph.detect_cycle();
	let order = graph.evaluation_order();

	// Assert
	let cycle = cycle.unwrap();
	assert!(cycle.contains(&"subtotal".to_string()));
	assert!(cycle.contains(&"total".to_string()));
	assert!(matches!(order, Err(GraphError::CyclicDependency { .. })));
}

#[rstest]
#[serial]
fn test_schema_evaluation_resolves_titles_per_row() {
	// Arrange
	let column = Value::from(json!({
		"title": "{{'Line ' + ($index + 1) + ': ' + $record.sku}}",
		"x-visible": "{{$record.qty > 0}}",
		"x-component": "Input"
	}));
	let rows = [json!({"sku": "A-1", "qty": 2}), json!({"sku": "B-7", "qty": 0})];
	let compiler = ExpressionCompiler::new();

	// Act
	let resolved: Vec<Value> = rows
		.iter()
		.enumerate()
		.map(|(index, row)| {
			let scope = Scope::new()
				.with_record(Value::from(row.clone()))
				.with_index(index);
			compiler.evaluate_deep(&column, Some(&scope)).unwrap()
		})
		.collect();

	// Assert
	assert_eq!(resolved[0].get("title"), Value::from("Line 1: A-1"));
	assert_eq!(resolved[0].get("x-visible"), Value::Bool(true));
	assert_eq!(resolved[1].get("title"), Value::from("Line 2: B-7"));
	assert_eq!(resolved[1].get("x-visible"), Value::Bool(false));
	assert_eq!(compiler.compile_count(), 2);
}

/// Form handle exposing the live values and a computed summary
#[derive(Debug)]
struct FormHandle {
	values: Value,
}

impl ObjectHandle for FormHandle {
	fn get(&self, key: &str) -> Value {
		match key {
			"values" => self.values.clone(),
			"summary" => {
				let scope = Scope::new().with_values(self.values.clone());
				let summary = Value::from("{{Object.keys($values).length + ' fields'}}");
				evaluate_expression(&summary, Some(&scope)).unwrap_or_default()
			}
			_ => Value::Undefined,
		}
	}

	fn keys(&self) -> Vec<String> {
		vec!["values".to_string(), "summary".to_string()]
	}
}

#[rstest]
#[serial]
fn test_form_handle_is_read_through_scope() {
	// Arrange
	let form = FormHandle {
		values: Value::from(json!({"name": "Ada", "email": ""})),
	};
	let scope = Scope::new()
		.with_form(Value::handle(Arc::new(form)))
		.with_self(Value::from(json!({"path": "email"})));

	// Act
	let required = evaluate_expression(
		&Value::from("{{$form.values.name !== '' && !$form.values[$self.path]}}"),
		Some(&scope),
	);
	let summary = evaluate_expression(&Value::from("{{$form.summary}}"), Some(&scope));

	// Assert
	assert_eq!(required.unwrap(), Value::Bool(true));
	assert_eq!(summary.unwrap(), Value::from("2 fields"));
}

#[rstest]
#[serial]
fn test_review_view_for_declared_fields() {
	// Arrange
	let submitted = Value::from(json!({"profile": {"name": "Ada", "tags": ["a"]}}));
	let current = Value::from(json!({"profile": {"name": "Ada", "tags": ["a", "b"], "bio": "hi"}}));
	let paths = ["profile.name", "profile.tags", "profile.bio"];

	// Act
	let view = get_diff_view(&submitted, &current, Some(&paths));

	// Assert
	let rows: Vec<(&str, DiffType, bool)> = view
		.iter()
		.map(|row| (row.path.as_str(), row.kind, row.dirty))
		.collect();
	assert_eq!(
		rows,
		vec![
			("profile.name", DiffType::Unchanged, false),
			("profile.tags", DiffType::Changed, true),
			("profile.bio", DiffType::Added, true),
		]
	);
}
