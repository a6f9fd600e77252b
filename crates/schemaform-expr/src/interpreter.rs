//! Tree-walking evaluator for parsed expression bodies

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::builtins::{call_function, call_method, namespaced_function};
use crate::error::{EvalError, EvalResult};
use crate::scope::{SCOPE_NAMES, Scope};
use schemaform_core::{
	Value, format_number, is_truthy, loose_equals, strict_equals, to_display_string, to_number,
	type_of,
};

pub(crate) struct Interpreter<'s> {
	scope: Option<&'s Scope>,
}

impl<'s> Interpreter<'s> {
	pub(crate) fn new(scope: Option<&'s Scope>) -> Self {
		Self { scope }
	}

	pub(crate) fn eval(&self, expr: &Expr) -> EvalResult<Value> {
		match expr {
			Expr::Literal(value) => Ok(value.clone()),
			Expr::Identifier(name) => self.resolve(name),
			Expr::Array(items) => {
				let values = items
					.iter()
					.map(|item| self.eval(item))
					.collect::<EvalResult<Vec<_>>>()?;
				Ok(Value::array(values))
			}
			Expr::Object(entries) => {
				let members = entries
					.iter()
					.map(|(key, value)| Ok((key.clone(), self.eval(value)?)))
					.collect::<EvalResult<Vec<_>>>()?;
				Ok(Value::object(members))
			}
			Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
				Ok(self.eval_chain(expr)?.unwrap_or_default())
			}
			Expr::Unary { op, operand } => self.eval_unary(*op, operand),
			Expr::Binary { op, left, right } => {
				let left = self.eval(left)?;
				let right = self.eval(right)?;
				Ok(binary(*op, &left, &right))
			}
			Expr::Logical { op, left, right } => {
				let left = self.eval(left)?;
				let short_circuit = match op {
					LogicalOp::And => !is_truthy(&left),
					LogicalOp::Or => is_truthy(&left),
					LogicalOp::Nullish => !left.is_nullish(),
				};
				if short_circuit {
					Ok(left)
				} else {
					self.eval(right)
				}
			}
			Expr::Conditional {
				test,
				consequent,
				alternate,
			} => {
				if is_truthy(&self.eval(test)?) {
					self.eval(consequent)
				} else {
					self.eval(alternate)
				}
			}
		}
	}

	/// Evaluate a member/index/call chain
	///
	/// `None` means an optional link hit a nullish receiver and the rest of
	/// the chain was skipped.
	fn eval_chain(&self, expr: &Expr) -> EvalResult<Option<Value>> {
		match expr {
			Expr::Member {
				object,
				property,
				optional,
			} => {
				let Some(target) = self.eval_chain(object)? else {
					return Ok(None);
				};
				if target.is_nullish() {
					if *optional {
						return Ok(None);
					}
					return Err(EvalError::cannot_read(&target, property));
				}
				Ok(Some(target.get(property)))
			}
			Expr::Index {
				object,
				index,
				optional,
			} => {
				let Some(target) = self.eval_chain(object)? else {
					return Ok(None);
				};
				if target.is_nullish() && *optional {
					return Ok(None);
				}
				let key = property_key(&self.eval(index)?);
				if target.is_nullish() {
					return Err(EvalError::cannot_read(&target, &key));
				}
				Ok(Some(target.get(&key)))
			}
			Expr::Call { callee, args } => self.eval_call(callee, args),
			other => self.eval(other).map(Some),
		}
	}

	fn eval_call(&self, callee: &Expr, args: &[Expr]) -> EvalResult<Option<Value>> {
		match callee {
			Expr::Identifier(name) => {
				let args = self.eval_args(args)?;
				call_function(name, &args).map(Some)
			}
			Expr::Member {
				object,
				property,
				optional,
			} => {
				if let Expr::Identifier(namespace) = object.as_ref() {
					if let Some(qualified) = namespaced_function(namespace, property) {
						let args = self.eval_args(args)?;
						return call_function(qualified, &args).map(Some);
					}
				}

				let Some(receiver) = self.eval_chain(object)? else {
					return Ok(None);
				};
				if receiver.is_nullish() {
					if *optional {
						return Ok(None);
					}
					return Err(EvalError::cannot_read(&receiver, property));
				}
				let args = self.eval_args(args)?;
				call_method(&receiver, property, &args)
					.map(Some)
					.map_err(|err| {
						if err == EvalError::not_a_function(property) {
							EvalError::not_a_function(&callee.describe())
						} else {
							err
						}
					})
			}
			other => Err(EvalError::not_a_function(&other.describe())),
		}
	}

	fn eval_args(&self, args: &[Expr]) -> EvalResult<Vec<Value>> {
		args.iter().map(|arg| self.eval(arg)).collect()
	}

	fn eval_unary(&self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
		// `typeof` of an undeclared name does not throw
		if let (UnaryOp::TypeOf, Expr::Identifier(name)) = (op, operand) {
			if !SCOPE_NAMES.contains(&name.as_str()) {
				return Ok(Value::from("undefined"));
			}
		}

		let value = self.eval(operand)?;
		Ok(match op {
			UnaryOp::Not => Value::Bool(!is_truthy(&value)),
			UnaryOp::Neg => Value::Number(-to_number(&value)),
			UnaryOp::Plus => Value::Number(to_number(&value)),
			UnaryOp::TypeOf => Value::from(type_of(&value)),
		})
	}

	fn resolve(&self, name: &str) -> EvalResult<Value> {
		if !SCOPE_NAMES.contains(&name) {
			return Err(EvalError::Reference(name.to_string()));
		}
		Ok(self
			.scope
			.and_then(|scope| scope.lookup(name))
			.unwrap_or_default())
	}
}

fn property_key(key: &Value) -> String {
	match key {
		Value::Number(n) => format_number(*n),
		other => to_display_string(other),
	}
}

/// Compound values take part in `+` and comparisons through their string form
fn to_primitive(value: &Value) -> Value {
	if value.is_object_like() {
		Value::String(to_display_string(value))
	} else {
		value.clone()
	}
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
	match op {
		BinaryOp::Add => {
			let (l, r) = (to_primitive(left), to_primitive(right));
			if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
				Value::String(to_display_string(&l) + &to_display_string(&r))
			} else {
				Value::Number(to_number(&l) + to_number(&r))
			}
		}
		BinaryOp::Sub => Value::Number(to_number(left) - to_number(right)),
		BinaryOp::Mul => Value::Number(to_number(left) * to_number(right)),
		BinaryOp::Div => Value::Number(to_number(left) / to_number(right)),
		BinaryOp::Rem => Value::Number(to_number(left) % to_number(right)),
		BinaryOp::Lt => Value::Bool(compare(left, right, |o| o.is_lt())),
		BinaryOp::Le => Value::Bool(compare(left, right, |o| o.is_le())),
		BinaryOp::Gt => Value::Bool(compare(left, right, |o| o.is_gt())),
		BinaryOp::Ge => Value::Bool(compare(left, right, |o| o.is_ge())),
		BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
		BinaryOp::Ne => Value::Bool(!loose_equals(left, right)),
		BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
		BinaryOp::StrictNe => Value::Bool(!strict_equals(left, right)),
	}
}

/// Relational comparison; any comparison involving `NaN` is false
fn compare(left: &Value, right: &Value, accept: fn(std::cmp::Ordering) -> bool) -> bool {
	match (to_primitive(left), to_primitive(right)) {
		(Value::String(l), Value::String(r)) => accept(l.cmp(&r)),
		(l, r) => to_number(&l)
			.partial_cmp(&to_number(&r))
			.is_some_and(accept),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::parse_body;
	use rstest::rstest;
	use schemaform_core::ObjectHandle;
	use serde_json::json;
	use std::sync::Arc;

	fn eval(source: &str, scope: Option<&Scope>) -> EvalResult<Value> {
		let expr = parse_body(source).unwrap();
		Interpreter::new(scope).eval(&expr)
	}

	fn values_scope() -> Scope {
		Scope::new().with_values(Value::from(json!({
			"a": 1,
			"b": 2,
			"name": "Ada",
			"tags": ["x", "y"],
			"address": { "city": "Oslo" },
			"nothing": null,
		})))
	}

	#[rstest]
	#[case("$values.a + $values.b", json!(3))]
	#[case("$values.name + '!'", json!("Ada!"))]
	#[case("$values.a + '1'", json!("11"))]
	#[case("$values.tags + ''", json!("x,y"))]
	#[case("10 % 4 * 2", json!(4))]
	#[case("-$values.a", json!(-1))]
	#[case("+'3' + 1", json!(4))]
	#[case("$values.a < $values.b", json!(true))]
	#[case("'b' > 'a'", json!(true))]
	#[case("'10' < '9'", json!(true))]
	#[case("'10' < 9", json!(false))]
	#[case("1 == '1'", json!(true))]
	#[case("1 === '1'", json!(false))]
	#[case("null ?? 'fallback'", json!("fallback"))]
	#[case("0 ?? 'fallback'", json!(0))]
	#[case("0 || 'fallback'", json!("fallback"))]
	#[case("$values.name && $values.a", json!(1))]
	#[case("$values.a > 1 ? 'big' : 'small'", json!("small"))]
	#[case("$values.address.city.toUpperCase()", json!("OSLO"))]
	#[case("$values.tags[1]", json!("y"))]
	#[case("$values.tags.length", json!(2))]
	#[case("$values['address']['city']", json!("Oslo"))]
	#[case("typeof $values.a", json!("number"))]
	#[case("typeof missing", json!("undefined"))]
	#[case("{ total: $values.a + $values.b, list: [$values.a] }", json!({"total": 3, "list": [1]}))]
	fn test_evaluates_against_values(#[case] source: &str, #[case] expected: serde_json::Value) {
		// Arrange
		let scope = values_scope();

		// Act
		let result = eval(source, Some(&scope)).unwrap();

		// Assert
		assert_eq!(result, Value::from(expected));
	}

	#[rstest]
	fn test_nan_comparisons_are_false() {
		let scope = values_scope();
		assert_eq!(eval("$values.name < 1", Some(&scope)), Ok(Value::Bool(false)));
		assert_eq!(eval("$values.name >= 1", Some(&scope)), Ok(Value::Bool(false)));
	}

	#[rstest]
	#[case("$values.nothing?.deep.deeper")]
	#[case("$values.missing?.[0].x")]
	#[case("$values.nothing?.trim().length")]
	fn test_optional_chain_short_circuits_whole_chain(#[case] source: &str) {
		// Arrange
		let scope = values_scope();

		// Act
		let result = eval(source, Some(&scope));

		// Assert
		assert_eq!(result, Ok(Value::Undefined));
	}

	#[rstest]
	fn test_reading_property_of_undefined_is_type_error() {
		// Act
		let err = eval("$values.a + $values.b", None).unwrap_err();

		// Assert
		assert_eq!(
			err,
			EvalError::Type("Cannot read properties of undefined (reading 'a')".to_string())
		);
	}

	#[rstest]
	fn test_reading_index_of_null_names_key() {
		let scope = values_scope();
		let err = eval("$values.nothing[0]", Some(&scope)).unwrap_err();
		assert_eq!(
			err,
			EvalError::Type("Cannot read properties of null (reading '0')".to_string())
		);
	}

	#[rstest]
	#[case("window")]
	#[case("Math")]
	#[case("constructor")]
	fn test_non_scope_identifiers_are_reference_errors(#[case] name: &str) {
		let scope = values_scope();
		assert_eq!(
			eval(name, Some(&scope)),
			Err(EvalError::Reference(name.to_string()))
		);
	}

	#[rstest]
	fn test_every_scope_name_is_undefined_without_scope() {
		for name in SCOPE_NAMES {
			assert_eq!(eval(name, None), Ok(Value::Undefined), "{name}");
		}
	}

	#[rstest]
	fn test_method_on_wrong_type_names_callee() {
		let scope = values_scope();
		let err = eval("$values.a.trim()", Some(&scope)).unwrap_err();
		assert_eq!(err, EvalError::Type("$values.a.trim is not a function".to_string()));
	}

	#[rstest]
	fn test_namespaced_and_global_calls() {
		// Arrange
		let scope = Scope::new()
			.with_values(Value::from(json!({ "price": "19.5", "qty": 3 })))
			.with_deps([Value::from(4), Value::from(9)]);

		// Act & Assert
		assert_eq!(
			eval("Number($values.price) * $values.qty", Some(&scope)),
			Ok(Value::from(58.5))
		);
		assert_eq!(
			eval("Math.max($deps[0], $deps[1])", Some(&scope)),
			Ok(Value::from(9))
		);
		assert_eq!(
			eval("Object.keys($values).join('|')", Some(&scope)),
			Ok(Value::from("price|qty"))
		);
		assert_eq!(
			eval("JSON.stringify($deps)", Some(&scope)),
			Ok(Value::from("[4,9]"))
		);
	}

	#[derive(Debug)]
	struct FieldHandle;

	impl ObjectHandle for FieldHandle {
		fn get(&self, key: &str) -> Value {
			match key {
				"value" => Value::from("typed"),
				"visible" => Value::Bool(true),
				_ => Value::Undefined,
			}
		}
	}

	#[rstest]
	fn test_handle_members_are_read_lazily() {
		// Arrange
		let scope = Scope::new()
			.with_self(Value::handle(Arc::new(FieldHandle)))
			.with_index(2);

		// Act
		let result = eval("$self.visible ? $self.value + $index : ''", Some(&scope));

		// Assert
		assert_eq!(result, Ok(Value::from("typed2")));
	}
}
