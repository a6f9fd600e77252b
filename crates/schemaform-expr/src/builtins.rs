//! Allow-listed functions and methods
//!
//! Calls are the only way an expression can reach behaviour beyond operators,
//! so the set of callable names is closed. [`check_calls`] rejects anything
//! outside it at compile time; the interpreter only ever dispatches to the
//! implementations below.

use crate::ast::Expr;
use crate::error::{EvalError, EvalResult};
use schemaform_core::{
	Value, format_number, is_truthy, strict_equals, to_display_string, to_number,
};

/// Global functions callable by bare name
pub const GLOBAL_FUNCTIONS: &[&str] = &[
	"Number",
	"String",
	"Boolean",
	"isNaN",
	"parseInt",
	"parseFloat",
];

/// Namespaced functions, `Namespace.name`
pub const NAMESPACED_FUNCTIONS: &[&str] = &[
	"Math.abs",
	"Math.ceil",
	"Math.floor",
	"Math.round",
	"Math.trunc",
	"Math.sign",
	"Math.sqrt",
	"Math.pow",
	"Math.min",
	"Math.max",
	"Array.isArray",
	"Object.keys",
	"Object.values",
	"JSON.stringify",
];

/// Methods callable on a receiver value
pub const METHODS: &[&str] = &[
	"includes",
	"indexOf",
	"startsWith",
	"endsWith",
	"trim",
	"toUpperCase",
	"toLowerCase",
	"slice",
	"split",
	"join",
	"toFixed",
	"toString",
	"test",
];

/// Resolve `Namespace.name` against the allow-list
pub(crate) fn namespaced_function(namespace: &str, name: &str) -> Option<&'static str> {
	NAMESPACED_FUNCTIONS
		.iter()
		.copied()
		.find(|qualified| qualified.split_once('.') == Some((namespace, name)))
}

/// Reject calls to anything outside the allow-list
pub(crate) fn check_calls(expr: &Expr) -> Result<(), String> {
	match expr {
		Expr::Literal(_) | Expr::Identifier(_) => Ok(()),
		Expr::Array(items) => items.iter().try_for_each(check_calls),
		Expr::Object(entries) => entries.iter().try_for_each(|(_, value)| check_calls(value)),
		Expr::Member { object, .. } => check_calls(object),
		Expr::Index { object, index, .. } => {
			check_calls(object)?;
			check_calls(index)
		}
		Expr::Call { callee, args } => {
			let allowed = match callee.as_ref() {
				Expr::Identifier(name) => GLOBAL_FUNCTIONS.contains(&name.as_str()),
				Expr::Member {
					object, property, ..
				} => {
					let namespaced = match object.as_ref() {
						Expr::Identifier(namespace) => {
							namespaced_function(namespace, property).is_some()
						}
						_ => false,
					};
					if !namespaced {
						check_calls(object)?;
					}
					namespaced || METHODS.contains(&property.as_str())
				}
				_ => false,
			};
			if !allowed {
				return Err(format!(
					"`{}` is not an allow-listed function",
					callee.describe()
				));
			}
			args.iter().try_for_each(check_calls)
		}
		Expr::Unary { operand, .. } => check_calls(operand),
		Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
			check_calls(left)?;
			check_calls(right)
		}
		Expr::Conditional {
			test,
			consequent,
			alternate,
		} => {
			check_calls(test)?;
			check_calls(consequent)?;
			check_calls(alternate)
		}
	}
}

fn arg(args: &[Value], idx: usize) -> Value {
	args.get(idx).cloned().unwrap_or_default()
}

fn number_arg(args: &[Value], idx: usize) -> f64 {
	to_number(&arg(args, idx))
}

/// Call a global or namespaced function by its qualified name
pub(crate) fn call_function(name: &str, args: &[Value]) -> EvalResult<Value> {
	let result = match name {
		"Number" => Value::Number(if args.is_empty() { 0.0 } else { number_arg(args, 0) }),
		"String" => Value::String(if args.is_empty() {
			String::new()
		} else {
			to_display_string(&args[0])
		}),
		"Boolean" => Value::Bool(is_truthy(&arg(args, 0))),
		"isNaN" => Value::Bool(number_arg(args, 0).is_nan()),
		"parseInt" => Value::Number(parse_int(
			&to_display_string(&arg(args, 0)),
			&arg(args, 1),
		)),
		"parseFloat" => Value::Number(parse_float(&to_display_string(&arg(args, 0)))),
		"Math.abs" => Value::Number(number_arg(args, 0).abs()),
		"Math.ceil" => Value::Number(number_arg(args, 0).ceil()),
		"Math.floor" => Value::Number(number_arg(args, 0).floor()),
		"Math.round" => Value::Number(round_half_up(number_arg(args, 0))),
		"Math.trunc" => Value::Number(number_arg(args, 0).trunc()),
		"Math.sign" => {
			let n = number_arg(args, 0);
			Value::Number(if n.is_nan() || n == 0.0 { n } else { n.signum() })
		}
		"Math.sqrt" => Value::Number(number_arg(args, 0).sqrt()),
		"Math.pow" => Value::Number(number_arg(args, 0).powf(number_arg(args, 1))),
		"Math.min" => Value::Number(fold_numbers(args, f64::INFINITY, f64::min)),
		"Math.max" => Value::Number(fold_numbers(args, f64::NEG_INFINITY, f64::max)),
		"Array.isArray" => Value::Bool(arg(args, 0).is_array()),
		"Object.keys" => {
			let target = object_arg(args)?;
			Value::array(target.enumerable_keys().into_iter().map(Value::String))
		}
		"Object.values" => {
			let target = object_arg(args)?;
			Value::array(
				target
					.enumerable_keys()
					.iter()
					.map(|key| target.get(key)),
			)
		}
		"JSON.stringify" => {
			let target = arg(args, 0);
			if target.is_undefined() {
				Value::Undefined
			} else {
				serde_json::to_string(&target.to_json())
					.map(Value::String)
					.map_err(|e| EvalError::Type(e.to_string()))?
			}
		}
		other => return Err(EvalError::not_a_function(other)),
	};
	Ok(result)
}

fn fold_numbers(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
	let mut acc = init;
	for value in args {
		let n = to_number(value);
		// f64::min/max ignore NaN; the host propagates it.
		if n.is_nan() {
			return f64::NAN;
		}
		acc = pick(acc, n);
	}
	acc
}

fn object_arg(args: &[Value]) -> EvalResult<Value> {
	let target = arg(args, 0);
	if target.is_nullish() {
		return Err(EvalError::Type(
			"Cannot convert undefined or null to object".to_string(),
		));
	}
	Ok(match target {
		Value::String(s) => Value::array(s.chars().map(|c| Value::String(c.to_string()))),
		other => other,
	})
}

fn parse_int(text: &str, radix: &Value) -> f64 {
	let s = text.trim_start();
	let (negative, s) = match s.strip_prefix('-') {
		Some(rest) => (true, rest),
		None => (false, s.strip_prefix('+').unwrap_or(s)),
	};

	let mut radix = match radix {
		Value::Undefined => 10,
		other => to_number(other) as u32,
	};
	let mut digits = s;
	if radix == 0 || radix == 16 {
		if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
			digits = rest;
			radix = 16;
		} else if radix == 0 {
			radix = 10;
		}
	}
	if !(2..=36).contains(&radix) {
		return f64::NAN;
	}

	let valid: String = digits.chars().take_while(|c| c.is_digit(radix)).collect();
	if valid.is_empty() {
		return f64::NAN;
	}
	let magnitude = valid
		.chars()
		.filter_map(|c| c.to_digit(radix))
		.fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
	if negative { -magnitude } else { magnitude }
}

fn parse_float(text: &str) -> f64 {
	let s = text.trim_start();
	for (literal, value) in [
		("Infinity", f64::INFINITY),
		("+Infinity", f64::INFINITY),
		("-Infinity", f64::NEG_INFINITY),
	] {
		if s.starts_with(literal) {
			return value;
		}
	}

	// Longest prefix that still parses as a number
	let candidate: String = s
		.chars()
		.take_while(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
		.collect();
	(1..=candidate.len())
		.rev()
		.find_map(|end| {
			let prefix = &candidate[..end];
			prefix
				.parse::<f64>()
				.ok()
				.filter(|_| !prefix.ends_with(['e', 'E', '+', '-']))
		})
		.unwrap_or(f64::NAN)
}

/// Resolve a relative slice bound against a length
fn relative_index(bound: &Value, len: usize, default: usize) -> usize {
	if bound.is_undefined() {
		return default;
	}
	let n = to_number(bound);
	if n.is_nan() {
		return 0;
	}
	let n = n.trunc();
	if n < 0.0 {
		(len as f64 + n).max(0.0) as usize
	} else {
		n.min(len as f64) as usize
	}
}

/// Call an allow-listed method on a non-nullish receiver
pub(crate) fn call_method(receiver: &Value, method: &str, args: &[Value]) -> EvalResult<Value> {
	let result = match (receiver, method) {
		(Value::String(s), "includes") => {
			Value::Bool(s.contains(to_display_string(&arg(args, 0)).as_str()))
		}
		(Value::String(s), "indexOf") => {
			let needle = to_display_string(&arg(args, 0));
			Value::Number(
				s.find(needle.as_str())
					.map(|byte_idx| s[..byte_idx].chars().count() as f64)
					.unwrap_or(-1.0),
			)
		}
		(Value::String(s), "startsWith") => {
			Value::Bool(s.starts_with(to_display_string(&arg(args, 0)).as_str()))
		}
		(Value::String(s), "endsWith") => {
			Value::Bool(s.ends_with(to_display_string(&arg(args, 0)).as_str()))
		}
		(Value::String(s), "trim") => Value::String(s.trim().to_string()),
		(Value::String(s), "toUpperCase") => Value::String(s.to_uppercase()),
		(Value::String(s), "toLowerCase") => Value::String(s.to_lowercase()),
		(Value::String(s), "slice") => {
			let chars: Vec<char> = s.chars().collect();
			let start = relative_index(&arg(args, 0), chars.len(), 0);
			let end = relative_index(&arg(args, 1), chars.len(), chars.len());
			Value::String(chars.get(start..end.max(start)).unwrap_or(&[]).iter().collect())
		}
		(Value::String(s), "split") => match arg(args, 0) {
			Value::Undefined => Value::array([Value::String(s.clone())]),
			separator => {
				let separator = to_display_string(&separator);
				if separator.is_empty() {
					Value::array(s.chars().map(|c| Value::String(c.to_string())))
				} else {
					Value::array(
						s.split(separator.as_str())
							.map(|part| Value::String(part.to_string())),
					)
				}
			}
		},
		(Value::Array(items), "includes") => {
			let needle = arg(args, 0);
			Value::Bool(items.iter().any(|item| same_value_zero(item, &needle)))
		}
		(Value::Array(items), "indexOf") => {
			let needle = arg(args, 0);
			Value::Number(
				items
					.iter()
					.position(|item| strict_equals(item, &needle))
					.map(|idx| idx as f64)
					.unwrap_or(-1.0),
			)
		}
		(Value::Array(items), "join") => {
			let separator = match arg(args, 0) {
				Value::Undefined => ",".to_string(),
				other => to_display_string(&other),
			};
			Value::String(
				items
					.iter()
					.map(|item| {
						if item.is_nullish() {
							String::new()
						} else {
							to_display_string(item)
						}
					})
					.collect::<Vec<_>>()
					.join(&separator),
			)
		}
		(Value::Array(items), "slice") => {
			let start = relative_index(&arg(args, 0), items.len(), 0);
			let end = relative_index(&arg(args, 1), items.len(), items.len());
			Value::array(items.get(start..end.max(start)).unwrap_or(&[]).iter().cloned())
		}
		(Value::Number(n), "toFixed") => {
			let digits = match number_arg(args, 0) {
				d if d.is_nan() => 0.0,
				d => d.trunc(),
			};
			if !(0.0..=100.0).contains(&digits) {
				return Err(EvalError::Type(
					"toFixed() digits argument must be between 0 and 100".to_string(),
				));
			}
			Value::String(if n.is_finite() {
				format!("{:.*}", digits as usize, n)
			} else {
				format_number(*n)
			})
		}
		(Value::Regex(re), "test") => Value::Bool(re.is_match(&to_display_string(&arg(args, 0)))),
		(receiver, "toString") => Value::String(to_display_string(receiver)),
		(_, name) => return Err(EvalError::not_a_function(name)),
	};
	Ok(result)
}

/// Round to the nearest integer, halves toward positive infinity
fn round_half_up(n: f64) -> f64 {
	let floor = n.floor();
	let rounded = if n - floor >= 0.5 { floor + 1.0 } else { floor };
	if rounded == 0.0 && n.is_sign_negative() {
		-0.0
	} else {
		rounded
	}
}

/// Equality used by `includes`: strict, except `NaN` matches `NaN`
fn same_value_zero(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
		_ => strict_equals(a, b),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::parse_body;
	use rstest::rstest;
	use schemaform_core::string_to_number;

	fn s(text: &str) -> Value {
		Value::from(text)
	}

	#[rstest]
	#[case("Math.max(1, 2)")]
	#[case("Number($values.age) + 1")]
	#[case("$values.tags.includes('x')")]
	#[case("Object.keys($values).join(',')")]
	#[case("[1, 2].slice(1).indexOf(2)")]
	fn test_allow_listed_calls_pass(#[case] source: &str) {
		let expr = parse_body(source).unwrap();
		assert_eq!(check_calls(&expr), Ok(()));
	}

	#[rstest]
	#[case("alert(1)", "alert")]
	#[case("$form.submit()", "$form.submit")]
	#[case("Math.random()", "Math.random")]
	#[case("$values['trim']()", "$values[...]")]
	#[case("[Number(1), eval('x')]", "eval")]
	#[case("$values.list.map(1)", "$values.list.map")]
	fn test_disallowed_calls_are_rejected(#[case] source: &str, #[case] callee: &str) {
		// Arrange
		let expr = parse_body(source).unwrap();

		// Act
		let err = check_calls(&expr).unwrap_err();

		// Assert
		assert!(err.contains(callee), "{err} should mention {callee}");
	}

	#[rstest]
	#[case("42px", Value::Undefined, 42.0)]
	#[case("  -17", Value::Undefined, -17.0)]
	#[case("0x1f", Value::Undefined, 31.0)]
	#[case("ff", Value::from(16), 255.0)]
	#[case("101", Value::from(2), 5.0)]
	fn test_parse_int(#[case] text: &str, #[case] radix: Value, #[case] expected: f64) {
		assert_eq!(parse_int(text, &radix), expected);
	}

	#[rstest]
	fn test_parse_int_without_digits_is_nan() {
		assert!(parse_int("px", &Value::Undefined).is_nan());
		assert!(parse_int("1", &Value::from(1)).is_nan());
	}

	#[rstest]
	#[case("3.14abc", 3.14)]
	#[case("  1e3", 1000.0)]
	#[case("2e", 2.0)]
	#[case("-Infinity", f64::NEG_INFINITY)]
	fn test_parse_float(#[case] text: &str, #[case] expected: f64) {
		assert_eq!(parse_float(text), expected);
	}

	#[rstest]
	fn test_math_min_max() {
		// Act & Assert
		assert_eq!(
			call_function("Math.max", &[Value::from(1), s("7"), Value::from(3)]),
			Ok(Value::from(7))
		);
		assert_eq!(call_function("Math.min", &[]), Ok(Value::Number(f64::INFINITY)));
		let nan = call_function("Math.max", &[Value::from(1), Value::Undefined]).unwrap();
		assert!(nan.as_f64().unwrap().is_nan());
	}

	#[rstest]
	#[case(2.5, 3.0)]
	#[case(-2.5, -2.0)]
	#[case(-0.4, 0.0)]
	#[case(0.49999999999999994, 0.0)]
	#[case(4_503_599_627_370_497.0, 4_503_599_627_370_497.0)]
	#[case(-4_503_599_627_370_497.0, -4_503_599_627_370_497.0)]
	#[case(f64::INFINITY, f64::INFINITY)]
	fn test_math_round_half_up(#[case] input: f64, #[case] expected: f64) {
		assert_eq!(
			call_function("Math.round", &[Value::from(input)]),
			Ok(Value::from(expected))
		);
	}

	#[rstest]
	fn test_math_round_keeps_nan_and_negative_zero() {
		// Act
		let nan = call_function("Math.round", &[Value::Number(f64::NAN)]).unwrap();
		let zero = call_function("Math.round", &[Value::from(-0.2)]).unwrap();

		// Assert
		assert!(nan.as_f64().unwrap().is_nan());
		assert!(zero.as_f64().unwrap().is_sign_negative());
	}

	#[rstest]
	fn test_object_keys_of_null_is_type_error() {
		let result = call_function("Object.keys", &[Value::Null]);
		assert!(matches!(result, Err(EvalError::Type(_))));
	}

	#[rstest]
	fn test_string_methods() {
		// Arrange
		let text = s("  Hello World  ");

		// Act & Assert
		assert_eq!(call_method(&text, "trim", &[]), Ok(s("Hello World")));
		assert_eq!(call_method(&s("abc"), "toUpperCase", &[]), Ok(s("ABC")));
		assert_eq!(call_method(&s("abcdef"), "slice", &[Value::from(-3)]), Ok(s("def")));
		assert_eq!(
			call_method(&s("a,b,c"), "split", &[s(",")]),
			Ok(Value::array([s("a"), s("b"), s("c")]))
		);
		assert_eq!(call_method(&s("héllo"), "indexOf", &[s("l")]), Ok(Value::from(2)));
	}

	#[rstest]
	fn test_array_methods() {
		// Arrange
		let list = Value::array([Value::from(1), Value::Null, Value::Number(f64::NAN)]);

		// Act & Assert
		assert_eq!(call_method(&list, "join", &[s("-")]), Ok(s("1--NaN")));
		assert_eq!(
			call_method(&list, "includes", &[Value::Number(f64::NAN)]),
			Ok(Value::Bool(true))
		);
		assert_eq!(
			call_method(&list, "indexOf", &[Value::Number(f64::NAN)]),
			Ok(Value::from(-1))
		);
	}

	#[rstest]
	fn test_to_fixed() {
		assert_eq!(
			call_method(&Value::from(3.14159), "toFixed", &[Value::from(2)]),
			Ok(s("3.14"))
		);
		assert!(call_method(&Value::from(1), "toFixed", &[Value::from(101)]).is_err());
	}

	#[rstest]
	fn test_regex_test_method() {
		let re = Value::regex("^\\d+$", "").unwrap();
		assert_eq!(call_method(&re, "test", &[s("123")]), Ok(Value::Bool(true)));
		assert_eq!(call_method(&re, "test", &[s("12a")]), Ok(Value::Bool(false)));
	}

	#[rstest]
	fn test_method_on_wrong_receiver_is_type_error() {
		let result = call_method(&Value::from(1), "trim", &[]);
		assert_eq!(result, Err(EvalError::Type("trim is not a function".to_string())));
	}

	#[rstest]
	fn test_number_conversion_matches_core() {
		assert_eq!(
			call_function("Number", &[s("0x10")]),
			Ok(Value::from(string_to_number("0x10")))
		);
	}
}
