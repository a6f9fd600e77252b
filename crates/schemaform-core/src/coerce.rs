//! Host-compatible coercions
//!
//! Expression schemas are authored against the semantics of a dynamically
//! typed host language. These helpers reproduce the conversions that host
//! applies (truthiness, numeric and string conversion, loose equality) so the
//! same schema evaluates to the same result here.

use crate::value::Value;
use chrono::SecondsFormat;

/// Truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""` are falsy
pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Undefined | Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => *n != 0.0 && !n.is_nan(),
		Value::String(s) => !s.is_empty(),
		_ => true,
	}
}

/// Numeric conversion
///
/// # Examples
///
/// ```
/// use schemaform_core::{Value, to_number};
///
/// assert_eq!(to_number(&Value::from(" 12 ")), 12.0);
/// assert_eq!(to_number(&Value::Null), 0.0);
/// assert!(to_number(&Value::Undefined).is_nan());
/// assert!(to_number(&Value::from("12px")).is_nan());
/// ```
pub fn to_number(value: &Value) -> f64 {
	match value {
		Value::Undefined => f64::NAN,
		Value::Null => 0.0,
		Value::Bool(b) => f64::from(u8::from(*b)),
		Value::Number(n) => *n,
		Value::String(s) => string_to_number(s),
		Value::Date(dt) => dt.timestamp_millis() as f64,
		Value::Array(_) => string_to_number(&to_display_string(value)),
		Value::Object(_) | Value::Regex(_) | Value::Handle(_) => f64::NAN,
	}
}

/// Parse a numeric string the way the host's `Number(...)` does
pub fn string_to_number(input: &str) -> f64 {
	let s = input.trim();
	if s.is_empty() {
		return 0.0;
	}

	match s {
		"Infinity" | "+Infinity" => return f64::INFINITY,
		"-Infinity" => return f64::NEG_INFINITY,
		_ => {}
	}

	for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
		if let Some(digits) = s.strip_prefix(prefix) {
			return u64::from_str_radix(digits, radix)
				.map(|n| n as f64)
				.unwrap_or(f64::NAN);
		}
	}

	// Rust also accepts "inf" and "nan"; the host does not.
	if !s
		.chars()
		.all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
	{
		return f64::NAN;
	}

	s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a number the way the host prints it
///
/// Magnitudes from `1e-6` up to but excluding `1e21` print in plain decimal
/// notation with the shortest round-tripping digits; anything outside that
/// range uses exponent notation with an explicit exponent sign.
///
/// # Examples
///
/// ```
/// use schemaform_core::format_number;
///
/// assert_eq!(format_number(3.0), "3");
/// assert_eq!(format_number(-0.0), "0");
/// assert_eq!(format_number(2.5), "2.5");
/// assert_eq!(format_number(1e21), "1e+21");
/// assert_eq!(format_number(1e-7), "1e-7");
/// assert_eq!(format_number(f64::NAN), "NaN");
/// assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
/// ```
pub fn format_number(n: f64) -> String {
	if n.is_nan() {
		return "NaN".to_string();
	}
	if n.is_infinite() {
		return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
	}
	if n == 0.0 {
		return "0".to_string();
	}
	if (1e-6..1e21).contains(&n.abs()) {
		return format!("{}", n);
	}

	let formatted = format!("{:e}", n);
	match formatted.split_once('e') {
		Some((mantissa, exponent)) if !exponent.starts_with('-') => {
			format!("{}e+{}", mantissa, exponent)
		}
		_ => formatted,
	}
}

/// String conversion used by concatenation and `String(...)`
pub fn to_display_string(value: &Value) -> String {
	match value {
		Value::Undefined => "undefined".to_string(),
		Value::Null => "null".to_string(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => format_number(*n),
		Value::String(s) => s.clone(),
		Value::Array(items) => items
			.iter()
			.map(|item| {
				if item.is_nullish() {
					String::new()
				} else {
					to_display_string(item)
				}
			})
			.collect::<Vec<_>>()
			.join(","),
		Value::Date(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
		Value::Regex(re) => re.to_string(),
		Value::Object(_) | Value::Handle(_) => "[object Object]".to_string(),
	}
}

/// Result of the `typeof` operator
pub fn type_of(value: &Value) -> &'static str {
	match value {
		Value::Undefined => "undefined",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		_ => "object",
	}
}

/// Strict equality (`===`), an alias of [`Value::same_identity`]
pub fn strict_equals(a: &Value, b: &Value) -> bool {
	Value::same_identity(a, b)
}

/// Loose equality (`==`)
///
/// `null` and `undefined` equal each other and nothing else; numbers, strings
/// and booleans are compared numerically when their kinds differ; compound
/// values are converted to their string form when compared with a primitive.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(x, y) if x.is_nullish() || y.is_nullish() => x.is_nullish() && y.is_nullish(),
		(Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
			to_number(a) == to_number(b)
		}
		(Value::Bool(_), _) => loose_equals(&Value::Number(to_number(a)), b),
		(_, Value::Bool(_)) => loose_equals(a, &Value::Number(to_number(b))),
		(x, y) if x.is_object_like() && !y.is_object_like() => {
			loose_equals(&to_primitive(x), y)
		}
		(x, y) if !x.is_object_like() && y.is_object_like() => {
			loose_equals(x, &to_primitive(y))
		}
		_ => strict_equals(a, b),
	}
}

fn to_primitive(value: &Value) -> Value {
	match value {
		Value::Date(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
		other => Value::String(to_display_string(other)),
	}
}
