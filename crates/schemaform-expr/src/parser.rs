//! Expression body parser using nom parser combinators
//!
//! The grammar is a deliberately small expression subset: literals, the scope
//! identifiers, member/index access (with optional chaining), calls, unary,
//! arithmetic, comparison, logical and conditional operators. There are no
//! statements, assignments or function literals.
//!
//! Precedence, loosest first:
//!
//! ```text
//! conditional    a ? b : c
//! nullish        a ?? b
//! logical_or     a || b
//! logical_and    a && b
//! equality       == != === !==
//! relational     < <= > >=
//! additive       + -
//! multiplicative * / %
//! unary          ! - + typeof
//! postfix        a.b  a?.b  a[b]  a?.[b]  f(x)
//! primary        literals, identifiers, (expr), [..], {..}
//! ```

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use nom::{
	IResult, Parser,
	branch::alt,
	bytes::complete::{tag, tag_no_case, take_while},
	character::complete::{char, digit0, digit1, hex_digit1, multispace0, one_of, satisfy},
	combinator::{all_consuming, cut, map, not, opt, recognize, value},
	error::{Error, ErrorKind},
	multi::{many0, separated_list0},
	sequence::{delimited, pair, preceded, separated_pair, terminated},
};
use schemaform_core::{Value, format_number};
use std::cell::Cell;

type ParseResult<'a, T> = IResult<&'a str, T>;

/// Syntax error with the byte offset where parsing stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
	pub(crate) message: String,
	pub(crate) offset: usize,
}

impl SyntaxError {
	fn at(body: &str, remaining: &str) -> Self {
		let offset = body.len().saturating_sub(remaining.len());
		let message = match remaining.trim_start().chars().next() {
			None => "unexpected end of expression".to_string(),
			Some(_) => {
				let snippet: String = remaining.trim_start().chars().take(16).collect();
				format!("unexpected token at offset {}: `{}`", offset, snippet)
			}
		};
		Self { message, offset }
	}
}

/// Parse a complete expression body
pub(crate) fn parse_body(body: &str) -> Result<Expr, SyntaxError> {
	match all_consuming(delimited(multispace0, expression, multispace0)).parse(body) {
		Ok((_, expr)) if expr.depth() > MAX_DEPTH => Err(SyntaxError {
			message: TOO_DEEP.to_string(),
			offset: 0,
		}),
		Ok((_, expr)) => Ok(expr),
		Err(nom::Err::Error(e) | nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => {
			Err(SyntaxError {
				message: TOO_DEEP.to_string(),
				offset: body.len().saturating_sub(e.input.len()),
			})
		}
		Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(SyntaxError::at(body, e.input)),
		Err(nom::Err::Incomplete(_)) => Err(SyntaxError {
			message: "unexpected end of expression".to_string(),
			offset: body.len(),
		}),
	}
}

// ============================================================================
// Nesting limits
// ============================================================================

/// Deepest recursion through parentheses, literals, calls, unary operators
/// and conditional branches
const MAX_NESTING: usize = 32;

/// Tallest syntax tree handed to validation and evaluation
const MAX_DEPTH: usize = 128;

const TOO_DEEP: &str = "expression nested too deeply";

thread_local! {
	static NESTING: Cell<usize> = const { Cell::new(0) };
}

struct NestingGuard;

impl Drop for NestingGuard {
	fn drop(&mut self) {
		NESTING.with(|level| level.set(level.get().saturating_sub(1)));
	}
}

fn too_deep(input: &str) -> nom::Err<Error<&str>> {
	nom::Err::Failure(Error::new(input, ErrorKind::TooLarge))
}

/// Run `parser` one nesting level deeper
fn nested<'a, O>(
	input: &'a str,
	parser: impl FnOnce(&'a str) -> ParseResult<'a, O>,
) -> ParseResult<'a, O> {
	let level = NESTING.with(|level| {
		level.set(level.get() + 1);
		level.get()
	});
	let _guard = NestingGuard;
	if level > MAX_NESTING {
		return Err(too_deep(input));
	}
	parser(input)
}

fn bounded(input: &str, depth: usize) -> Result<(), nom::Err<Error<&str>>> {
	if depth > MAX_DEPTH {
		return Err(too_deep(input));
	}
	Ok(())
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn is_ident_start(c: char) -> bool {
	c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '$'
}

/// A fixed token surrounded by optional whitespace
fn sym<'a>(token: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
	move |input| delimited(multispace0, tag(token), multispace0).parse(input)
}

/// A keyword that is not the prefix of a longer identifier
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
	move |input| terminated(tag(word), not(satisfy(is_ident_continue))).parse(input)
}

fn identifier(input: &str) -> ParseResult<'_, &str> {
	recognize(pair(satisfy(is_ident_start), take_while(is_ident_continue))).parse(input)
}

fn exponent(input: &str) -> ParseResult<'_, &str> {
	recognize((one_of("eE"), opt(one_of("+-")), digit1)).parse(input)
}

fn number(input: &str) -> ParseResult<'_, f64> {
	let hex = preceded(tag_no_case("0x"), hex_digit1::<&str, Error<&str>>).parse(input);
	if let Ok((rest, digits)) = hex {
		return u64::from_str_radix(digits, 16)
			.map(|n| (rest, n as f64))
			.map_err(|_| nom::Err::Error(Error::new(input, ErrorKind::HexDigit)));
	}

	let (rest, text) = alt((
		recognize((digit1, opt((char('.'), digit0)), opt(exponent))),
		recognize((char('.'), digit1, opt(exponent))),
	))
	.parse(input)?;
	// `1abc` is not a number followed by an identifier
	let (rest, _) = not(satisfy(is_ident_start)).parse(rest)?;

	text.parse::<f64>()
		.map(|n| (rest, n))
		.map_err(|_| nom::Err::Error(Error::new(input, ErrorKind::Float)))
}

/// Single or double quoted string with backslash escapes
fn string_literal(input: &str) -> ParseResult<'_, String> {
	let (body, quote) = one_of("'\"").parse(input)?;
	let mut out = String::new();
	let mut chars = body.char_indices();

	while let Some((idx, c)) = chars.next() {
		match c {
			c if c == quote => return Ok((&body[idx + c.len_utf8()..], out)),
			'\\' => {
				let Some((esc_idx, escaped)) = chars.next() else {
					break;
				};
				match escaped {
					'n' => out.push('\n'),
					'r' => out.push('\r'),
					't' => out.push('\t'),
					'b' => out.push('\u{0008}'),
					'f' => out.push('\u{000C}'),
					'v' => out.push('\u{000B}'),
					'0' => out.push('\0'),
					'u' => {
						let hex = body.get(esc_idx + 1..esc_idx + 5).unwrap_or("");
						let decoded = (hex.len() == 4)
							.then(|| u32::from_str_radix(hex, 16).ok())
							.flatten()
							.and_then(char::from_u32);
						let Some(decoded) = decoded else {
							return Err(nom::Err::Failure(Error::new(
								&body[esc_idx..],
								ErrorKind::Escaped,
							)));
						};
						out.push(decoded);
						for _ in 0..4 {
							chars.next();
						}
					}
					// `\'`, `\"`, `\\` and any other escaped character stand for themselves
					other => out.push(other),
				}
			}
			'\n' | '\r' => {
				return Err(nom::Err::Failure(Error::new(&body[idx..], ErrorKind::Char)));
			}
			c => out.push(c),
		}
	}

	Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

// ============================================================================
// Primary expressions
// ============================================================================

fn identifier_or_literal(input: &str) -> ParseResult<'_, Expr> {
	map(identifier, |name| match name {
		"true" => Expr::Literal(Value::Bool(true)),
		"false" => Expr::Literal(Value::Bool(false)),
		"null" => Expr::Literal(Value::Null),
		"undefined" => Expr::Literal(Value::Undefined),
		"NaN" => Expr::Literal(Value::Number(f64::NAN)),
		"Infinity" => Expr::Literal(Value::Number(f64::INFINITY)),
		other => Expr::Identifier(other.to_string()),
	})
	.parse(input)
}

fn array_literal(input: &str) -> ParseResult<'_, Expr> {
	map(
		delimited(
			char('['),
			terminated(separated_list0(sym(","), expression), opt(sym(","))),
			cut(sym("]")),
		),
		Expr::Array,
	)
	.parse(input)
}

fn property_key(input: &str) -> ParseResult<'_, String> {
	delimited(
		multispace0,
		alt((
			map(identifier, |name: &str| name.to_string()),
			string_literal,
			map(number, format_number),
		)),
		multispace0,
	)
	.parse(input)
}

fn object_literal(input: &str) -> ParseResult<'_, Expr> {
	map(
		delimited(
			char('{'),
			terminated(
				separated_list0(sym(","), separated_pair(property_key, char(':'), expression)),
				opt(sym(",")),
			),
			cut(sym("}")),
		),
		Expr::Object,
	)
	.parse(input)
}

fn parenthesized(input: &str) -> ParseResult<'_, Expr> {
	delimited(char('('), expression, cut(sym(")"))).parse(input)
}

fn primary(input: &str) -> ParseResult<'_, Expr> {
	delimited(
		multispace0,
		alt((
			map(number, |n| Expr::Literal(Value::Number(n))),
			map(string_literal, |s| Expr::Literal(Value::String(s))),
			array_literal,
			object_literal,
			parenthesized,
			identifier_or_literal,
		)),
		multispace0,
	)
	.parse(input)
}

// ============================================================================
// Postfix chains
// ============================================================================

enum Suffix {
	Member(String, bool),
	Index(Expr, bool),
	Call(Vec<Expr>),
}

/// `?.` that is not the start of a conditional followed by a decimal (`a?.5:1`)
fn optional_dot(input: &str) -> ParseResult<'_, &str> {
	delimited(
		multispace0,
		terminated(tag("?."), not(satisfy(|c: char| c.is_ascii_digit()))),
		multispace0,
	)
	.parse(input)
}

fn call_arguments(input: &str) -> ParseResult<'_, Vec<Expr>> {
	preceded(
		sym("("),
		terminated(
			terminated(separated_list0(sym(","), expression), opt(sym(","))),
			cut(sym(")")),
		),
	)
	.parse(input)
}

fn suffix(input: &str) -> ParseResult<'_, Suffix> {
	alt((
		map(
			preceded(sym("?.["), terminated(expression, cut(sym("]")))),
			|index| Suffix::Index(index, true),
		),
		map(preceded(optional_dot, cut(identifier)), |name| {
			Suffix::Member(name.to_string(), true)
		}),
		map(preceded(sym("."), cut(identifier)), |name| {
			Suffix::Member(name.to_string(), false)
		}),
		map(
			preceded(sym("["), terminated(expression, cut(sym("]")))),
			|index| Suffix::Index(index, false),
		),
		map(call_arguments, Suffix::Call),
	))
	.parse(input)
}

fn postfix(input: &str) -> ParseResult<'_, Expr> {
	let (rest, base) = primary(input)?;
	let (rest, suffixes) = many0(suffix).parse(rest)?;
	if suffixes.is_empty() {
		return Ok((rest, base));
	}

	let mut depth = base.depth();
	let mut expr = base;
	for suffix in suffixes {
		expr = match suffix {
			Suffix::Member(property, optional) => {
				depth += 1;
				Expr::Member {
					object: Box::new(expr),
					property,
					optional,
				}
			}
			Suffix::Index(index, optional) => {
				depth = depth.max(index.depth()) + 1;
				Expr::Index {
					object: Box::new(expr),
					index: Box::new(index),
					optional,
				}
			}
			Suffix::Call(args) => {
				depth = args.iter().map(Expr::depth).fold(depth, usize::max) + 1;
				Expr::Call {
					callee: Box::new(expr),
					args,
				}
			}
		};
		bounded(input, depth)?;
	}
	Ok((rest, expr))
}

// ============================================================================
// Operators
// ============================================================================

fn unary_operator(input: &str) -> ParseResult<'_, UnaryOp> {
	delimited(
		multispace0,
		alt((
			value(UnaryOp::Not, terminated(char('!'), not(char('=')))),
			value(UnaryOp::Neg, char('-')),
			value(UnaryOp::Plus, char('+')),
			value(UnaryOp::TypeOf, keyword("typeof")),
		)),
		multispace0,
	)
	.parse(input)
}

fn nested_unary(input: &str) -> ParseResult<'_, Expr> {
	nested(input, unary)
}

fn prefixed(input: &str) -> ParseResult<'_, Expr> {
	let (rest, op) = unary_operator(input)?;
	let (rest, operand) = cut(nested_unary).parse(rest)?;
	bounded(input, operand.depth() + 1)?;
	Ok((
		rest,
		Expr::Unary {
			op,
			operand: Box::new(operand),
		},
	))
}

fn unary(input: &str) -> ParseResult<'_, Expr> {
	alt((prefixed, postfix)).parse(input)
}

fn operator<'a, O: Clone + 'static>(
	choices: &'static [(&'static str, O)],
) -> impl FnMut(&'a str) -> ParseResult<'a, O> {
	move |input| {
		let (rest, _) = multispace0(input)?;
		// Longest tokens are listed first, so the first match wins.
		for (token, op) in choices {
			if let Some(after) = rest.strip_prefix(token) {
				let (after, _) = multispace0(after)?;
				return Ok((after, op.clone()));
			}
		}
		Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
	}
}

const MULTIPLICATIVE: &[(&str, BinaryOp)] = &[
	("*", BinaryOp::Mul),
	("/", BinaryOp::Div),
	("%", BinaryOp::Rem),
];

const ADDITIVE: &[(&str, BinaryOp)] = &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)];

const RELATIONAL: &[(&str, BinaryOp)] = &[
	("<=", BinaryOp::Le),
	(">=", BinaryOp::Ge),
	("<", BinaryOp::Lt),
	(">", BinaryOp::Gt),
];

const EQUALITY: &[(&str, BinaryOp)] = &[
	("===", BinaryOp::StrictEq),
	("!==", BinaryOp::StrictNe),
	("==", BinaryOp::Eq),
	("!=", BinaryOp::Ne),
];

/// Left-associative binary level
fn binary_level<'a>(
	input: &'a str,
	operand: fn(&'a str) -> ParseResult<'a, Expr>,
	choices: &'static [(&'static str, BinaryOp)],
) -> ParseResult<'a, Expr> {
	let (rest_input, first) = operand(input)?;
	let (rest_input, rest) = many0(pair(operator(choices), operand)).parse(rest_input)?;
	if rest.is_empty() {
		return Ok((rest_input, first));
	}

	let mut depth = first.depth();
	let mut expr = first;
	for (op, right) in rest {
		depth = depth.max(right.depth()) + 1;
		bounded(input, depth)?;
		expr = Expr::Binary {
			op,
			left: Box::new(expr),
			right: Box::new(right),
		};
	}
	Ok((rest_input, expr))
}

fn multiplicative(input: &str) -> ParseResult<'_, Expr> {
	binary_level(input, unary, MULTIPLICATIVE)
}

fn additive(input: &str) -> ParseResult<'_, Expr> {
	binary_level(input, multiplicative, ADDITIVE)
}

fn relational(input: &str) -> ParseResult<'_, Expr> {
	binary_level(input, additive, RELATIONAL)
}

fn equality(input: &str) -> ParseResult<'_, Expr> {
	binary_level(input, relational, EQUALITY)
}

/// Left-associative logical level
fn logical_level<'a>(
	input: &'a str,
	operand: fn(&'a str) -> ParseResult<'a, Expr>,
	token: &'static str,
	op: LogicalOp,
) -> ParseResult<'a, Expr> {
	let (rest_input, first) = operand(input)?;
	let (rest_input, rest) = many0(preceded(sym(token), operand)).parse(rest_input)?;
	if rest.is_empty() {
		return Ok((rest_input, first));
	}

	let mut depth = first.depth();
	let mut expr = first;
	for right in rest {
		depth = depth.max(right.depth()) + 1;
		bounded(input, depth)?;
		expr = Expr::Logical {
			op,
			left: Box::new(expr),
			right: Box::new(right),
		};
	}
	Ok((rest_input, expr))
}

fn logical_and(input: &str) -> ParseResult<'_, Expr> {
	logical_level(input, equality, "&&", LogicalOp::And)
}

fn logical_or(input: &str) -> ParseResult<'_, Expr> {
	logical_level(input, logical_and, "||", LogicalOp::Or)
}

fn nullish(input: &str) -> ParseResult<'_, Expr> {
	logical_level(input, logical_or, "??", LogicalOp::Nullish)
}

fn ternary(input: &str) -> ParseResult<'_, Expr> {
	let (rest, test) = nullish(input)?;
	let (rest, branches) = opt(preceded(
		sym("?"),
		cut(separated_pair(conditional, sym(":"), conditional)),
	))
	.parse(rest)?;
	let Some((consequent, alternate)) = branches else {
		return Ok((rest, test));
	};

	let depth = test.depth().max(consequent.depth()).max(alternate.depth()) + 1;
	bounded(input, depth)?;
	Ok((
		rest,
		Expr::Conditional {
			test: Box::new(test),
			consequent: Box::new(consequent),
			alternate: Box::new(alternate),
		},
	))
}

fn conditional(input: &str) -> ParseResult<'_, Expr> {
	nested(input, ternary)
}

fn expression(input: &str) -> ParseResult<'_, Expr> {
	conditional(input)
}
