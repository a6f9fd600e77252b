//! Expression syntax tree

use schemaform_core::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Literal(Value),
	Identifier(String),
	Array(Vec<Expr>),
	Object(Vec<(String, Expr)>),
	Member {
		object: Box<Expr>,
		property: String,
		optional: bool,
	},
	Index {
		object: Box<Expr>,
		index: Box<Expr>,
		optional: bool,
	},
	Call {
		callee: Box<Expr>,
		args: Vec<Expr>,
	},
	Unary {
		op: UnaryOp,
		operand: Box<Expr>,
	},
	Binary {
		op: BinaryOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Logical {
		op: LogicalOp,
		left: Box<Expr>,
		right: Box<Expr>,
	},
	Conditional {
		test: Box<Expr>,
		consequent: Box<Expr>,
		alternate: Box<Expr>,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Not,
	Neg,
	Plus,
	TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	Lt,
	Le,
	Gt,
	Ge,
	Eq,
	Ne,
	StrictEq,
	StrictNe,
}

/// Short-circuiting operators; they return one of their operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
	And,
	Or,
	Nullish,
}

impl Expr {
	/// Render a callee for error messages (`Math.max`, `$values.list.join`)
	pub(crate) fn describe(&self) -> String {
		match self {
			Expr::Identifier(name) => name.clone(),
			Expr::Member {
				object, property, ..
			} => format!("{}.{}", object.describe(), property),
			Expr::Index { object, .. } => format!("{}[...]", object.describe()),
			Expr::Call { callee, .. } => format!("{}(...)", callee.describe()),
			_ => "(expression)".to_string(),
		}
	}

	/// Height of the tree; a lone literal or identifier is 1
	pub(crate) fn depth(&self) -> usize {
		// Explicit stack: (node, depth of node)
		let mut stack: Vec<(&Expr, usize)> = vec![(self, 1)];
		let mut deepest = 0;

		while let Some((node, depth)) = stack.pop() {
			deepest = deepest.max(depth);
			let below = depth + 1;
			match node {
				Expr::Literal(_) | Expr::Identifier(_) => {}
				Expr::Array(items) => stack.extend(items.iter().map(|item| (item, below))),
				Expr::Object(entries) => {
					stack.extend(entries.iter().map(|(_, value)| (value, below)))
				}
				Expr::Member { object, .. } => stack.push((&**object, below)),
				Expr::Index { object, index, .. } => {
					stack.push((&**object, below));
					stack.push((&**index, below));
				}
				Expr::Call { callee, args } => {
					stack.push((&**callee, below));
					stack.extend(args.iter().map(|arg| (arg, below)));
				}
				Expr::Unary { operand, .. } => stack.push((&**operand, below)),
				Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
					stack.push((&**left, below));
					stack.push((&**right, below));
				}
				Expr::Conditional {
					test,
					consequent,
					alternate,
				} => {
					stack.push((&**test, below));
					stack.push((&**consequent, below));
					stack.push((&**alternate, below));
				}
			}
		}

		deepest
	}
}
