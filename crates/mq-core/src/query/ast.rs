use std::fmt;

use crate::domain::ChatKey;

/// A leaf operand as written in the query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Name(String),
    Int(i64),
    Str(String),
}

impl Operand {
    /// The chat reference this operand resolves through.
    pub fn key(&self) -> ChatKey {
        match self {
            Operand::Name(s) | Operand::Str(s) => ChatKey::parse(s),
            Operand::Int(n) => ChatKey::Id(*n),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Sub,
    Xor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Sub => "-",
            BinaryOp::Xor => "^",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Leaf(Operand),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn leaf(operand: Operand) -> Self {
        Expr::Leaf(operand)
    }

    pub fn not(child: Expr) -> Self {
        Expr::Not(Box::new(child))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Leaf operands in evaluation order (depth-first, left to right).
    pub fn leaves(&self) -> Vec<&Operand> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Operand>) {
        match self {
            Expr::Leaf(operand) => out.push(operand),
            Expr::Not(child) => child.collect_leaves(out),
            Expr::Binary { left, right, .. } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }
}

/// Fully parenthesized rendering; makes grouping visible.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Leaf(Operand::Name(s)) => write!(f, "{s}"),
            Expr::Leaf(Operand::Int(n)) => write!(f, "{n}"),
            Expr::Leaf(Operand::Str(s)) => write!(f, "{s:?}"),
            Expr::Not(child) => write!(f, "~{child}"),
            Expr::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
        }
    }
}
