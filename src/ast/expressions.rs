use crate::ast::{BinOp, Function, Selector, UnaryOp};

/// Abstract Syntax Tree node representing a parsed tag expression.
///
/// Nodes are built once at registration time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field reference
    ///
    /// # Examples
    /// ```text
    /// $
    /// (a.b)$
    /// !$[0]
    /// ```
    Selector(Selector),

    // Literals
    /// Numeric literal; every number is a 64-bit float
    ///
    /// # Example
    /// ```text
    /// 42
    /// 3.5
    /// ```
    Float(f64),

    /// String literal in single or double quotes
    String(String),

    /// Boolean literal
    Boolean(bool),

    /// `nil` (or `null`)
    Nil,

    /// Parenthesised sub-expression, sorted independently of its parent
    ///
    /// # Example
    /// ```text
    /// ($+1)*2
    /// ```
    Group(Box<Expr>),

    /// Prefix operator applied to a non-selector operand
    ///
    /// # Examples
    /// ```text
    /// !($>0)
    /// -len($)
    /// ```
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Built-in function call
    ///
    /// # Examples
    /// ```text
    /// len($)
    /// regexp('^\w+$')
    /// in($, 'a', 'b')
    /// ```
    Call { func: Function, args: Vec<Expr> },
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
