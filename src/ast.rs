//! # Tag Expression Language - Abstract Syntax Tree
//!
//! Expressions live in struct field tags and are parsed once, when a struct
//! type is first registered. The resulting trees are immutable and shared by
//! every evaluation against instances of that type.
//!
//! ## Architecture Overview
//!
//! - **[expressions]** - Expression nodes (selectors, literals, groups, operators, calls)
//! - **[operators]** - Binary and unary operators with their precedence
//! - **[selector]** - The `$` selector node and `field@name` addressing
//! - **[functions]** - Built-in functions
//!
//! ## Quick Start
//!
//! ```text
//! $<0||$>=100
//! ```
//!
//! `$` is the value of the field the tag is declared on. The expression is
//! true when that value is negative or at least 100.
//!
//! ## Selectors
//!
//! ```text
//! $              // the current field
//! (a.b)$         // absolute path from the struct root
//! $[0]           // index into the current field
//! (m)$['key']    // map lookup
//! !$  !!$        // boolean coercion, negated when the count of `!` is odd
//! -$  --$        // numeric negation, negated when the count of `-` is odd
//! ```
//!
//! ## Named Expressions
//!
//! A tag may hold several `;`-separated expressions. The unnamed one is
//! the default; the others are addressed as `field@name`:
//!
//! ```text
//! $>0;msg:'must be positive'
//! ```
pub mod expressions;
pub mod functions;
pub mod operators;
pub mod selector;

pub use expressions::Expr;
pub use functions::Function;
pub use operators::{BinOp, UnaryOp};
pub use selector::{DEFAULT_EXPR_NAME, EXPR_NAME_SEPARATOR, ExprSelector, Selector};
