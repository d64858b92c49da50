pub mod access;
pub mod ast;
pub mod binding;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod reflect;
pub mod registry;
pub mod validator;
pub mod value;
pub mod vm;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, ExprSelector, Selector, UnaryOp};
pub use binding::{BindError, Binder, BinderConfig, ParamSource};
pub use error::{CoerceError, ParseError, TagExprError};
pub use evaluator::Evaluator;
pub use lexer::{Lexer, find_selector};
pub use output::to_json;
pub use parser::{Parser, parse_expr, parse_tag};
pub use reflect::{Described, Kind, Reflect, StructDesc};
pub use registry::{StructMeta, TypeCache};
pub use validator::{CustomError, ERR_MSG_EXPR_NAME, ValidateError, ValidationError, Validator};
pub use value::Value;
pub use vm::{TagExpr, Vm};
