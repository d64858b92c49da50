use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::functions::Pattern;
use crate::ast::{BinOp, DEFAULT_EXPR_NAME, Expr, Function, Selector, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{Lexer, Prefix, RawSelector, split_top_level};

static SEGMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("segment name pattern is valid")
});

/// Operator spellings, longest first.
const OPERATORS: &[(&str, BinOp)] = &[
    ("&&", BinOp::And),
    ("||", BinOp::Or),
    ("==", BinOp::Equal),
    ("!=", BinOp::NotEqual),
    ("<=", BinOp::LessEqual),
    (">=", BinOp::GreaterEqual),
    ("<", BinOp::LessThan),
    (">", BinOp::GreaterThan),
    ("&", BinOp::BitAnd),
    ("|", BinOp::BitOr),
    ("+", BinOp::Add),
    ("-", BinOp::Subtract),
    ("*", BinOp::Multiply),
    ("/", BinOp::Divide),
    ("%", BinOp::Modulo),
];

/// Parses one expression.
///
/// Operands and operators are read left to right into a chain, which
/// [`sort_priority`] then re-roots. Parenthesised groups, selector brackets
/// and function arguments are handed to a fresh parser over their inner text,
/// so each is sorted on its own.
pub struct Parser<'s> {
    lexer: Lexer<'s>,
}

impl<'s> Parser<'s> {
    pub fn new(input: &'s str) -> Self {
        Parser {
            lexer: Lexer::new(input),
        }
    }

    pub fn parse(mut self) -> Result<Expr, ParseError> {
        self.lexer.skip_whitespace();
        if self.lexer.is_eof() {
            return Err(ParseError::Empty);
        }

        let mut expr = self.parse_operand()?;
        loop {
            self.lexer.skip_whitespace();
            if self.lexer.is_eof() {
                break;
            }
            let op = self.parse_operator()?;
            let right = self.parse_operand()?;
            expr = Expr::binary(op, expr, right);
        }

        Ok(sort_priority(expr))
    }

    fn parse_operator(&mut self) -> Result<BinOp, ParseError> {
        for (symbol, op) in OPERATORS {
            if self.lexer.eat(symbol) {
                return Ok(*op);
            }
        }
        Err(self.lexer.unexpected())
    }

    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        self.lexer.skip_whitespace();

        if let Some(raw) = self.lexer.read_selector()? {
            return selector_from_raw(raw).map(Expr::Selector);
        }

        match self.lexer.current_char() {
            None => Err(self.lexer.unexpected()),
            Some('(') => {
                let inner = self.lexer.read_paired('(', ')')?;
                Ok(Expr::Group(Box::new(Parser::new(inner).parse()?)))
            }
            Some(quote @ ('\'' | '"')) => self.lexer.read_string(quote).map(Expr::String),
            Some(ch) if ch.is_ascii_digit() => self.lexer.read_number().map(Expr::Float),
            Some('-') => {
                self.lexer.advance();
                if self.lexer.current_char().is_some_and(|c| c.is_ascii_digit()) {
                    return self.lexer.read_number().map(|n| Expr::Float(-n));
                }
                let operand = self.parse_operand()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(operand),
                })
            }
            Some('!') => {
                self.lexer.advance();
                let operand = self.parse_operand()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let start = self.lexer.position();
                let ident = self.lexer.read_identifier();
                match ident {
                    "true" => Ok(Expr::Boolean(true)),
                    "false" => Ok(Expr::Boolean(false)),
                    "nil" | "null" => Ok(Expr::Nil),
                    name => {
                        self.lexer.skip_whitespace();
                        if self.lexer.current_char() != Some('(') {
                            return Err(ParseError::UnexpectedChar {
                                expr: self.lexer.input().to_string(),
                                offset: start,
                                found: ch,
                            });
                        }
                        let args = self.lexer.read_paired('(', ')')?;
                        parse_call(name, args)
                    }
                }
            }
            Some(_) => Err(self.lexer.unexpected()),
        }
    }
}

fn selector_from_raw(raw: RawSelector<'_>) -> Result<Selector, ParseError> {
    let sub_selectors = raw
        .brackets
        .iter()
        .map(|text| Parser::new(text).parse())
        .collect::<Result<Vec<_>, _>>()?;

    let (bool_negation, float_negation) = match raw.prefix {
        Prefix::Not(count) => (Some(count % 2 == 1), None),
        Prefix::Negate(count) => (None, Some(count % 2 == 1)),
        Prefix::None | Prefix::Plus(_) => (None, None),
    };

    Ok(Selector {
        field: raw.field.to_string(),
        sub_selectors,
        bool_negation,
        float_negation,
    })
}

fn parse_call(name: &str, args_text: &str) -> Result<Expr, ParseError> {
    let mut args = if args_text.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(args_text, ',')
            .into_iter()
            .map(|arg| Parser::new(arg).parse())
            .collect::<Result<Vec<_>, _>>()?
    };

    let found = args.len();
    let func = match name {
        "len" => {
            check_arity("len", "1", found == 1, found)?;
            Function::Len
        }
        "mblen" => {
            check_arity("mblen", "1", found == 1, found)?;
            Function::MbLen
        }
        "in" => {
            check_arity("in", "at least 1", found >= 1, found)?;
            Function::In
        }
        "sprintf" => {
            check_arity("sprintf", "at least 1", found >= 1, found)?;
            Function::Sprintf
        }
        "regexp" => {
            check_arity("regexp", "1 or 2", (1..=2).contains(&found), found)?;
            let Expr::String(pattern) = args.remove(0) else {
                return Err(ParseError::PatternNotLiteral);
            };
            let regex = Regex::new(&pattern).map_err(|e| ParseError::InvalidRegex {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            Function::Regexp(Pattern::new(regex))
        }
        other => return Err(ParseError::UnknownFunction(other.to_string())),
    };

    Ok(Expr::Call { func, args })
}

fn check_arity(
    name: &'static str,
    expected: &'static str,
    ok: bool,
    found: usize,
) -> Result<(), ParseError> {
    if ok {
        Ok(())
    } else {
        Err(ParseError::Arity {
            name,
            expected,
            found,
        })
    }
}

/// Re-roots a left-to-right chain so that tighter operators sit deeper.
///
/// `e(l(LL, LR), R)` becomes `l(LL, e(LR, R))` whenever `l` binds looser
/// than `e`; equal precedence stays left-associative. Groups are opaque.
pub fn sort_priority(expr: Expr) -> Expr {
    match expr {
        Expr::BinaryOp { op, left, right } => rotate(op, sort_priority(*left), *right),
        other => other,
    }
}

fn rotate(op: BinOp, left: Expr, right: Expr) -> Expr {
    match left {
        Expr::BinaryOp {
            op: inner,
            left: ll,
            right: lr,
        } if inner.precedence() < op.precedence() => {
            Expr::binary(inner, *ll, rotate(op, *lr, right))
        }
        left => Expr::binary(op, left, right),
    }
}

/// Parses a standalone expression.
pub fn parse_expr(text: &str) -> Result<Expr, ParseError> {
    Parser::new(text).parse()
}

/// One `name:expr` (or bare `expr`) piece of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSegment {
    pub name: String,
    pub text: String,
}

/// Splits tag text on top-level `;`. A segment without a `name:` prefix gets
/// the default expression name. Blank segments are dropped.
pub fn parse_tag(tag: &str) -> Vec<TagSegment> {
    split_top_level(tag, ';')
        .into_iter()
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            let segment = match SEGMENT_NAME.captures(segment) {
                Some(caps) => {
                    let whole = caps.get(0).map_or(0, |m| m.end());
                    TagSegment {
                        name: caps[1].to_string(),
                        text: segment[whole..].trim().to_string(),
                    }
                }
                None => TagSegment {
                    name: DEFAULT_EXPR_NAME.to_string(),
                    text: segment.trim().to_string(),
                },
            };
            trace!("tag segment {:?} => {:?}", segment.name, segment.text);
            segment
        })
        .collect()
}
