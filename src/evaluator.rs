use std::borrow::Cow;

use crate::{
    access,
    ast::{BinOp, Expr, Function, Selector, UnaryOp},
    reflect::{Reflect, View},
    value::Value,
};

/// Evaluates expression trees against one struct instance.
///
/// Evaluation never fails: unresolved selectors and operands of the wrong
/// kind produce [`Value::Null`], which is falsy wherever a boolean is needed.
/// The evaluator only reads the instance, so one tree can be shared by any
/// number of evaluators across threads.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    /// The instance absolute selectors are resolved against
    root: &'a dyn Reflect,
}

impl<'a> Evaluator<'a> {
    pub fn new(root: &'a dyn Reflect) -> Self {
        Evaluator { root }
    }

    pub fn root(&self) -> &'a dyn Reflect {
        self.root
    }

    /// Evaluates `expr`; relative selectors (`$`) read `current_field`.
    pub fn eval_expr(&self, expr: &Expr, current_field: &str) -> Value<'a> {
        match expr {
            Expr::Selector(selector) => self.eval_selector(selector, current_field),
            Expr::Float(n) => Value::Float(*n),
            Expr::String(s) => Value::String(Cow::Owned(s.clone())),
            Expr::Boolean(b) => Value::Boolean(*b),
            Expr::Nil => Value::Null,
            Expr::Group(inner) => self.eval_expr(inner, current_field),
            Expr::Unary { op, operand } => apply_unary(*op, self.eval_expr(operand, current_field)),
            Expr::BinaryOp { op, left, right } => self.eval_binary(*op, left, right, current_field),
            Expr::Call { func, args } => self.call_function(func, args, current_field),
        }
    }

    /// Reads the value of the field at `path` without any expression.
    pub fn field(&self, path: &str) -> Value<'a> {
        access::resolve(self.root, path).map_or(Value::Null, Value::from_reflect)
    }

    fn eval_selector(&self, selector: &Selector, current_field: &str) -> Value<'a> {
        let keys: Vec<Value<'a>> = selector
            .sub_selectors
            .iter()
            .map(|sub| self.eval_expr(sub, current_field))
            .collect();

        let path = if selector.is_current() {
            current_field
        } else {
            selector.field.as_str()
        };

        let value = access::resolve(self.root, path)
            .and_then(|field| access::index(field, &keys))
            .map_or(Value::Null, Value::from_reflect);

        if let Some(odd) = selector.float_negation {
            return match value {
                Value::Float(n) if odd => Value::Float(-n),
                Value::Float(n) => Value::Float(n),
                _ => Value::Null,
            };
        }
        if let Some(odd) = selector.bool_negation {
            return Value::Boolean(value.as_bool() != odd);
        }
        value
    }

    fn eval_binary(&self, op: BinOp, left: &Expr, right: &Expr, current_field: &str) -> Value<'a> {
        match op {
            BinOp::And => {
                if !self.eval_expr(left, current_field).as_bool() {
                    return Value::Boolean(false);
                }
                Value::Boolean(self.eval_expr(right, current_field).as_bool())
            }
            BinOp::Or => {
                if self.eval_expr(left, current_field).as_bool() {
                    return Value::Boolean(true);
                }
                Value::Boolean(self.eval_expr(right, current_field).as_bool())
            }
            _ => {
                let left = self.eval_expr(left, current_field);
                let right = self.eval_expr(right, current_field);
                apply_binop(op, &left, &right)
            }
        }
    }

    // ========================================
    // Built-in Functions
    // ========================================

    fn call_function(&self, func: &Function, args: &[Expr], current_field: &str) -> Value<'a> {
        let mut values = args.iter().map(|arg| self.eval_expr(arg, current_field));

        match func {
            Function::Len => length(values.next().unwrap_or(Value::Null), |s| s.len()),
            Function::MbLen => length(values.next().unwrap_or(Value::Null), |s| s.chars().count()),
            Function::Regexp(pattern) => {
                let target = values
                    .next()
                    .unwrap_or_else(|| self.field(current_field));
                match target {
                    Value::String(s) => Value::Boolean(pattern.is_match(&s)),
                    _ => Value::Boolean(false),
                }
            }
            Function::In => {
                let Some(needle) = values.next() else {
                    return Value::Boolean(false);
                };
                Value::Boolean(values.any(|candidate| candidate == needle))
            }
            Function::Sprintf => match values.next() {
                Some(Value::String(format)) => {
                    let rest: Vec<Value<'a>> = values.collect();
                    Value::String(Cow::Owned(sprintf(&format, &rest)))
                }
                _ => Value::Null,
            },
        }
    }
}

/// Length of a string (measured by `measure`) or of a sequence or map.
fn length<'a>(value: Value<'a>, measure: fn(&str) -> usize) -> Value<'a> {
    match value {
        Value::String(s) => Value::Float(measure(&s) as f64),
        Value::Opaque(field) => match field.view() {
            View::Seq(seq) => Value::Float(seq.len() as f64),
            View::Map(map) => Value::Float(map.len() as f64),
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

/// Formats `%v %s %d %f %%`; a verb without an argument renders as
/// `%!v(MISSING)`.
fn sprintf(format: &str, args: &[Value<'_>]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let Some(verb) = chars.next() else {
            out.push('%');
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = args.next() else {
            out.push_str(&format!("%!{}(MISSING)", verb));
            continue;
        };
        match (verb, arg) {
            ('d', Value::Float(n)) => out.push_str(&(n.trunc() as i64).to_string()),
            ('f', Value::Float(n)) => out.push_str(&format!("{:.6}", n)),
            ('v' | 's' | 'd' | 'f', other) => out.push_str(&other.to_string()),
            (unknown, other) => out.push_str(&format!("%!{}({})", unknown, other)),
        }
    }
    out
}

// ========================================
// Operators
// ========================================

fn apply_unary<'a>(op: UnaryOp, value: Value<'a>) -> Value<'a> {
    match op {
        UnaryOp::Not => Value::Boolean(!value.as_bool()),
        UnaryOp::Negate => match value {
            Value::Float(n) => Value::Float(-n),
            _ => Value::Null,
        },
    }
}

/// Applies a non short-circuiting binary operator. Combinations that have no
/// meaning yield `Null`.
pub fn apply_binop<'a>(op: BinOp, left: &Value<'a>, right: &Value<'a>) -> Value<'a> {
    match op {
        BinOp::Add => match (left, right) {
            (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
            (Value::String(a), Value::String(b)) => Value::String(Cow::Owned(format!("{}{}", a, b))),
            _ => Value::Null,
        },
        BinOp::Subtract => arithmetic(left, right, |a, b| Some(a - b)),
        BinOp::Multiply => arithmetic(left, right, |a, b| Some(a * b)),
        BinOp::Divide => arithmetic(left, right, |a, b| (b != 0.0).then(|| a / b)),
        BinOp::Modulo => arithmetic(left, right, |a, b| {
            (a as i64).checked_rem(b as i64).map(|r| r as f64)
        }),

        BinOp::LessThan => compare(left, right, |o| o.is_lt()),
        BinOp::LessEqual => compare(left, right, |o| o.is_le()),
        BinOp::GreaterThan => compare(left, right, |o| o.is_gt()),
        BinOp::GreaterEqual => compare(left, right, |o| o.is_ge()),

        BinOp::Equal => Value::Boolean(left == right),
        BinOp::NotEqual => Value::Boolean(left != right),

        BinOp::BitAnd => bitwise(left, right, |a, b| a & b, |a, b| a && b),
        BinOp::BitOr => bitwise(left, right, |a, b| a | b, |a, b| a || b),

        BinOp::And => Value::Boolean(left.as_bool() && right.as_bool()),
        BinOp::Or => Value::Boolean(left.as_bool() || right.as_bool()),
    }
}

fn arithmetic<'a>(left: &Value<'_>, right: &Value<'_>, f: impl Fn(f64, f64) -> Option<f64>) -> Value<'a> {
    match (left, right) {
        (Value::Float(a), Value::Float(b)) => f(*a, *b).map_or(Value::Null, Value::Float),
        _ => Value::Null,
    }
}

fn compare<'a>(
    left: &Value<'_>,
    right: &Value<'_>,
    test: impl Fn(std::cmp::Ordering) -> bool,
) -> Value<'a> {
    let ordering = match (left, right) {
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    ordering.map_or(Value::Null, |o| Value::Boolean(test(o)))
}

fn bitwise<'a>(
    left: &Value<'_>,
    right: &Value<'_>,
    ints: impl Fn(i64, i64) -> i64,
    bools: impl Fn(bool, bool) -> bool,
) -> Value<'a> {
    match (left, right) {
        (Value::Float(a), Value::Float(b)) => Value::Float(ints(*a as i64, *b as i64) as f64),
        (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(bools(*a, *b)),
        _ => Value::Null,
    }
}

#[test]
fn test_modulo_truncates() {
    let v = apply_binop(BinOp::Modulo, &Value::Float(7.9), &Value::Float(2.2));
    assert_eq!(v, Value::Float(1.0));
    assert_eq!(
        apply_binop(BinOp::Modulo, &Value::Float(1.0), &Value::Float(0.5)),
        Value::Null
    );
}

#[test]
fn test_sprintf_verbs() {
    let args = [Value::Float(3.0), Value::from("x"), Value::Float(1.5)];
    assert_eq!(sprintf("%d-%s-%f 100%%", &args), "3-x-1.500000 100%");
    assert_eq!(sprintf("%v %v", &[Value::Boolean(true)]), "true %!v(MISSING)");
}
