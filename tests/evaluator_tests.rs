// tests/evaluator_tests.rs

use std::collections::HashMap;

use serde_json::json;
use tagexpr::{Evaluator, Reflect, Value, parse_expr};

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Inner {
        pub g: i32,
        pub label: String,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Sample {
        pub a: i64,
        pub f: f64,
        pub ok: bool,
        pub name: String,
        pub list: Vec<i64>,
        pub tags: HashMap<String, String>,
        pub inner: Option<Inner>,
        pub boxed: Option<Box<Inner>>,
    }
}

fn sample() -> Sample {
    Sample {
        a: 50,
        f: -3.5,
        ok: true,
        name: "héllo".to_string(),
        list: vec![10, 20, 30],
        tags: HashMap::from([("k".to_string(), "v".to_string()), ("7".to_string(), "seven".to_string())]),
        inner: Some(Inner {
            g: 4,
            label: "in".to_string(),
        }),
        boxed: None,
    }
}

fn eval_on<'a>(root: &'a dyn Reflect, text: &str, current: &str) -> Value<'a> {
    let expr = parse_expr(text).unwrap();
    Evaluator::new(root).eval_expr(&expr, current)
}

// ============================================================================
// Selectors
// ============================================================================

#[test]
fn test_relative_and_absolute_selectors() {
    let s = sample();
    assert_eq!(eval_on(&s, "$", "a"), Value::Float(50.0));
    assert_eq!(eval_on(&s, "$", "inner.g"), Value::Float(4.0));
    assert_eq!(eval_on(&s, "(a)$", "inner.g"), Value::Float(50.0));
    assert_eq!(eval_on(&s, "(inner.label)$", ""), Value::from("in"));
    assert_eq!(eval_on(&s, "(missing)$", "a"), Value::Null);
    assert_eq!(eval_on(&s, "(boxed.g)$", "a"), Value::Null);
}

#[test]
fn test_float_negation() {
    let s = sample();
    assert_eq!(eval_on(&s, "$", "f"), Value::Float(-3.5));
    assert_eq!(eval_on(&s, "-$", "f"), Value::Float(3.5));
    assert_eq!(eval_on(&s, "--$", "f"), Value::Float(-3.5));
    assert_eq!(eval_on(&s, "---$", "f"), Value::Float(3.5));
    // non-numeric values lose their value on the float path
    assert_eq!(eval_on(&s, "-$", "name"), Value::Null);
    assert_eq!(eval_on(&s, "--$", "ok"), Value::Null);
    assert_eq!(eval_on(&s, "-(missing)$", ""), Value::Null);
}

#[test]
fn test_bool_negation() {
    let s = sample();
    assert_eq!(eval_on(&s, "$", "ok"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "!$", "ok"), Value::Boolean(false));
    assert_eq!(eval_on(&s, "!!$", "ok"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "!!$", "a"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "!$", "boxed"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "!!(missing)$", ""), Value::Boolean(false));
}

#[test]
fn test_plus_prefix_passes_through() {
    let s = sample();
    assert_eq!(eval_on(&s, "+$", "f"), Value::Float(-3.5));
    assert_eq!(eval_on(&s, "+$", "name"), Value::from("héllo"));
}

#[test]
fn test_composite_fields_pass_through() {
    let s = sample();
    assert!(matches!(eval_on(&s, "$", "list"), Value::Opaque(_)));
    assert!(matches!(eval_on(&s, "$", "inner"), Value::Opaque(_)));
    assert_eq!(eval_on(&s, "$", "boxed"), Value::Null);
}

#[test]
fn test_sub_selectors_index_value() {
    let s = sample();
    assert_eq!(eval_on(&s, "(list)$[1]", ""), Value::Float(20.0));
    assert_eq!(eval_on(&s, "(list)$[(inner.g)$-2]", ""), Value::Float(30.0));
    assert_eq!(eval_on(&s, "(list)$[9]", ""), Value::Null);
    assert_eq!(eval_on(&s, "$['k']", "tags"), Value::from("v"));
    assert_eq!(eval_on(&s, "$[7]", "tags"), Value::from("seven"));
    assert_eq!(eval_on(&s, "(inner)$['label']", ""), Value::from("in"));
    assert_eq!(eval_on(&s, "(inner)$[0]", ""), Value::Float(4.0));
    assert_eq!(eval_on(&s, "-(list)$[0]", ""), Value::Float(-10.0));
}

#[test]
fn test_selectors_on_json() {
    let doc = json!({"a": {"b": [1, {"c": "x"}]}, "n": null});
    assert_eq!(eval_on(&doc, "(a.b.1.c)$", ""), Value::from("x"));
    assert_eq!(eval_on(&doc, "(a.b)$[0]", ""), Value::Float(1.0));
    assert_eq!(eval_on(&doc, "$", "n"), Value::Null);
    assert_eq!(eval_on(&doc, "len($)", "a.b"), Value::Float(2.0));
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_arithmetic() {
    let s = sample();
    assert_eq!(eval_on(&s, "$+1", "a"), Value::Float(51.0));
    assert_eq!(eval_on(&s, "$-1*2", "a"), Value::Float(48.0));
    assert_eq!(eval_on(&s, "($-1)*2", "a"), Value::Float(98.0));
    assert_eq!(eval_on(&s, "$/4", "a"), Value::Float(12.5));
    assert_eq!(eval_on(&s, "$%7", "a"), Value::Float(1.0));
    assert_eq!(eval_on(&s, "$/0", "a"), Value::Null);
    assert_eq!(eval_on(&s, "$%0", "a"), Value::Null);
    assert_eq!(eval_on(&s, "$+'x'", "a"), Value::Null);
    assert_eq!(eval_on(&s, "$+'!'", "name"), Value::from("héllo!"));
}

#[test]
fn test_comparisons() {
    let s = sample();
    assert_eq!(eval_on(&s, "$>=50", "a"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "$<50", "a"), Value::Boolean(false));
    assert_eq!(eval_on(&s, "'abc'<'abd'", ""), Value::Boolean(true));
    assert_eq!(eval_on(&s, "$<'x'", "a"), Value::Null);
    assert_eq!(eval_on(&s, "$==50", "a"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "$=='50'", "a"), Value::Boolean(false));
    assert_eq!(eval_on(&s, "$!=nil", "a"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "(boxed)$==nil", ""), Value::Boolean(true));
}

#[test]
fn test_logical_and_bitwise() {
    let s = sample();
    assert_eq!(eval_on(&s, "$&&(a)$>0", "ok"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "!$||(missing)$", "ok"), Value::Boolean(false));
    assert_eq!(eval_on(&s, "$ && 'text'", "ok"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "6&3", ""), Value::Float(2.0));
    assert_eq!(eval_on(&s, "6|3", ""), Value::Float(7.0));
    assert_eq!(eval_on(&s, "true&false", ""), Value::Boolean(false));
    assert_eq!(eval_on(&s, "true|false", ""), Value::Boolean(true));
    assert_eq!(eval_on(&s, "1&true", ""), Value::Null);
}

#[test]
fn test_unary() {
    let s = sample();
    assert_eq!(eval_on(&s, "!($>100)", "a"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "-($+1)", "a"), Value::Float(-51.0));
    assert_eq!(eval_on(&s, "-'x'", ""), Value::Null);
}

#[test]
fn test_precedence_scenario() {
    let expr = parse_expr("$<0||$>=100").unwrap();
    for (a, expected) in [(50, false), (150, true), (-10, true), (100, true), (0, false)] {
        let s = Sample { a, ..Sample::default() };
        let got = Evaluator::new(&s).eval_expr(&expr, "a");
        assert_eq!(got, Value::Boolean(expected), "a = {}", a);
    }
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_len_and_mblen() {
    let s = sample();
    assert_eq!(eval_on(&s, "len($)", "name"), Value::Float(6.0));
    assert_eq!(eval_on(&s, "mblen($)", "name"), Value::Float(5.0));
    assert_eq!(eval_on(&s, "len($)", "list"), Value::Float(3.0));
    assert_eq!(eval_on(&s, "len($)", "tags"), Value::Float(2.0));
    assert_eq!(eval_on(&s, "len($)", "a"), Value::Null);
}

#[test]
fn test_regexp() {
    let s = sample();
    assert_eq!(eval_on(&s, "regexp('^h')", "name"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "regexp('^x')", "name"), Value::Boolean(false));
    assert_eq!(eval_on(&s, r"regexp('^\w+$', (inner.label)$)", "a"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "regexp('5')", "a"), Value::Boolean(false));
}

#[test]
fn test_in() {
    let s = sample();
    assert_eq!(eval_on(&s, "in($, 10, 50)", "a"), Value::Boolean(true));
    assert_eq!(eval_on(&s, "in($, '50')", "a"), Value::Boolean(false));
    assert_eq!(eval_on(&s, "in($)", "a"), Value::Boolean(false));
}

#[test]
fn test_sprintf() {
    let s = sample();
    assert_eq!(
        eval_on(&s, "sprintf('%s is %d (%v)', (inner.label)$, $, $>0)", "a"),
        Value::from("in is 50 (true)")
    );
    assert_eq!(eval_on(&s, "sprintf($)", "a"), Value::Null);
}
