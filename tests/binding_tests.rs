// tests/binding_tests.rs

use std::collections::HashMap;

use tagexpr::{BindError, Binder, BinderConfig, CoerceError, TagExprError};

tagexpr::tagged! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Filter {
        #[tag(param = "min", default = "5")]
        pub min: i32,
        #[tag(param = "kind", default = "['a','it\\'s']")]
        pub kinds: Vec<String>,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Query {
        #[tag(param = "id,required")]
        pub id: u64,
        #[tag(param = "q", default = "anonymous")]
        pub name: String,
        #[tag(param = "")]
        pub page: u32,
        #[tag(param = "tag")]
        pub tags: Vec<String>,
        #[tag(param = "verbose")]
        pub verbose: bool,
        #[tag(default = "[1, 2]")]
        pub ids: Vec<i64>,
        pub filter: Option<Filter>,
        pub untouched: String,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct BadDefault {
        #[tag(default = "true")]
        pub n: i32,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct BadSyntax {
        #[tag(default = "'x'")]
        pub n: i32,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Renamed {
        #[tag(query = "limit,required", fallback = "10")]
        pub limit: u16,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Page {
        #[tag(param = "size")]
        pub size: u32,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Listing {
        #[tag(param = "q")]
        pub q: String,
        pub page: Option<Page>,
        #[tag(param = "token,required")]
        pub token: String,
    }
}

fn params(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_bind_parameters() {
    let binder = Binder::default();
    let source = params(&[
        ("id", &["42"]),
        ("q", &["rust"]),
        ("page", &["3"]),
        ("tag", &["a", "b"]),
        ("verbose", &["T"]),
    ]);
    let mut query = Query::default();
    binder.bind(&mut query, &source).unwrap();

    assert_eq!(query.id, 42);
    assert_eq!(query.name, "rust");
    assert_eq!(query.page, 3);
    assert_eq!(query.tags, ["a", "b"]);
    assert!(query.verbose);
    assert_eq!(query.untouched, "");
}

#[test]
fn test_defaults_apply_when_absent() {
    let binder = Binder::default();
    let mut query = Query::default();
    binder.bind(&mut query, &params(&[("id", &["1"])])).unwrap();

    assert_eq!(query.name, "anonymous");
    assert_eq!(query.page, 0);
    assert_eq!(query.ids, [1, 2]);
    assert_eq!(
        query.filter,
        Some(Filter {
            min: 5,
            kinds: vec!["a".to_string(), "it's".to_string()],
        })
    );
}

#[test]
fn test_nested_parameters_initialise_pointer() {
    let binder = Binder::default();
    let source = params(&[("id", &["1"]), ("min", &["-3"]), ("kind", &["x"])]);
    let mut query = Query::default();
    binder.bind(&mut query, &source).unwrap();

    let filter = query.filter.unwrap();
    assert_eq!(filter.min, -3);
    assert_eq!(filter.kinds, ["x"]);
}

#[test]
fn test_single_value_source() {
    let binder = Binder::default();
    let source = HashMap::from([
        ("id".to_string(), "7".to_string()),
        ("tag".to_string(), "only".to_string()),
    ]);
    let mut query = Query::default();
    binder.bind(&mut query, &source).unwrap();
    assert_eq!(query.id, 7);
    assert_eq!(query.tags, ["only"]);
}

#[test]
fn test_unbound_nested_pointer_stays_nil() {
    let binder = Binder::default();
    let mut listing = Listing::default();
    binder
        .bind(&mut listing, &params(&[("token", &["t"])]))
        .unwrap();
    assert_eq!(listing.page, None);

    binder
        .bind(&mut listing, &params(&[("token", &["t"]), ("size", &["20"])]))
        .unwrap();
    assert_eq!(listing.page, Some(Page { size: 20 }));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_required_parameter_missing() {
    let binder = Binder::default();
    let mut query = Query::default();
    let err = binder.bind(&mut query, &params(&[("q", &["x"])])).unwrap_err();
    assert!(matches!(err, BindError::Required(ref name) if name == "id"));
    assert_eq!(err.to_string(), "missing required parameter 'id'");

    let err = binder.bind(&mut query, &params(&[("id", &[])])).unwrap_err();
    assert!(matches!(err, BindError::Required(_)));
}

#[test]
fn test_missing_required_writes_nothing() {
    let binder = Binder::default();
    let mut listing = Listing::default();
    let err = binder
        .bind(&mut listing, &params(&[("q", &["books"]), ("size", &["5"])]))
        .unwrap_err();
    assert!(matches!(err, BindError::Required(ref name) if name == "token"));
    assert_eq!(listing.q, "");
    assert_eq!(listing.page, None);
}

#[test]
fn test_type_mismatch() {
    let binder = Binder::default();
    let mut query = Query::default();
    let err = binder
        .bind(&mut query, &params(&[("id", &["abc"])]))
        .unwrap_err();
    match err {
        BindError::TypeMismatch { field, source } => {
            assert_eq!(field, "id");
            assert_eq!(
                source,
                CoerceError::Parse {
                    expected: "u64",
                    text: "abc".to_string(),
                }
            );
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_loose_zero_mode() {
    let source = params(&[("id", &["1"]), ("page", &[""]), ("verbose", &[""])]);

    let strict = Binder::default();
    let err = strict.bind(&mut Query::default(), &source).unwrap_err();
    assert!(matches!(err, BindError::TypeMismatch { ref field, .. } if field == "page"));

    let loose = Binder::new(BinderConfig {
        loose_zero_mode: true,
        ..BinderConfig::default()
    });
    let mut query = Query {
        page: 9,
        verbose: true,
        ..Default::default()
    };
    loose.bind(&mut query, &source).unwrap();
    assert_eq!(query.page, 0);
    assert!(!query.verbose);
}

#[test]
fn test_invalid_defaults() {
    let binder = Binder::default();
    let err = binder
        .bind(&mut BadDefault::default(), &params(&[]))
        .unwrap_err();
    assert!(matches!(err, BindError::InvalidDefault { ref field, .. } if field == "n"));

    let err = binder
        .bind(&mut BadSyntax::default(), &params(&[]))
        .unwrap_err();
    assert!(matches!(err, BindError::DefaultSyntax { .. }));
}

#[test]
fn test_not_a_struct() {
    let binder = Binder::default();
    let err = binder.bind(&mut 5i32, &params(&[])).unwrap_err();
    assert!(matches!(err, BindError::Registration(TagExprError::NotAStruct(_))));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_custom_tag_names() {
    let binder = Binder::new(BinderConfig {
        param_tag: "query".to_string(),
        default_tag: "fallback".to_string(),
        loose_zero_mode: false,
    });
    assert_eq!(binder.config().param_tag, "query");

    let mut value = Renamed::default();
    binder.bind(&mut value, &params(&[("limit", &["25"])])).unwrap();
    assert_eq!(value.limit, 25);

    let mut value = Renamed::default();
    binder.bind(&mut value, &params(&[])).unwrap();
    assert_eq!(value.limit, 10);

    // the default binder ignores these tags
    let mut value = Renamed::default();
    Binder::default().bind(&mut value, &params(&[])).unwrap();
    assert_eq!(value.limit, 0);
}
