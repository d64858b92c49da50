// tests/validator_tests.rs

use std::collections::BTreeMap;

use serde_json::json;
use tagexpr::{StructMeta, TagExprError, ValidateError, ValidationError, Validator};

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Item {
        #[tag(vd = "len($)>0;msg:sprintf('item %v needs a name', (id)$)")]
        pub name: String,
        pub id: u32,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Address {
        #[tag(vd = "len($)>0")]
        pub street: String,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Order {
        #[tag(vd = "$>0;msg:'quantity must be positive'")]
        pub quantity: i64,
        pub items: Vec<Item>,
        pub extras: BTreeMap<String, Item>,
        pub shipping: Option<Address>,
        pub notes: Vec<String>,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Link {
        #[tag(vd = "$>0")]
        pub id: u32,
        pub next: Option<Box<Link>>,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Hinted {
        #[tag(vd = "$!='';msg:'unused';hint:'code is required'")]
        pub code: String,
        #[tag(vd = "$;msg:1")]
        pub agreed: bool,
    }
}

tagexpr::tagged! {
    #[derive(Debug, Default)]
    pub struct Malformed {
        #[tag(vd = "len(")]
        pub name: String,
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("{path}: {msg}")]
pub struct Rejected {
    pub path: String,
    pub msg: String,
}

fn item(name: &str, id: u32) -> Item {
    Item {
        name: name.to_string(),
        id,
    }
}

fn order() -> Order {
    Order {
        quantity: 1,
        items: vec![item("pen", 1)],
        shipping: Some(Address {
            street: "Main St".to_string(),
        }),
        ..Default::default()
    }
}

fn invalid(err: ValidateError) -> ValidationError {
    match err {
        ValidateError::Invalid(err) => err,
        other => panic!("expected a validation failure, got {}", other),
    }
}

// ============================================================================
// Struct fields
// ============================================================================

#[test]
fn test_valid_struct() {
    let validator = Validator::new("vd");
    assert_eq!(validator.validate(&order()), Ok(()));
}

#[test]
fn test_message_expression() {
    let validator = Validator::new("vd");
    let value = Order {
        quantity: 0,
        ..order()
    };
    let err = invalid(validator.validate(&value).unwrap_err());
    assert_eq!(err.fail_path, "quantity");
    assert_eq!(err.msg, "quantity must be positive");
    assert_eq!(err.to_string(), "quantity must be positive");
}

#[test]
fn test_default_message() {
    let validator = Validator::new("vd");
    let value = Order {
        shipping: Some(Address::default()),
        ..order()
    };
    let err = invalid(validator.validate(&value).unwrap_err());
    assert_eq!(err.fail_path, "shipping.street");
    assert_eq!(err.msg, "");
    assert_eq!(err.to_string(), "invalid parameter: shipping.street");
}

#[test]
fn test_non_string_message_is_ignored() {
    let validator = Validator::new("vd");
    let value = Hinted {
        code: "x".to_string(),
        agreed: false,
    };
    let err = invalid(validator.validate(&value).unwrap_err());
    assert_eq!(err.to_string(), "invalid parameter: agreed");
}

#[test]
fn test_custom_message_name() {
    let validator = Validator::new("vd").with_msg_name("hint");
    let err = invalid(validator.validate(&Hinted::default()).unwrap_err());
    assert_eq!(err.fail_path, "code");
    assert_eq!(err.msg, "code is required");
}

#[test]
fn test_first_failure_wins() {
    let validator = Validator::new("vd");
    let value = Order {
        quantity: -1,
        items: vec![item("", 7)],
        ..order()
    };
    let err = invalid(validator.validate(&value).unwrap_err());
    assert_eq!(err.fail_path, "quantity");
}

#[test]
fn test_error_factory() {
    let validator = Validator::new("vd").with_error_factory(|path, msg| Rejected {
        path: path.to_string(),
        msg: msg.to_string(),
    });
    let value = Order {
        items: vec![item("pen", 1), item("", 2)],
        ..order()
    };
    let err = validator.validate(&value).unwrap_err();
    assert_eq!(err.to_string(), "items/1/name: item 2 needs a name");
    match err {
        ValidateError::Custom(custom) => assert_eq!(
            custom.downcast_ref::<Rejected>(),
            Some(&Rejected {
                path: "items/1/name".to_string(),
                msg: "item 2 needs a name".to_string(),
            })
        ),
        other => panic!("expected a custom error, got {:?}", other),
    }

    assert_eq!(validator.validate(&order()), Ok(()));
}

#[test]
fn test_error_factory_reset() {
    let validator = Validator::new("vd")
        .with_error_factory(|path, _| Rejected {
            path: path.to_string(),
            msg: String::new(),
        })
        .with_default_errors();
    let err = invalid(validator.validate(&Hinted::default()).unwrap_err());
    assert_eq!(err.fail_path, "code");
    assert_eq!(err.msg, "unused");
}

// ============================================================================
// Sequences and maps
// ============================================================================

#[test]
fn test_sequence_elements_in_ascending_order() {
    let validator = Validator::new("vd");
    let value = Order {
        items: vec![item("pen", 1), item("", 2), item("", 3)],
        ..order()
    };
    let err = invalid(validator.validate(&value).unwrap_err());
    assert_eq!(err.fail_path, "items/1/name");
    assert_eq!(err.msg, "item 2 needs a name");
}

#[test]
fn test_map_values() {
    let validator = Validator::new("vd");
    let value = Order {
        extras: BTreeMap::from([
            ("bag".to_string(), item("bag", 8)),
            ("gift".to_string(), item("", 9)),
        ]),
        ..order()
    };
    let err = invalid(validator.validate(&value).unwrap_err());
    assert_eq!(err.fail_path, "extras/gift/name");
    assert_eq!(err.msg, "item 9 needs a name");
}

#[test]
fn test_top_level_sequence() {
    let validator = Validator::new("vd");
    let items = vec![item("a", 1), item("", 2)];
    let err = invalid(validator.validate(&items).unwrap_err());
    assert_eq!(err.fail_path, "1/name");

    let nested = vec![vec![item("a", 1)], vec![item("", 5)]];
    let err = invalid(validator.validate(&nested).unwrap_err());
    assert_eq!(err.fail_path, "1/0/name");
}

#[test]
fn test_recursive_struct() {
    let validator = Validator::new("vd");
    let value = Link {
        id: 1,
        next: Some(Box::new(Link {
            id: 2,
            next: Some(Box::new(Link { id: 0, next: None })),
        })),
    };
    let err = invalid(validator.validate(&value).unwrap_err());
    assert_eq!(err.fail_path, "next/next/id");
}

// ============================================================================
// Other inputs
// ============================================================================

#[test]
fn test_values_without_structs() {
    let validator = Validator::new("vd");
    assert_eq!(validator.validate(&5i32), Ok(()));
    assert_eq!(validator.validate(&None::<Order>), Ok(()));
    assert_eq!(validator.validate(&vec![1, 2, 3]), Ok(()));
}

#[test]
fn test_registration_error() {
    let validator = Validator::new("vd");
    let err = validator.validate(&Malformed::default()).unwrap_err();
    assert!(matches!(
        err,
        ValidateError::Registration(TagExprError::Parse { .. })
    ));
}

#[test]
fn test_validate_with_compiled_tags() {
    let validator = Validator::new("cli");
    let meta = StructMeta::from_tags("doc", [("age", "$>=18;msg:'too young'"), ("name", "len($)>0")]).unwrap();

    assert_eq!(validator.validate_with(&meta, &json!({"age": 21, "name": "x"})), Ok(()));

    let err = invalid(
        validator
            .validate_with(&meta, &json!({"age": 12, "name": "x"}))
            .unwrap_err(),
    );
    assert_eq!(err.msg, "too young");

    let err = invalid(validator.validate_with(&meta, &json!({"age": 30})).unwrap_err());
    assert_eq!(err.fail_path, "name");
}
