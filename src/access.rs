//! Field resolution over [`Reflect`] values.
//!
//! Paths are dot-separated. Each segment names a struct field, a map key or a
//! sequence index, and `Option`/`Box` layers are looked through on the way.
//! A path that does not exist on the runtime value is simply `None`.

use crate::reflect::{Reflect, View, ViewMut};
use crate::value::Value;

/// Resolves `path` from `root`. The empty path is the root itself.
pub fn resolve<'a>(root: &'a dyn Reflect, path: &str) -> Option<&'a dyn Reflect> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, step)
}

fn step<'a>(node: &'a dyn Reflect, segment: &str) -> Option<&'a dyn Reflect> {
    match deref(node)?.view() {
        View::Struct(s) => s.field(segment),
        View::Map(m) => m.get(segment),
        View::Seq(s) => s.get(segment.parse().ok()?),
        _ => None,
    }
}

/// Follows pointers down to a concrete value; `None` for nil.
pub fn deref(node: &dyn Reflect) -> Option<&dyn Reflect> {
    match node.view() {
        View::Pointer(Some(inner)) => deref(inner),
        View::Pointer(None) | View::Nil => None,
        _ => Some(node),
    }
}

/// Indexes a resolved field by each key in turn.
///
/// Numbers index sequences, struct fields by declaration order and maps by
/// their integer key text. Strings index maps and struct fields by name.
pub fn index<'a>(node: &'a dyn Reflect, keys: &[Value<'_>]) -> Option<&'a dyn Reflect> {
    keys.iter().try_fold(node, |node, key| {
        let node = deref(node)?;
        match (node.view(), key) {
            (View::Seq(s), Value::Float(n)) => s.get(ordinal(*n)?),
            (View::Struct(s), Value::Float(n)) => s.field_at(ordinal(*n)?),
            (View::Struct(s), Value::String(name)) => s.field(name),
            (View::Map(m), key) => m.get(&key_text(key)?),
            _ => None,
        }
    })
}

fn ordinal(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64).then_some(n as usize)
}

/// Text used to look a value up as a map key.
pub fn key_text(key: &Value<'_>) -> Option<String> {
    match key {
        Value::String(s) => Some(s.to_string()),
        Value::Float(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Some((*n as i64).to_string()),
        Value::Float(n) => Some(n.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Null | Value::Opaque(_) => None,
    }
}

/// Resolves `path` for writing.
///
/// With `init_zero`, nil pointers met on the way are replaced by their zero
/// value so that the path always exists afterwards. The final field is
/// returned as declared, pointer included.
pub fn resolve_mut<'a>(
    root: &'a mut dyn Reflect,
    path: &str,
    init_zero: bool,
) -> Option<&'a mut dyn Reflect> {
    if path.is_empty() {
        return Some(root);
    }
    let mut node = root;
    for segment in path.split('.') {
        node = step_mut(deref_mut(node, init_zero)?, segment)?;
    }
    Some(node)
}

fn step_mut<'a>(node: &'a mut dyn Reflect, segment: &str) -> Option<&'a mut dyn Reflect> {
    match node.view_mut() {
        ViewMut::Struct(s) => s.field_mut(segment),
        ViewMut::Map(m) => m.get_mut(segment),
        ViewMut::Seq(s) => s.get_mut(segment.parse().ok()?),
        ViewMut::Leaf | ViewMut::Pointer(_) => None,
    }
}

fn deref_mut(node: &mut dyn Reflect, init_zero: bool) -> Option<&mut dyn Reflect> {
    if !matches!(node.view(), View::Pointer(_)) {
        return Some(node);
    }
    match node.view_mut() {
        ViewMut::Pointer(pointer) => {
            let inner = if init_zero {
                Some(pointer.get_or_init())
            } else {
                pointer.get_mut()
            };
            deref_mut(inner?, init_zero)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    crate::tagged! {
        #[derive(Debug, Default)]
        struct Leaf {
            n: i64,
        }
    }

    crate::tagged! {
        #[derive(Debug, Default)]
        struct Root {
            leaf: Option<Leaf>,
            list: Vec<Leaf>,
            map: BTreeMap<String, i64>,
        }
    }

    fn int(node: Option<&dyn Reflect>) -> Option<i64> {
        match node?.view() {
            View::Int(n) => Some(n),
            _ => None,
        }
    }

    #[test]
    fn test_resolve_paths() {
        let root = Root {
            leaf: Some(Leaf { n: 1 }),
            list: vec![Leaf { n: 2 }, Leaf { n: 3 }],
            map: BTreeMap::from([("k".to_string(), 4)]),
        };
        assert_eq!(int(resolve(&root, "leaf.n")), Some(1));
        assert_eq!(int(resolve(&root, "list.1.n")), Some(3));
        assert_eq!(int(resolve(&root, "map.k")), Some(4));
        assert!(resolve(&root, "list.7.n").is_none());
        assert!(resolve(&root, "missing").is_none());
    }

    #[test]
    fn test_resolve_through_nil_pointer() {
        let root = Root::default();
        assert!(resolve(&root, "leaf").is_some());
        assert!(resolve(&root, "leaf.n").is_none());
    }

    #[test]
    fn test_resolve_mut_initialises_pointers() {
        let mut root = Root::default();
        assert!(resolve_mut(&mut root, "leaf.n", false).is_none());

        let field = resolve_mut(&mut root, "leaf.n", true).unwrap();
        field.assign_strs(&["9"], false).unwrap();
        assert_eq!(root.leaf.map(|l| l.n), Some(9));
    }

    #[test]
    fn test_index_by_values() {
        let root = Root {
            list: vec![Leaf { n: 5 }],
            map: BTreeMap::from([("7".to_string(), 8)]),
            ..Default::default()
        };
        let list = resolve(&root, "list").unwrap();
        assert_eq!(int(index(list, &[Value::Float(0.0), Value::from("n")])), Some(5));
        assert_eq!(int(index(list, &[Value::Float(0.0), Value::Float(0.0)])), Some(5));
        assert!(index(list, &[Value::Float(0.5)]).is_none());

        let map = resolve(&root, "map").unwrap();
        assert_eq!(int(index(map, &[Value::Float(7.0)])), Some(8));
        assert!(index(map, &[Value::Null]).is_none());
    }
}
