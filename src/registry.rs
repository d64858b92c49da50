//! Per-type metadata: flattened fields and their parsed expressions.

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::ast::{Expr, ExprSelector};
use crate::error::TagExprError;
use crate::parser::{parse_expr, parse_tag};
use crate::reflect::{Kind, StructDesc};

/// Lazily built values keyed by type.
///
/// Readers take the shared lock. A miss builds the value outside any lock and
/// inserts it only if no other thread got there first, so a reader never sees
/// a half-built entry and every caller ends up with the same `Arc`.
pub struct TypeCache<V> {
    entries: RwLock<HashMap<TypeId, Arc<V>>>,
}

impl<V> TypeCache<V> {
    pub fn new() -> Self {
        TypeCache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: TypeId) -> Option<Arc<V>> {
        self.entries.read().get(&id).cloned()
    }

    pub fn get_or_try_insert_with<E>(
        &self,
        id: TypeId,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(found) = self.get(id) {
            return Ok(found);
        }

        let built = Arc::new(build()?);
        match self.entries.write().entry(id) {
            Entry::Occupied(existing) => {
                debug!("discarding duplicate metadata for {:?}", id);
                Ok(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => Ok(Arc::clone(slot.insert(built))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for TypeCache<V> {
    fn default() -> Self {
        TypeCache::new()
    }
}

/// A struct field reached from the root, nested structs flattened into
/// dotted paths.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub path: String,
    pub kind: Kind,
    pub tags: Vec<(&'static str, &'static str)>,
    /// A nested struct whose type already encloses it; its fields are not
    /// flattened
    pub recursive: bool,
}

impl FieldMeta {
    pub fn tag(&self, name: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(tag, _)| *tag == name)
            .map(|(_, text)| *text)
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
}

/// Every field of a type, depth first in declaration order.
///
/// Nested tagged structs (also behind `Option` or `Box`) are descended into.
/// A type already on the path is not entered again, which keeps recursive
/// types finite.
pub(crate) fn flatten(desc: &StructDesc) -> Vec<FieldMeta> {
    let mut fields = Vec::new();
    let mut stack = vec![desc.type_id];
    flatten_into(desc, "", &mut stack, &mut fields);
    fields
}

fn flatten_into(desc: &StructDesc, prefix: &str, stack: &mut Vec<TypeId>, out: &mut Vec<FieldMeta>) {
    for field in &desc.fields {
        let path = format!("{}{}", prefix, field.name);
        let nested = (field.nested)();
        let recursive = nested
            .as_ref()
            .is_some_and(|nested| stack.contains(&nested.type_id));
        out.push(FieldMeta {
            path: path.clone(),
            kind: field.kind,
            tags: field.tags.clone(),
            recursive,
        });

        if let Some(nested) = nested.filter(|_| !recursive) {
            stack.push(nested.type_id);
            flatten_into(&nested, &format!("{}.", path), stack, out);
            stack.pop();
        }
    }
}

/// The compiled expressions of one struct type.
#[derive(Debug, Clone)]
pub struct StructMeta {
    type_name: String,
    fields: Vec<FieldMeta>,
    exprs: Vec<(ExprSelector, Expr)>,
    index: HashMap<ExprSelector, usize>,
}

impl StructMeta {
    fn empty(type_name: impl Into<String>) -> Self {
        StructMeta {
            type_name: type_name.into(),
            fields: Vec::new(),
            exprs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Parses every `tag_name` tag of a struct and its nested structs.
    pub fn from_desc(desc: &StructDesc, tag_name: &str) -> Result<Self, TagExprError> {
        let mut meta = StructMeta::empty(desc.type_name);
        meta.fields = flatten(desc);

        let tagged: Vec<(String, &'static str)> = meta
            .fields
            .iter()
            .filter_map(|field| field.tag(tag_name).map(|tag| (field.path.clone(), tag)))
            .collect();
        for (path, tag) in tagged {
            meta.add_tag(&path, tag)?;
        }

        debug!(
            "registered {} ({} fields, {} expressions)",
            meta.type_name,
            meta.fields.len(),
            meta.exprs.len()
        );
        Ok(meta)
    }

    /// Builds metadata from `(field path, tag text)` pairs, for values
    /// without a static layout such as JSON documents.
    pub fn from_tags<I, P, T>(type_name: &str, tags: I) -> Result<Self, TagExprError>
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let mut meta = StructMeta::empty(type_name);
        for (path, tag) in tags {
            let path = path.as_ref();
            meta.fields.push(FieldMeta {
                path: path.to_string(),
                kind: Kind::Dynamic,
                tags: Vec::new(),
                recursive: false,
            });
            meta.add_tag(path, tag.as_ref())?;
        }
        Ok(meta)
    }

    fn add_tag(&mut self, path: &str, tag: &str) -> Result<(), TagExprError> {
        for segment in parse_tag(tag) {
            let selector = ExprSelector::new(path, segment.name);
            if self.index.contains_key(&selector) {
                return Err(TagExprError::DuplicateName {
                    type_name: self.type_name.clone(),
                    selector,
                });
            }
            let expr = parse_expr(&segment.text).map_err(|source| TagExprError::Parse {
                type_name: self.type_name.clone(),
                selector: selector.clone(),
                source,
            })?;
            self.index.insert(selector.clone(), self.exprs.len());
            self.exprs.push((selector, expr));
        }
        Ok(())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn expr(&self, selector: &ExprSelector) -> Option<&Expr> {
        self.index.get(selector).map(|&i| &self.exprs[i].1)
    }

    /// All expressions in declaration order.
    pub fn exprs(&self) -> impl Iterator<Item = (&ExprSelector, &Expr)> {
        self.exprs.iter().map(|(selector, expr)| (selector, expr))
    }

    /// The unnamed expression of each field, in declaration order.
    pub fn default_exprs(&self) -> impl Iterator<Item = (&ExprSelector, &Expr)> {
        self.exprs().filter(|(selector, _)| selector.is_default())
    }

    pub fn selectors(&self) -> impl Iterator<Item = &ExprSelector> {
        self.exprs.iter().map(|(selector, _)| selector)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}
