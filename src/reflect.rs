//! Runtime field access over Rust values.
//!
//! Rust has no runtime reflection, so every type that expressions can look
//! into implements [`Reflect`]. Scalars, `String`, `Option`, `Box`, `Vec`,
//! `HashMap`, `BTreeMap` and `serde_json::Value` are covered here; structs
//! opt in through the [`tagged!`](crate::tagged) macro, which also records
//! the field tags the registry parses into expressions.
//!
//! Two views are exposed:
//!
//! - [`View`] for reading (evaluation never needs more than `&T`)
//! - [`ViewMut`] for navigation while writing, where `Option` fields can be
//!   initialised on the way to a nested field

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::CoerceError;

pub type JsonValue = serde_json::Value;

/// Static shape of a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Struct,
    Seq,
    Map,
    /// Shape only known at runtime (`serde_json::Value`)
    Dynamic,
}

impl Kind {
    /// Whether values of this kind can contain further tagged structs.
    pub fn is_composite(self) -> bool {
        matches!(self, Kind::Struct | Kind::Seq | Kind::Map | Kind::Dynamic)
    }
}

/// Read-only view of a value.
pub enum View<'a> {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(&'a str),
    Struct(&'a dyn Struct),
    Seq(&'a dyn Seq),
    Map(&'a dyn Map),
    /// `Option`/`Box`; `None` is a nil pointer
    Pointer(Option<&'a dyn Reflect>),
}

impl View<'_> {
    pub fn is_composite(&self) -> bool {
        matches!(self, View::Struct(_) | View::Seq(_) | View::Map(_))
    }
}

/// Mutable view used to walk towards a field that is about to be written.
pub enum ViewMut<'a> {
    Leaf,
    Struct(&'a mut dyn Struct),
    Seq(&'a mut dyn Seq),
    Map(&'a mut dyn Map),
    Pointer(&'a mut dyn Pointer),
}

/// A value expressions can read and binders can write.
pub trait Reflect: fmt::Debug + Send + Sync + 'static {
    fn view(&self) -> View<'_>;

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Leaf
    }

    /// Parses string parameters into the value. `loose_zero` accepts an empty
    /// string as the zero value of the kind.
    fn assign_strs(&mut self, _values: &[&str], _loose_zero: bool) -> Result<(), CoerceError> {
        Err(CoerceError::Unsupported)
    }

    fn assign_json(&mut self, _value: &JsonValue) -> Result<(), CoerceError> {
        Err(CoerceError::Unsupported)
    }

    fn kind() -> Kind
    where
        Self: Sized;

    /// Field layout of tagged structs, seen through `Option` and `Box`.
    fn struct_desc() -> Option<StructDesc>
    where
        Self: Sized,
    {
        None
    }
}

pub trait Struct {
    fn struct_type(&self) -> TypeId;
    fn descriptor(&self) -> StructDesc;
    fn field_names(&self) -> &'static [&'static str];
    fn field(&self, name: &str) -> Option<&dyn Reflect>;
    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Reflect>;

    fn field_at(&self, index: usize) -> Option<&dyn Reflect> {
        self.field_names()
            .get(index)
            .and_then(|name| self.field(name))
    }
}

pub trait Seq {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Option<&dyn Reflect>;
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One map entry; `text` is the key rendered for paths and lookups.
pub struct MapEntry<'a> {
    pub text: String,
    pub key: &'a dyn Reflect,
    pub value: &'a dyn Reflect,
}

/// Maps are addressed by the textual form of their keys.
pub trait Map {
    fn len(&self) -> usize;
    fn get(&self, key: &str) -> Option<&dyn Reflect>;
    fn get_mut(&mut self, key: &str) -> Option<&mut dyn Reflect>;
    fn entries(&self) -> Vec<MapEntry<'_>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait Pointer {
    fn get_mut(&mut self) -> Option<&mut dyn Reflect>;
    /// Allocates the zero value when the pointer is nil.
    fn get_or_init(&mut self) -> &mut dyn Reflect;
}

/// Keys usable in reflected maps.
pub trait MapKey: Reflect + Sized {
    fn parse_key(text: &str) -> Option<Self>;
    fn key_text(&self) -> String;
}

/// Field layout of a tagged struct.
#[derive(Debug, Clone)]
pub struct StructDesc {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub fields: Vec<FieldDesc>,
}

#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: &'static str,
    /// `(tag name, tag text)` pairs in declaration order
    pub tags: Vec<(&'static str, &'static str)>,
    pub kind: Kind,
    pub nested: fn() -> Option<StructDesc>,
}

impl FieldDesc {
    pub fn tag(&self, name: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(tag, _)| *tag == name)
            .map(|(_, text)| *text)
    }
}

/// Implemented by [`tagged!`](crate::tagged) structs.
pub trait Described {
    fn describe() -> StructDesc;
}

/// Assigns a JSON object to a struct key by key; unknown keys are ignored.
pub fn assign_struct_json(target: &mut dyn Struct, value: &JsonValue) -> Result<(), CoerceError> {
    let object = value
        .as_object()
        .ok_or_else(|| CoerceError::mismatch("object", value))?;
    for (key, item) in object {
        if let Some(field) = target.field_mut(key) {
            field.assign_json(item)?;
        }
    }
    Ok(())
}

/// Boolean spellings accepted from string parameters.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn first<'v>(values: &[&'v str]) -> Result<&'v str, CoerceError> {
    values.first().copied().ok_or(CoerceError::Empty)
}

fn parse_scalar<T: FromStr + Default>(
    text: &str,
    loose_zero: bool,
    expected: &'static str,
) -> Result<T, CoerceError> {
    if text.is_empty() && loose_zero {
        return Ok(T::default());
    }
    text.parse().map_err(|_| CoerceError::Parse {
        expected,
        text: text.to_string(),
    })
}

macro_rules! reflect_signed {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn view(&self) -> View<'_> {
                View::Int(*self as i64)
            }

            fn assign_strs(&mut self, values: &[&str], loose_zero: bool) -> Result<(), CoerceError> {
                *self = parse_scalar(first(values)?, loose_zero, stringify!($ty))?;
                Ok(())
            }

            fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
                let n = value
                    .as_i64()
                    .ok_or_else(|| CoerceError::mismatch(stringify!($ty), value))?;
                *self = <$ty>::try_from(n).map_err(|_| CoerceError::OutOfRange {
                    expected: stringify!($ty),
                    value: n.to_string(),
                })?;
                Ok(())
            }

            fn kind() -> Kind {
                Kind::Int
            }
        }

        impl MapKey for $ty {
            fn parse_key(text: &str) -> Option<Self> {
                text.parse().ok()
            }

            fn key_text(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

macro_rules! reflect_unsigned {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn view(&self) -> View<'_> {
                View::Uint(*self as u64)
            }

            fn assign_strs(&mut self, values: &[&str], loose_zero: bool) -> Result<(), CoerceError> {
                *self = parse_scalar(first(values)?, loose_zero, stringify!($ty))?;
                Ok(())
            }

            fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
                let n = value
                    .as_u64()
                    .ok_or_else(|| CoerceError::mismatch(stringify!($ty), value))?;
                *self = <$ty>::try_from(n).map_err(|_| CoerceError::OutOfRange {
                    expected: stringify!($ty),
                    value: n.to_string(),
                })?;
                Ok(())
            }

            fn kind() -> Kind {
                Kind::Uint
            }
        }

        impl MapKey for $ty {
            fn parse_key(text: &str) -> Option<Self> {
                text.parse().ok()
            }

            fn key_text(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

macro_rules! reflect_float {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn view(&self) -> View<'_> {
                View::Float(*self as f64)
            }

            fn assign_strs(&mut self, values: &[&str], loose_zero: bool) -> Result<(), CoerceError> {
                *self = parse_scalar(first(values)?, loose_zero, stringify!($ty))?;
                Ok(())
            }

            fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
                let n = value
                    .as_f64()
                    .ok_or_else(|| CoerceError::mismatch(stringify!($ty), value))?;
                *self = n as $ty;
                Ok(())
            }

            fn kind() -> Kind {
                Kind::Float
            }
        }
    )*};
}

reflect_signed!(i8, i16, i32, i64, isize);
reflect_unsigned!(u8, u16, u32, u64, usize);
reflect_float!(f32, f64);

impl Reflect for bool {
    fn view(&self) -> View<'_> {
        View::Bool(*self)
    }

    fn assign_strs(&mut self, values: &[&str], loose_zero: bool) -> Result<(), CoerceError> {
        let text = first(values)?;
        *self = match parse_bool(text) {
            Some(b) => b,
            None if text.is_empty() && loose_zero => false,
            None => {
                return Err(CoerceError::Parse {
                    expected: "bool",
                    text: text.to_string(),
                });
            }
        };
        Ok(())
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        *self = value
            .as_bool()
            .ok_or_else(|| CoerceError::mismatch("bool", value))?;
        Ok(())
    }

    fn kind() -> Kind {
        Kind::Bool
    }
}

impl MapKey for bool {
    fn parse_key(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    fn key_text(&self) -> String {
        self.to_string()
    }
}

impl Reflect for String {
    fn view(&self) -> View<'_> {
        View::Str(self)
    }

    fn assign_strs(&mut self, values: &[&str], _loose_zero: bool) -> Result<(), CoerceError> {
        *self = first(values)?.to_string();
        Ok(())
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        *self = value
            .as_str()
            .ok_or_else(|| CoerceError::mismatch("string", value))?
            .to_string();
        Ok(())
    }

    fn kind() -> Kind {
        Kind::String
    }
}

impl MapKey for String {
    fn parse_key(text: &str) -> Option<Self> {
        Some(text.to_string())
    }

    fn key_text(&self) -> String {
        self.clone()
    }
}

impl<T: Reflect + Default> Reflect for Option<T> {
    fn view(&self) -> View<'_> {
        View::Pointer(self.as_ref().map(|v| v as &dyn Reflect))
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Pointer(self)
    }

    fn assign_strs(&mut self, values: &[&str], loose_zero: bool) -> Result<(), CoerceError> {
        self.get_or_insert_with(T::default)
            .assign_strs(values, loose_zero)
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).assign_json(value)
    }

    fn kind() -> Kind {
        T::kind()
    }

    fn struct_desc() -> Option<StructDesc> {
        T::struct_desc()
    }
}

impl<T: Reflect + Default> Pointer for Option<T> {
    fn get_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.as_mut().map(|v| v as &mut dyn Reflect)
    }

    fn get_or_init(&mut self) -> &mut dyn Reflect {
        self.get_or_insert_with(T::default)
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn view(&self) -> View<'_> {
        View::Pointer(Some(&**self as &dyn Reflect))
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Pointer(self)
    }

    fn assign_strs(&mut self, values: &[&str], loose_zero: bool) -> Result<(), CoerceError> {
        (**self).assign_strs(values, loose_zero)
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        (**self).assign_json(value)
    }

    fn kind() -> Kind {
        T::kind()
    }

    fn struct_desc() -> Option<StructDesc> {
        T::struct_desc()
    }
}

impl<T: Reflect> Pointer for Box<T> {
    fn get_mut(&mut self) -> Option<&mut dyn Reflect> {
        Some(&mut **self as &mut dyn Reflect)
    }

    fn get_or_init(&mut self) -> &mut dyn Reflect {
        &mut **self
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn view(&self) -> View<'_> {
        View::Seq(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Seq(self)
    }

    fn assign_strs(&mut self, values: &[&str], loose_zero: bool) -> Result<(), CoerceError> {
        *self = values
            .iter()
            .map(|text| {
                let mut item = T::default();
                item.assign_strs(&[*text], loose_zero)?;
                Ok(item)
            })
            .collect::<Result<_, CoerceError>>()?;
        Ok(())
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        let items = value
            .as_array()
            .ok_or_else(|| CoerceError::mismatch("array", value))?;
        *self = items
            .iter()
            .map(|raw| {
                let mut item = T::default();
                item.assign_json(raw)?;
                Ok(item)
            })
            .collect::<Result<_, CoerceError>>()?;
        Ok(())
    }

    fn kind() -> Kind {
        Kind::Seq
    }
}

impl<T: Reflect> Seq for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect> {
        self.as_slice().get(index).map(|v| v as &dyn Reflect)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|v| v as &mut dyn Reflect)
    }
}

fn json_object_entries<K: MapKey, V: Reflect + Default>(
    value: &JsonValue,
) -> Result<Vec<(K, V)>, CoerceError> {
    let object = value
        .as_object()
        .ok_or_else(|| CoerceError::mismatch("object", value))?;
    object
        .iter()
        .map(|(text, raw)| {
            let key = K::parse_key(text).ok_or_else(|| CoerceError::Parse {
                expected: "map key",
                text: text.clone(),
            })?;
            let mut item = V::default();
            item.assign_json(raw)?;
            Ok((key, item))
        })
        .collect()
}

impl<K, V> Reflect for HashMap<K, V>
where
    K: MapKey + Eq + Hash,
    V: Reflect + Default,
{
    fn view(&self) -> View<'_> {
        View::Map(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Map(self)
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        *self = json_object_entries(value)?.into_iter().collect();
        Ok(())
    }

    fn kind() -> Kind {
        Kind::Map
    }
}

impl<K, V> Map for HashMap<K, V>
where
    K: MapKey + Eq + Hash,
    V: Reflect,
{
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn get(&self, key: &str) -> Option<&dyn Reflect> {
        let key = K::parse_key(key)?;
        HashMap::get(self, &key).map(|v| v as &dyn Reflect)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut dyn Reflect> {
        let key = K::parse_key(key)?;
        HashMap::get_mut(self, &key).map(|v| v as &mut dyn Reflect)
    }

    fn entries(&self) -> Vec<MapEntry<'_>> {
        self.iter()
            .map(|(key, value)| MapEntry {
                text: key.key_text(),
                key,
                value,
            })
            .collect()
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: Reflect + Default,
{
    fn view(&self) -> View<'_> {
        View::Map(self)
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        ViewMut::Map(self)
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        *self = json_object_entries(value)?.into_iter().collect();
        Ok(())
    }

    fn kind() -> Kind {
        Kind::Map
    }
}

impl<K, V> Map for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: Reflect,
{
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn get(&self, key: &str) -> Option<&dyn Reflect> {
        let key = K::parse_key(key)?;
        BTreeMap::get(self, &key).map(|v| v as &dyn Reflect)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut dyn Reflect> {
        let key = K::parse_key(key)?;
        BTreeMap::get_mut(self, &key).map(|v| v as &mut dyn Reflect)
    }

    fn entries(&self) -> Vec<MapEntry<'_>> {
        self.iter()
            .map(|(key, value)| MapEntry {
                text: key.key_text(),
                key,
                value,
            })
            .collect()
    }
}

impl Reflect for JsonValue {
    fn view(&self) -> View<'_> {
        match self {
            JsonValue::Null => View::Nil,
            JsonValue::Bool(b) => View::Bool(*b),
            JsonValue::Number(n) => n.as_f64().map_or(View::Nil, View::Float),
            JsonValue::String(s) => View::Str(s),
            JsonValue::Array(items) => View::Seq(items),
            JsonValue::Object(map) => View::Map(map),
        }
    }

    fn view_mut(&mut self) -> ViewMut<'_> {
        match self {
            JsonValue::Array(items) => ViewMut::Seq(items),
            JsonValue::Object(map) => ViewMut::Map(map),
            _ => ViewMut::Leaf,
        }
    }

    fn assign_strs(&mut self, values: &[&str], _loose_zero: bool) -> Result<(), CoerceError> {
        *self = match values {
            [] => return Err(CoerceError::Empty),
            [one] => JsonValue::String(one.to_string()),
            many => JsonValue::Array(
                many.iter()
                    .map(|text| JsonValue::String(text.to_string()))
                    .collect(),
            ),
        };
        Ok(())
    }

    fn assign_json(&mut self, value: &JsonValue) -> Result<(), CoerceError> {
        *self = value.clone();
        Ok(())
    }

    fn kind() -> Kind {
        Kind::Dynamic
    }
}

impl Map for serde_json::Map<String, JsonValue> {
    fn len(&self) -> usize {
        serde_json::Map::len(self)
    }

    fn get(&self, key: &str) -> Option<&dyn Reflect> {
        serde_json::Map::get(self, key).map(|v| v as &dyn Reflect)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut dyn Reflect> {
        serde_json::Map::get_mut(self, key).map(|v| v as &mut dyn Reflect)
    }

    fn entries(&self) -> Vec<MapEntry<'_>> {
        self.iter()
            .map(|(key, value)| MapEntry {
                text: key.clone(),
                key,
                value,
            })
            .collect()
    }
}

/// Declares a struct whose fields can be reached from tag expressions.
///
/// Each field may carry one `#[tag(...)]` attribute listing `name = "text"`
/// pairs. The tag name selects the namespace a [`Vm`](crate::Vm) reads, so
/// the same struct can carry validation (`vd`) and binding (`param`,
/// `default`) tags side by side. The struct must also derive `Debug`, and
/// `Default` when it is reached through an `Option`.
///
/// ```
/// tagexpr::tagged! {
///     #[derive(Debug, Default)]
///     pub struct Order {
///         #[tag(vd = "$>0;msg:'quantity must be positive'")]
///         pub quantity: i64,
///         pub note: String,
///     }
/// }
/// ```
#[macro_export]
macro_rules! tagged {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[tag($($tag:ident = $text:literal),* $(,)?)])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($fvis $field: $ty,)*
        }

        impl $crate::reflect::Described for $name {
            fn describe() -> $crate::reflect::StructDesc {
                $crate::reflect::StructDesc {
                    type_id: ::std::any::TypeId::of::<Self>(),
                    type_name: stringify!($name),
                    fields: vec![$(
                        $crate::reflect::FieldDesc {
                            name: stringify!($field),
                            tags: vec![$($((stringify!($tag), $text),)*)?],
                            kind: <$ty as $crate::reflect::Reflect>::kind(),
                            nested: <$ty as $crate::reflect::Reflect>::struct_desc,
                        },
                    )*],
                }
            }
        }

        impl $crate::reflect::Struct for $name {
            fn struct_type(&self) -> ::std::any::TypeId {
                ::std::any::TypeId::of::<Self>()
            }

            fn descriptor(&self) -> $crate::reflect::StructDesc {
                <Self as $crate::reflect::Described>::describe()
            }

            fn field_names(&self) -> &'static [&'static str] {
                &[$(stringify!($field)),*]
            }

            fn field(&self, name: &str) -> ::std::option::Option<&dyn $crate::reflect::Reflect> {
                match name {
                    $(stringify!($field) => ::std::option::Option::Some(&self.$field as &dyn $crate::reflect::Reflect),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                name: &str,
            ) -> ::std::option::Option<&mut dyn $crate::reflect::Reflect> {
                match name {
                    $(stringify!($field) => {
                        ::std::option::Option::Some(&mut self.$field as &mut dyn $crate::reflect::Reflect)
                    })*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::reflect::Reflect for $name {
            fn view(&self) -> $crate::reflect::View<'_> {
                $crate::reflect::View::Struct(self)
            }

            fn view_mut(&mut self) -> $crate::reflect::ViewMut<'_> {
                $crate::reflect::ViewMut::Struct(self)
            }

            fn assign_json(
                &mut self,
                value: &$crate::reflect::JsonValue,
            ) -> ::std::result::Result<(), $crate::CoerceError> {
                $crate::reflect::assign_struct_json(self, value)
            }

            fn kind() -> $crate::reflect::Kind {
                $crate::reflect::Kind::Struct
            }

            fn struct_desc() -> ::std::option::Option<$crate::reflect::StructDesc> {
                ::std::option::Option::Some(<Self as $crate::reflect::Described>::describe())
            }
        }
    };
}
