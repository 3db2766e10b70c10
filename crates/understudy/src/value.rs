//! Dynamic values and runtime type descriptors.
//!
//! Every intercepted call carries its arguments and its return value as
//! [`Value`]s. Types are described at runtime by [`TypeDescriptor`], which
//! knows its supertypes so that `type_of` constraints can check
//! instance-of relationships.
//!
//! [`FromValue`] and [`FromArgs`] go the other way: they extract typed Rust
//! values from dynamic ones and report the declared parameter types of
//! predicates and callbacks.

use crate::mock::Mock;
use once_cell::sync::Lazy;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Type Descriptors
// ============================================================================

/// Broad category of a runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    List,
    Object,
    /// Accepts every value; used for untyped parameters.
    Any,
}

#[derive(Debug)]
struct TypeInfo {
    name: String,
    kind: TypeKind,
    supertypes: Vec<TypeDescriptor>,
}

/// Runtime description of a type.
///
/// Two descriptors are equal when their name and kind are equal; supertypes
/// only matter for [`TypeDescriptor::is_assignable_to`].
#[derive(Clone)]
pub struct TypeDescriptor(Arc<TypeInfo>);

static UNIT: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::builtin("unit", TypeKind::Unit));
static BOOL: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::builtin("bool", TypeKind::Bool));
static INT: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::builtin("int", TypeKind::Int));
static FLOAT: Lazy<TypeDescriptor> =
    Lazy::new(|| TypeDescriptor::builtin("float", TypeKind::Float));
static STRING: Lazy<TypeDescriptor> =
    Lazy::new(|| TypeDescriptor::builtin("string", TypeKind::Str));
static LIST: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::builtin("list", TypeKind::List));
static ANY: Lazy<TypeDescriptor> = Lazy::new(|| TypeDescriptor::builtin("any", TypeKind::Any));

impl TypeDescriptor {
    fn builtin(name: &str, kind: TypeKind) -> Self {
        Self(Arc::new(TypeInfo {
            name: name.to_string(),
            kind,
            supertypes: Vec::new(),
        }))
    }

    pub fn unit() -> Self {
        UNIT.clone()
    }

    pub fn bool() -> Self {
        BOOL.clone()
    }

    pub fn int() -> Self {
        INT.clone()
    }

    pub fn float() -> Self {
        FLOAT.clone()
    }

    pub fn string() -> Self {
        STRING.clone()
    }

    pub fn list() -> Self {
        LIST.clone()
    }

    pub fn any() -> Self {
        ANY.clone()
    }

    /// A user-defined object (interface, class or record) type.
    pub fn object(name: impl Into<String>) -> Self {
        Self(Arc::new(TypeInfo {
            name: name.into(),
            kind: TypeKind::Object,
            supertypes: Vec::new(),
        }))
    }

    /// Resolve a type by name: built-in names map to the built-in
    /// descriptors, anything else is an object type.
    pub fn named(name: &str) -> Self {
        match name {
            "unit" => Self::unit(),
            "bool" => Self::bool(),
            "int" => Self::int(),
            "float" => Self::float(),
            "string" => Self::string(),
            "list" => Self::list(),
            "any" => Self::any(),
            other => Self::object(other),
        }
    }

    /// Declare `parent` as a supertype of this type.
    pub fn extends(self, parent: TypeDescriptor) -> Self {
        let mut supertypes = self.0.supertypes.clone();
        supertypes.push(parent);
        Self(Arc::new(TypeInfo {
            name: self.0.name.clone(),
            kind: self.0.kind,
            supertypes,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn supertypes(&self) -> &[TypeDescriptor] {
        &self.0.supertypes
    }

    /// True when a value of this type can stand where `target` is expected.
    pub fn is_assignable_to(&self, target: &TypeDescriptor) -> bool {
        if target.kind() == TypeKind::Any || self == target {
            return true;
        }
        self.0
            .supertypes
            .iter()
            .any(|parent| parent.is_assignable_to(target))
    }

    /// The value a call returns when nothing else was configured.
    pub fn default_value(&self) -> Value {
        match self.kind() {
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Int => Value::Int(0),
            TypeKind::Float => Value::Float(0.0),
            TypeKind::Unit
            | TypeKind::Str
            | TypeKind::List
            | TypeKind::Object
            | TypeKind::Any => Value::Null,
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || (self.0.kind == other.0.kind && self.0.name == other.0.name)
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
        self.0.kind.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.0.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

// ============================================================================
// Values
// ============================================================================

/// Instance of a user-defined type, compared by type and field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    ty: TypeDescriptor,
    fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "{}", self.ty);
        }
        write!(f, "{} {{ ", self.ty)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(" }")
    }
}

/// A dynamically typed argument or return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Object),
    /// Another mock instance, compared by instance identity.
    Mock(Mock),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Runtime type of the value; `None` for null.
    pub fn type_descriptor(&self) -> Option<TypeDescriptor> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(TypeDescriptor::bool()),
            Value::Int(_) => Some(TypeDescriptor::int()),
            Value::Float(_) => Some(TypeDescriptor::float()),
            Value::Str(_) => Some(TypeDescriptor::string()),
            Value::List(_) => Some(TypeDescriptor::list()),
            Value::Object(object) => Some(object.type_descriptor().clone()),
            Value::Mock(mock) => Some(mock.type_descriptor().clone()),
        }
    }

    /// Unquoted textual rendering used by string-shaped constraints.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Str(s) => Some(Cow::Borrowed(s)),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mock(&self) -> Option<&Mock> {
        match self {
            Value::Mock(mock) => Some(mock),
            _ => None,
        }
    }

    /// In-order comparison; `None` when the two values are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Adjust numeric literals to the kind a target type expects.
    pub(crate) fn coerce_to(self, ty: &TypeDescriptor) -> Value {
        match (self, ty.kind()) {
            (Value::Int(i), TypeKind::Float) => Value::Float(i as f64),
            (value, _) => value,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(object) => write!(f, "{object}"),
            Value::Mock(mock) => write!(f, "{} (mock)", mock.type_descriptor()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.fields.len()))?;
                for (name, value) in &object.fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Value::Mock(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

// Only lossless conversions; `u64` and `usize` values above `i64::MAX` have
// no `Int` form.
impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Mock> for Value {
    fn from(v: Mock) -> Self {
        Value::Mock(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let object = map
                    .into_iter()
                    .fold(Object::new(TypeDescriptor::object("object")), |obj, (k, v)| {
                        obj.with_field(k, Value::from(v))
                    });
                Value::Object(object)
            }
        }
    }
}

// ============================================================================
// Typed Extraction
// ============================================================================

/// Rust types that can be extracted from a [`Value`].
///
/// `type_descriptor` is the declared type used for callback signature checks;
/// `from_value` returns `None` when the runtime value is incompatible.
pub trait FromValue: Sized {
    fn type_descriptor() -> TypeDescriptor;
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::bool()
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::int()
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for i32 {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::int()
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for f64 {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::float()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::string()
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Value {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::any()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::list()
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list()?.iter().map(T::from_value).collect()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn type_descriptor() -> TypeDescriptor {
        T::type_descriptor()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Argument tuples accepted by callbacks.
pub trait FromArgs: Sized {
    fn parameter_types() -> Vec<TypeDescriptor>;
    fn from_args(args: &[Value]) -> Option<Self>;
}

macro_rules! impl_from_args {
    ($($name:ident => $idx:tt),*) => {
        impl<$($name: FromValue),*> FromArgs for ($($name,)*) {
            fn parameter_types() -> Vec<TypeDescriptor> {
                vec![$($name::type_descriptor()),*]
            }

            #[allow(unused_variables)]
            fn from_args(args: &[Value]) -> Option<Self> {
                if args.len() != Self::parameter_types().len() {
                    return None;
                }
                Some(($($name::from_value(&args[$idx])?,)*))
            }
        }
    };
}

impl_from_args!();
impl_from_args!(A => 0);
impl_from_args!(A => 0, B => 1);
impl_from_args!(A => 0, B => 1, C => 2);
impl_from_args!(A => 0, B => 1, C => 2, D => 3);
impl_from_args!(A => 0, B => 1, C => 2, D => 3, E => 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scalars() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(1).to_string(), "1");
        assert_eq!(Value::from(3.14).to_string(), "3.14");
        assert_eq!(Value::from("a").to_string(), "\"a\"");
        assert_eq!(Value::from(true).to_string(), "true");
    }

    #[test]
    fn test_render_nested_collections() {
        let value = Value::from(vec![
            Value::from(1),
            Value::from(vec!["x", "y"]),
            Value::Null,
        ]);
        assert_eq!(value.to_string(), "[1, [\"x\", \"y\"], null]");
    }

    #[test]
    fn test_render_object() {
        let point = Object::new(TypeDescriptor::object("Point"))
            .with_field("x", 1)
            .with_field("y", 2);
        assert_eq!(Value::from(point).to_string(), "Point { x: 1, y: 2 }");
        assert_eq!(
            Value::from(Object::new(TypeDescriptor::object("Empty"))).to_string(),
            "Empty"
        );
    }

    #[test]
    fn test_as_text_is_unquoted() {
        assert_eq!(Value::from("abc").as_text().as_deref(), Some("abc"));
        assert_eq!(Value::from(42).as_text().as_deref(), Some("42"));
        assert_eq!(Value::Null.as_text(), None);
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::from(1).compare(&Value::from(2)), Some(Ordering::Less));
        assert_eq!(
            Value::from(2.5).compare(&Value::from(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::from("1").compare(&Value::from(1)), None);
        assert_eq!(Value::Null.compare(&Value::from(1)), None);
        assert_eq!(Value::from(vec![1]).compare(&Value::from(vec![1])), None);
    }

    #[test]
    fn test_assignability_follows_supertypes() {
        let shape = TypeDescriptor::object("Shape");
        let polygon = TypeDescriptor::object("Polygon").extends(shape.clone());
        let square = TypeDescriptor::object("Square").extends(polygon.clone());

        assert!(square.is_assignable_to(&square));
        assert!(square.is_assignable_to(&polygon));
        assert!(square.is_assignable_to(&shape));
        assert!(square.is_assignable_to(&TypeDescriptor::any()));
        assert!(!shape.is_assignable_to(&square));
        assert!(!TypeDescriptor::int().is_assignable_to(&TypeDescriptor::float()));
    }

    #[test]
    fn test_type_equality_ignores_supertypes() {
        let plain = TypeDescriptor::object("Square");
        let derived = TypeDescriptor::object("Square").extends(TypeDescriptor::object("Shape"));
        assert_eq!(plain, derived);
        assert_ne!(TypeDescriptor::named("int"), TypeDescriptor::object("int2"));
        assert_eq!(TypeDescriptor::named("string"), TypeDescriptor::string());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(TypeDescriptor::int().default_value(), Value::Int(0));
        assert_eq!(TypeDescriptor::float().default_value(), Value::Float(0.0));
        assert_eq!(TypeDescriptor::bool().default_value(), Value::Bool(false));
        assert_eq!(TypeDescriptor::string().default_value(), Value::Null);
        assert_eq!(TypeDescriptor::object("Shape").default_value(), Value::Null);
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(serde_json::json!({"name": "a", "tags": [1, 2.5]}));
        let Value::Object(object) = value else {
            panic!("expected object");
        };
        assert_eq!(object.field("name"), Some(&Value::from("a")));
        assert_eq!(
            object.field("tags"),
            Some(&Value::List(vec![Value::Int(1), Value::Float(2.5)]))
        );
    }

    #[test]
    fn test_unsigned_conversions_are_exact() {
        assert_eq!(Value::from(u32::MAX), Value::Int(4_294_967_295));
        assert_eq!(Value::from(u8::MAX), Value::Int(255));
        // JSON numbers beyond i64 fall back to floats instead of saturating.
        assert_eq!(
            Value::from(serde_json::json!(u64::MAX)),
            Value::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn test_from_args() {
        let args = vec![Value::from(1), Value::from("x")];
        let parsed = <(i64, String)>::from_args(&args);
        assert_eq!(parsed, Some((1, "x".to_string())));
        assert_eq!(<(i64, i64)>::from_args(&args), None);
        assert_eq!(<(i64,)>::from_args(&args), None);
        assert_eq!(<()>::from_args(&[]), Some(()));
        assert_eq!(
            <(i64, String)>::parameter_types(),
            vec![TypeDescriptor::int(), TypeDescriptor::string()]
        );
    }

    #[test]
    fn test_option_extraction() {
        assert_eq!(Option::<i64>::from_value(&Value::Null), Some(None));
        assert_eq!(Option::<i64>::from_value(&Value::from(3)), Some(Some(3)));
        assert_eq!(Option::<i64>::from_value(&Value::from("3")), None);
    }

    #[test]
    fn test_serialize_value() {
        let value = Value::from(vec![Value::from(1), Value::Null, Value::from("s")]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,null,"s"]"#);
    }
}
