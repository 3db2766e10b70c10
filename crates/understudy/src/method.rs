//! Structural method identity and intercepted calls.
//!
//! A [`MethodDescriptor`] is built once per proxied member and compared by
//! value: declaring type, member name, member kind, parameter types and
//! generic type arguments. Parameter names and the return type take no part
//! in identity.

use crate::value::{TypeDescriptor, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// What kind of member a descriptor names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    Method,
    PropertyGet,
    PropertySet,
}

/// How a parameter passes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    In,
    /// Written by the callee; matched as "anything" when literals are synthesized.
    Out,
    Ref,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeDescriptor,
    pub direction: Direction,
}

/// Identity and shape of an interceptable member.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    declaring_type: TypeDescriptor,
    name: String,
    kind: MemberKind,
    parameters: Vec<Parameter>,
    generic_args: Vec<TypeDescriptor>,
    return_type: TypeDescriptor,
    interceptable: bool,
}

impl MethodDescriptor {
    /// A method with no parameters returning unit; extend it with the
    /// builder methods below.
    pub fn method(declaring_type: TypeDescriptor, name: impl Into<String>) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            kind: MemberKind::Method,
            parameters: Vec::new(),
            generic_args: Vec::new(),
            return_type: TypeDescriptor::unit(),
            interceptable: true,
        }
    }

    pub fn property_getter(
        declaring_type: TypeDescriptor,
        name: impl Into<String>,
        ty: TypeDescriptor,
    ) -> Self {
        Self {
            kind: MemberKind::PropertyGet,
            return_type: ty,
            ..Self::method(declaring_type, name)
        }
    }

    pub fn property_setter(
        declaring_type: TypeDescriptor,
        name: impl Into<String>,
        ty: TypeDescriptor,
    ) -> Self {
        Self {
            kind: MemberKind::PropertySet,
            ..Self::method(declaring_type, name)
        }
        .param("value", ty)
    }

    pub fn param(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.with_parameter(name, ty, Direction::In)
    }

    pub fn out_param(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.with_parameter(name, ty, Direction::Out)
    }

    pub fn ref_param(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.with_parameter(name, ty, Direction::Ref)
    }

    fn with_parameter(mut self, name: impl Into<String>, ty: TypeDescriptor, direction: Direction) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            ty,
            direction,
        });
        self
    }

    /// Resolved generic type argument (in declaration order).
    pub fn generic_arg(mut self, ty: TypeDescriptor) -> Self {
        self.generic_args.push(ty);
        self
    }

    pub fn returns(mut self, ty: TypeDescriptor) -> Self {
        self.return_type = ty;
        self
    }

    /// Mark the member as one the proxy facility cannot route through the
    /// dispatch boundary (sealed or non-virtual members).
    pub fn non_interceptable(mut self) -> Self {
        self.interceptable = false;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn declaring_type(&self) -> &TypeDescriptor {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.parameters.iter().map(|p| &p.ty)
    }

    pub fn generic_args(&self) -> &[TypeDescriptor] {
        &self.generic_args
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    pub fn is_interceptable(&self) -> bool {
        self.interceptable
    }

    /// `Type.name` or `Type.name<T1, T2>` for generic methods.
    pub fn qualified_name(&self) -> String {
        if self.generic_args.is_empty() {
            return format!("{}.{}", self.declaring_type, self.name);
        }
        let generics: Vec<String> = self.generic_args.iter().map(|t| t.to_string()).collect();
        format!(
            "{}.{}<{}>",
            self.declaring_type,
            self.name,
            generics.join(", ")
        )
    }

    /// Render a call signature such as `Type.name(1, "a")`.
    pub fn signature<I, S>(&self, args: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: fmt::Display,
    {
        let rendered: Vec<String> = args.into_iter().map(|a| a.to_string()).collect();
        format!("{}({})", self.qualified_name(), rendered.join(", "))
    }
}

impl PartialEq for MethodDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type
            && self.name == other.name
            && self.kind == other.kind
            && self.generic_args == other.generic_args
            && self.parameters.len() == other.parameters.len()
            && self.parameter_types().eq(other.parameter_types())
    }
}

impl Eq for MethodDescriptor {}

impl Hash for MethodDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
        self.kind.hash(state);
        self.generic_args.hash(state);
        for ty in self.parameter_types() {
            ty.hash(state);
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// One intercepted call: which member, with which argument values.
#[derive(Debug, Clone)]
pub struct Call {
    method: Arc<MethodDescriptor>,
    args: Vec<Value>,
}

impl Call {
    pub fn new(method: Arc<MethodDescriptor>, args: Vec<Value>) -> Self {
        Self { method, args }
    }

    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_args(self) -> Vec<Value> {
        self.args
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.method.signature(&self.args))
    }
}
