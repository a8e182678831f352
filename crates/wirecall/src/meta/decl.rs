// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent declarations of local types and services.
//!
//! The registry never inspects Rust types. Each struct, enum and service is
//! described once with these builders, and [`Describe`] links a Rust type
//! to its description:
//!
//! ```
//! use wirecall::meta::{Describe, LocalType, StructDecl};
//!
//! struct Node {
//!     label: String,
//!     children: Vec<Node>,
//! }
//!
//! impl Describe for Node {
//!     fn local_type() -> LocalType {
//!         LocalType::Struct(|| {
//!             StructDecl::of::<Node>()
//!                 .field("label", String::local_type())
//!                 .field("children", Vec::<Node>::local_type())
//!         })
//!     }
//! }
//! ```
//!
//! Struct and enum types hold a function producing their declaration, so a
//! type can mention itself without building an infinite value.

use crate::data::DynamicStruct;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};

/// Local view of a type, as seen by the declaring program.
#[derive(Clone)]
pub enum LocalType {
    /// No value (method return only).
    Void,
    Bool,
    Int,
    Long,
    Double,
    String,
    List(Option<Box<LocalType>>),
    Set(Option<Box<LocalType>>),
    Map(Option<Box<LocalType>>, Option<Box<LocalType>>),
    Struct(fn() -> StructDecl),
    Enum(fn() -> EnumDecl),
    /// Opaque local type; representable only through an adapter.
    Named(String),
    /// An untyped [`DynamicStruct`].
    Dynamic,
}

impl LocalType {
    pub fn of<T: Describe + ?Sized>() -> Self {
        T::local_type()
    }

    /// Opaque type identified by its Rust type name.
    pub fn named<T: ?Sized>() -> Self {
        Self::Named(std::any::type_name::<T>().to_string())
    }

    pub fn list_of(element: LocalType) -> Self {
        Self::List(Some(Box::new(element)))
    }

    pub fn set_of(element: LocalType) -> Self {
        Self::Set(Some(Box::new(element)))
    }

    pub fn map_of(key: LocalType, value: LocalType) -> Self {
        Self::Map(Some(Box::new(key)), Some(Box::new(value)))
    }

    /// Local-type identifier of declared and opaque types.
    pub fn local_id(&self) -> Option<String> {
        match self {
            Self::Struct(decl) => Some(decl().local_name),
            Self::Enum(decl) => Some(decl().local_name),
            Self::Named(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// Element type of a list or set.
    pub fn element(&self) -> Option<&LocalType> {
        match self {
            Self::List(e) | Self::Set(e) => e.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Debug for LocalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("Void"),
            Self::Bool => f.write_str("Bool"),
            Self::Int => f.write_str("Int"),
            Self::Long => f.write_str("Long"),
            Self::Double => f.write_str("Double"),
            Self::String => f.write_str("String"),
            Self::List(e) => f.debug_tuple("List").field(e).finish(),
            Self::Set(e) => f.debug_tuple("Set").field(e).finish(),
            Self::Map(k, v) => f.debug_tuple("Map").field(k).field(v).finish(),
            Self::Struct(decl) => f.debug_tuple("Struct").field(&decl().local_name).finish(),
            Self::Enum(decl) => f.debug_tuple("Enum").field(&decl().local_name).finish(),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Dynamic => f.write_str("Dynamic"),
        }
    }
}

/// Last path segment of a Rust type name, without generic arguments.
pub fn simple_name(local_name: &str) -> &str {
    let base = local_name.split('<').next().unwrap_or(local_name);
    base.rsplit("::").next().unwrap_or(base)
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub wire_name: Option<String>,
    pub ty: LocalType,
}

impl FieldDecl {
    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }
}

/// Declaration of a struct type.
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub local_name: String,
    pub wire_name: Option<String>,
    pub fields: Vec<FieldDecl>,
}

impl StructDecl {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            wire_name: None,
            fields: Vec::new(),
        }
    }

    /// Declaration identified by the Rust type name of `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    /// Override the wire name (defaults to the simple type name).
    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, ty: LocalType) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            wire_name: None,
            ty,
        });
        self
    }

    /// Add a field whose wire name differs from its local name.
    pub fn renamed_field(
        mut self,
        name: impl Into<String>,
        wire_name: impl Into<String>,
        ty: LocalType,
    ) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            wire_name: Some(wire_name.into()),
            ty,
        });
        self
    }

    pub fn resolved_wire_name(&self) -> String {
        self.wire_name
            .clone()
            .unwrap_or_else(|| simple_name(&self.local_name).to_string())
    }

    pub fn field_by_wire_name(&self, wire_name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.wire_name() == wire_name)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EnumValueDecl {
    pub name: String,
    pub wire_name: Option<String>,
    pub id: Option<u32>,
}

/// Declaration of an enum type.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub local_name: String,
    pub wire_name: Option<String>,
    pub values: Vec<EnumValueDecl>,
}

impl EnumDecl {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            wire_name: None,
            values: Vec::new(),
        }
    }

    pub fn of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// Add a value whose id is derived from its name.
    pub fn value(mut self, name: impl Into<String>) -> Self {
        self.values.push(EnumValueDecl {
            name: name.into(),
            wire_name: None,
            id: None,
        });
        self
    }

    /// Add a value with an explicit id.
    pub fn value_with_id(mut self, name: impl Into<String>, id: u32) -> Self {
        self.values.push(EnumValueDecl {
            name: name.into(),
            wire_name: None,
            id: Some(id),
        });
        self
    }

    /// Add a value whose wire name differs from its local name.
    pub fn renamed_value(mut self, name: impl Into<String>, wire_name: impl Into<String>) -> Self {
        self.values.push(EnumValueDecl {
            name: name.into(),
            wire_name: Some(wire_name.into()),
            id: None,
        });
        self
    }

    pub fn resolved_wire_name(&self) -> String {
        self.wire_name
            .clone()
            .unwrap_or_else(|| simple_name(&self.local_name).to_string())
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub ty: LocalType,
}

/// Declaration of one synchronous service method.
///
/// Its asynchronous counterpart is implied by the naming convention and
/// never declared separately.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub wire_name: Option<String>,
    pub returns: LocalType,
    pub params: Vec<ParamDecl>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wire_name: None,
            returns: LocalType::Void,
            params: Vec::new(),
        }
    }

    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    pub fn returns(mut self, ty: LocalType) -> Self {
        self.returns = ty;
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: LocalType) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn resolved_wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }
}

/// Declaration of a service interface.
#[derive(Debug, Clone)]
pub struct ServiceDecl {
    pub local_name: String,
    pub wire_name: Option<String>,
    pub session: Option<LocalType>,
    pub methods: Vec<MethodDecl>,
}

impl ServiceDecl {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            wire_name: None,
            session: None,
            methods: Vec::new(),
        }
    }

    pub fn of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// Declare the type of the per-call session value.
    pub fn session(mut self, ty: LocalType) -> Self {
        self.session = Some(ty);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn resolved_wire_name(&self) -> String {
        self.wire_name
            .clone()
            .unwrap_or_else(|| simple_name(&self.local_name).to_string())
    }

    /// Methods with the given local name.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDecl> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

// ---------------------------------------------------------------------------
// Describe
// ---------------------------------------------------------------------------

/// Links a Rust type to its local type description.
pub trait Describe {
    fn local_type() -> LocalType;
}

macro_rules! describe_as {
    ($ty:ty, $local:expr) => {
        impl Describe for $ty {
            fn local_type() -> LocalType {
                $local
            }
        }
    };
}

describe_as!((), LocalType::Void);
describe_as!(bool, LocalType::Bool);
describe_as!(i32, LocalType::Int);
describe_as!(i64, LocalType::Long);
describe_as!(f64, LocalType::Double);
describe_as!(String, LocalType::String);
describe_as!(str, LocalType::String);
describe_as!(DynamicStruct, LocalType::Dynamic);
describe_as!(Duration, LocalType::named::<Duration>());
describe_as!(SystemTime, LocalType::named::<SystemTime>());
describe_as!(IpAddr, LocalType::named::<IpAddr>());

impl<T: Describe> Describe for Option<T> {
    fn local_type() -> LocalType {
        T::local_type()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn local_type() -> LocalType {
        LocalType::list_of(T::local_type())
    }
}

impl<T: Describe> Describe for HashSet<T> {
    fn local_type() -> LocalType {
        LocalType::set_of(T::local_type())
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn local_type() -> LocalType {
        LocalType::set_of(T::local_type())
    }
}

impl<K: Describe, V: Describe> Describe for HashMap<K, V> {
    fn local_type() -> LocalType {
        LocalType::map_of(K::local_type(), V::local_type())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn local_type() -> LocalType {
        LocalType::map_of(K::local_type(), V::local_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("demo::shapes::Point"), "Point");
        assert_eq!(simple_name("demo::Wrapper<demo::Point>"), "Wrapper");
        assert_eq!(simple_name("Point"), "Point");
    }

    #[test]
    fn test_container_descriptions() {
        match Vec::<i32>::local_type() {
            LocalType::List(Some(e)) => assert!(matches!(*e, LocalType::Int)),
            other => panic!("unexpected {:?}", other),
        }
        match HashMap::<String, Vec<bool>>::local_type() {
            LocalType::Map(Some(k), Some(v)) => {
                assert!(matches!(*k, LocalType::String));
                assert!(matches!(v.element(), Some(LocalType::Bool)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wire_name_defaults() {
        struct Shape;
        let decl = StructDecl::of::<Shape>();
        assert_eq!(decl.resolved_wire_name(), "Shape");
        assert_eq!(decl.wire_name("Polygon").resolved_wire_name(), "Polygon");

        let method = MethodDecl::new("add");
        assert_eq!(method.resolved_wire_name(), "add");
        assert_eq!(method.wire_name("sum").resolved_wire_name(), "sum");
    }

    #[test]
    fn test_named_local_id() {
        assert_eq!(
            Duration::local_type().local_id().as_deref(),
            Some(std::any::type_name::<Duration>())
        );
        assert_eq!(LocalType::Int.local_id(), None);
    }
}
