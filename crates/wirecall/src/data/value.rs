// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime values carried by calls.

use super::DynamicStruct;
use crate::error::{RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A value that can travel as an argument, result or failure detail.
///
/// Everything except [`Value::Local`] is wire-representable. Local values
/// wrap a domain type that only an adapter can put on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    #[default]
    Null,

    // Primitives
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(#[serde(with = "double_repr")] f64),
    String(String),

    // Containers
    List(Vec<Value>),
    /// Insertion ordered, duplicates collapsed on construction.
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),

    // Composites
    Struct(DynamicStruct),
    Enum(EnumValue),

    // Local only
    #[serde(skip)]
    Local(LocalValue),
}

impl Value {
    /// Build a set, dropping repeated elements.
    pub fn set<I: IntoIterator<Item = Value>>(items: I) -> Self {
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Self::Set(out)
    }

    /// Wrap a local domain value.
    pub fn local<T: Any + Send + Sync>(value: T) -> Self {
        Self::Local(LocalValue::new(value))
    }

    /// Check if value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i64 (widens INT).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as struct.
    pub fn as_struct(&self) -> Option<&DynamicStruct> {
        match self {
            Self::Struct(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get list or set elements.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) | Self::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as a local value of type `T`.
    pub fn as_local<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Local(v) => v.downcast_ref(),
            _ => None,
        }
    }

    /// Short label of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::Local(_) => "local",
        }
    }

    /// Check whether the value, including nested values, can be encoded.
    pub fn is_representable(&self) -> bool {
        match self {
            Self::Local(_) => false,
            Self::List(items) | Self::Set(items) => items.iter().all(Value::is_representable),
            Self::Map(entries) => entries
                .iter()
                .all(|(k, v)| k.is_representable() && v.is_representable()),
            Self::Struct(s) => s.fields().all(|(_, v)| v.is_representable()),
            _ => true,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DynamicStruct> for Value {
    fn from(v: DynamicStruct) -> Self {
        Self::Struct(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Self::Enum(v)
    }
}

// ---------------------------------------------------------------------------
// EnumValue
// ---------------------------------------------------------------------------

/// One value of a wire enum, identified by enum and value wire names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    #[serde(rename = "enum")]
    pub type_name: String,
    pub name: String,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LocalValue
// ---------------------------------------------------------------------------

/// A local domain value with no wire representation of its own.
///
/// Identified by its Rust type name, which is also the local-type
/// identifier adapters are registered under.
#[derive(Clone)]
pub struct LocalValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl LocalValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Local-type identifier of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for LocalValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LocalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Conversion of a Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion of a [`Value`] back into a Rust value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> RpcResult<Self>;
}

fn mismatch<T>(expected: &str, got: &Value) -> RpcResult<T> {
    Err(RpcError::conversion(format!(
        "expected {}, got {}",
        expected,
        got.kind()
    )))
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> RpcResult<Self> {
        Ok(value)
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::Null => Ok(()),
            other => mismatch("null", &other),
        }
    }
}

macro_rules! primitive_conversions {
    ($ty:ty, $variant:ident, $label:literal) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> RpcResult<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => mismatch($label, &other),
                }
            }
        }
    };
}

primitive_conversions!(bool, Bool, "bool");
primitive_conversions!(i32, Int, "int");
primitive_conversions!(f64, Double, "double");
primitive_conversions!(String, String, "string");
primitive_conversions!(DynamicStruct, Struct, "struct");
primitive_conversions!(EnumValue, Enum, "enum");

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Long(self)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::Long(v) => Ok(v),
            Value::Int(v) => Ok(i64::from(v)),
            other => mismatch("long", &other),
        }
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => mismatch("list", &other),
        }
    }
}

impl<T: IntoValue> IntoValue for HashSet<T> {
    fn into_value(self) -> Value {
        Value::set(self.into_iter().map(IntoValue::into_value))
    }
}

impl<T: FromValue + Eq + Hash> FromValue for HashSet<T> {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => mismatch("set", &other),
        }
    }
}

impl<T: IntoValue> IntoValue for BTreeSet<T> {
    fn into_value(self) -> Value {
        Value::set(self.into_iter().map(IntoValue::into_value))
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => mismatch("set", &other),
        }
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for HashMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: FromValue + Eq + Hash, V: FromValue> FromValue for HashMap<K, V> {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => mismatch("map", &other),
        }
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> RpcResult<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => mismatch("map", &other),
        }
    }
}

macro_rules! local_conversions {
    ($ty:ty) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::local(self)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> RpcResult<Self> {
                match value.as_local::<$ty>() {
                    Some(v) => Ok(*v),
                    None => mismatch(std::any::type_name::<$ty>(), &value),
                }
            }
        }
    };
}

local_conversions!(Duration);
local_conversions!(SystemTime);
local_conversions!(IpAddr);

/// Wire form of doubles: finite values as JSON numbers, NaN and the
/// infinities as the string tokens `"NaN"`, `"Infinity"` and `"-Infinity"`.
mod double_repr {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    #[allow(clippy::trivially_copy_pass_by_ref)] // serde `with` signature
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { INFINITY } else { NEG_INFINITY })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(DoubleVisitor)
    }

    struct DoubleVisitor;

    impl Visitor<'_> for DoubleVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a number or one of {}, {}, {}", NAN, INFINITY, NEG_INFINITY)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}
