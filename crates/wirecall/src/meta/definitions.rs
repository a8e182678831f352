// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire-level definitions of structs, enums and services.

use super::TypeRef;
use crate::config::REQUEST_STRUCT_SUFFIX;
use crate::data::{DynamicStruct, Value};
use crate::error::{RpcError, RpcResult, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which family of definition a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Struct,
    Enum,
    Service,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Service => "service",
        })
    }
}

/// Common view over the three definition families, used by the index.
pub trait Definition: Clone + PartialEq {
    const KIND: DefinitionKind;

    /// Wire name.
    fn name(&self) -> &str;

    /// Primary local-type identifier.
    fn local_name(&self) -> &str;

    /// Shape check ignoring local names; `Err` lists the differences.
    fn check_compatible(&self, other: &Self) -> Result<(), Vec<String>>;
}

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// A type together with the element/key/value types containers need.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueType {
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<TypeRef>,
}

impl ValueType {
    pub fn of(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            element: None,
            key: None,
            value: None,
        }
    }

    pub fn list(element: TypeRef) -> Self {
        Self {
            element: Some(element),
            ..Self::of(TypeRef::List)
        }
    }

    pub fn set(element: TypeRef) -> Self {
        Self {
            element: Some(element),
            ..Self::of(TypeRef::Set)
        }
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
            ..Self::of(TypeRef::Map)
        }
    }

    /// LIST/SET must carry an element type, MAP a key and a value type.
    pub fn validate(&self, owner: &str, member: &str) -> Result<(), SchemaError> {
        match self.type_ref {
            TypeRef::List | TypeRef::Set if self.element.is_none() => Err(SchemaError::new(
                owner,
                format!("{} '{}' has no element type", self.type_ref, member),
            )),
            TypeRef::Map if self.key.is_none() || self.value.is_none() => Err(SchemaError::new(
                owner,
                format!("map '{}' needs both key and value types", member),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.element, &self.key, &self.value) {
            (Some(e), _, _) => write!(f, "{}<{}>", self.type_ref, e),
            (None, Some(k), Some(v)) => write!(f, "{}<{}, {}>", self.type_ref, k, v),
            _ => write!(f, "{}", self.type_ref),
        }
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    /// Local field name when it differs from the wire name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(flatten)]
    pub ty: ValueType,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            local_name: None,
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructDefinition {
    pub name: String,
    pub local_name: String,
    pub fields: Vec<FieldDefinition>,
}

impl StructDefinition {
    pub fn new(name: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_name: local_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names unique, container fields fully typed.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::new(
                    &self.name,
                    format!("duplicate field '{}'", field.name),
                ));
            }
            field.ty.validate(&self.name, &field.name)?;
        }
        Ok(())
    }
}

impl Definition for StructDefinition {
    const KIND: DefinitionKind = DefinitionKind::Struct;

    fn name(&self) -> &str {
        &self.name
    }

    fn local_name(&self) -> &str {
        &self.local_name
    }

    fn check_compatible(&self, other: &Self) -> Result<(), Vec<String>> {
        let mut details = Vec::new();
        if self.fields.len() != other.fields.len() {
            details.push(format!(
                "field count differs: {} vs {}",
                self.fields.len(),
                other.fields.len()
            ));
        }
        for (i, (a, b)) in self.fields.iter().zip(&other.fields).enumerate() {
            if a.name != b.name {
                details.push(format!("field {} renamed: {} -> {}", i, a.name, b.name));
            } else if a.ty != b.ty {
                details.push(format!("changed type of {}: {} -> {}", a.name, a.ty, b.ty));
            }
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(details)
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    /// Explicit (non-negative) or derived (negative) wire id.
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDefinition {
    pub name: String,
    pub local_name: String,
    pub values: Vec<EnumValueDefinition>,
}

impl EnumDefinition {
    pub fn value(&self, name: &str) -> Option<&EnumValueDefinition> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn value_by_id(&self, id: i64) -> Option<&EnumValueDefinition> {
        self.values.iter().find(|v| v.id == id)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for value in &self.values {
            if !names.insert(value.name.as_str()) {
                return Err(SchemaError::new(
                    &self.name,
                    format!("duplicate value '{}'", value.name),
                ));
            }
            if !ids.insert(value.id) {
                return Err(SchemaError::new(
                    &self.name,
                    format!("value '{}' reuses id {}", value.name, value.id),
                ));
            }
        }
        Ok(())
    }
}

impl Definition for EnumDefinition {
    const KIND: DefinitionKind = DefinitionKind::Enum;

    fn name(&self) -> &str {
        &self.name
    }

    fn local_name(&self) -> &str {
        &self.local_name
    }

    fn check_compatible(&self, other: &Self) -> Result<(), Vec<String>> {
        let mut details = Vec::new();
        if self.values.len() != other.values.len() {
            details.push(format!(
                "value count differs: {} vs {}",
                self.values.len(),
                other.values.len()
            ));
        }
        for (a, b) in self.values.iter().zip(&other.values) {
            if a.name != b.name {
                details.push(format!("value renamed: {} -> {}", a.name, b.name));
            } else if a.id != b.id {
                details.push(format!("changed id of {}: {} -> {}", a.name, a.id, b.id));
            }
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(details)
        }
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(flatten)]
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDefinition {
    pub name: String,
    /// Local method name when it differs from the wire name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    pub returns: TypeRef,
    pub parameters: Vec<ParameterDefinition>,
}

impl MethodDefinition {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Name the implementation knows this method by.
    pub fn implementation_name(&self) -> &str {
        self.local_name.as_deref().unwrap_or(&self.name)
    }

    /// Pack positional arguments into a struct keyed by parameter names.
    pub fn pack_arguments(&self, args: Vec<Value>) -> RpcResult<DynamicStruct> {
        if args.len() != self.arity() {
            return Err(RpcError::conversion(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.arity(),
                args.len()
            )));
        }
        let mut packed = DynamicStruct::new(format!("{}{}", self.name, REQUEST_STRUCT_SUFFIX));
        for (param, arg) in self.parameters.iter().zip(args) {
            packed.set_field(param.name.as_str(), arg);
        }
        Ok(packed)
    }

    /// Unpack arguments in declared parameter order; missing ones are null.
    pub fn unpack_arguments(&self, mut packed: DynamicStruct) -> Vec<Value> {
        self.parameters
            .iter()
            .map(|p| packed.remove_field(&p.name).unwrap_or(Value::Null))
            .collect()
    }

    /// Render the definition as a struct, as answered to metadata probes.
    pub fn to_struct(&self) -> DynamicStruct {
        let parameters = self
            .parameters
            .iter()
            .map(|p| {
                Value::Struct(
                    DynamicStruct::new("Parameter")
                        .with_field("name", p.name.as_str())
                        .with_field("type", p.ty.to_string()),
                )
            })
            .collect::<Vec<_>>();

        DynamicStruct::new("Method")
            .with_field("name", self.name.as_str())
            .with_field("returns", self.returns.to_string())
            .with_field("parameters", Value::List(parameters))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub name: String,
    pub local_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<TypeRef>,
    pub methods: Vec<MethodDefinition>,
}

impl ServiceDefinition {
    /// Resolve a method by wire name and exact parameter count.
    pub fn resolve(&self, name: &str, arity: usize) -> Option<&MethodDefinition> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.arity() == arity)
    }

    /// Resolve a method by its local (implementation) name.
    pub fn method_by_local_name(&self, local: &str) -> Option<&MethodDefinition> {
        self.methods
            .iter()
            .find(|m| m.implementation_name() == local)
    }
}

impl Definition for ServiceDefinition {
    const KIND: DefinitionKind = DefinitionKind::Service;

    fn name(&self) -> &str {
        &self.name
    }

    fn local_name(&self) -> &str {
        &self.local_name
    }

    fn check_compatible(&self, other: &Self) -> Result<(), Vec<String>> {
        let mut details = Vec::new();
        if self.methods.len() != other.methods.len() {
            details.push(format!(
                "method count differs: {} vs {}",
                self.methods.len(),
                other.methods.len()
            ));
        }
        for (a, b) in self.methods.iter().zip(&other.methods) {
            if a.name != b.name {
                details.push(format!("method renamed: {} -> {}", a.name, b.name));
                continue;
            }
            if a.returns != b.returns {
                details.push(format!(
                    "changed return type of {}: {} -> {}",
                    a.name, a.returns, b.returns
                ));
            }
            if a.parameters.len() != b.parameters.len() {
                details.push(format!(
                    "parameter count of {} differs: {} vs {}",
                    a.name,
                    a.parameters.len(),
                    b.parameters.len()
                ));
            }
            for (pa, pb) in a.parameters.iter().zip(&b.parameters) {
                if pa.name != pb.name {
                    details.push(format!(
                        "parameter of {} renamed: {} -> {}",
                        a.name, pa.name, pb.name
                    ));
                } else if pa.ty != pb.ty {
                    details.push(format!(
                        "changed type of {}.{}: {} -> {}",
                        a.name, pa.name, pa.ty, pb.ty
                    ));
                }
            }
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, params: &[(&str, TypeRef)]) -> MethodDefinition {
        MethodDefinition {
            name: name.to_string(),
            local_name: None,
            returns: TypeRef::Int,
            parameters: params
                .iter()
                .map(|(n, t)| ParameterDefinition {
                    name: n.to_string(),
                    ty: ValueType::of(t.clone()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_list_field_requires_element() {
        let mut def = StructDefinition::new("Bag", "demo::Bag");
        def.fields
            .push(FieldDefinition::new("items", ValueType::of(TypeRef::List)));

        let err = def.validate().unwrap_err();
        assert_eq!(err.type_name(), "Bag");
        assert!(err.reason().contains("items"));
    }

    #[test]
    fn test_map_field_requires_key_and_value() {
        let mut def = StructDefinition::new("Index", "demo::Index");
        def.fields.push(FieldDefinition::new(
            "entries",
            ValueType {
                key: Some(TypeRef::String),
                ..ValueType::of(TypeRef::Map)
            },
        ));
        assert!(def.validate().is_err());

        def.fields[0].ty = ValueType::map(TypeRef::String, TypeRef::Long);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut def = StructDefinition::new("P", "demo::P");
        def.fields
            .push(FieldDefinition::new("x", ValueType::of(TypeRef::Int)));
        def.fields
            .push(FieldDefinition::new("x", ValueType::of(TypeRef::Long)));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_struct_compat_ignores_local_names() {
        let mut a = StructDefinition::new("P", "one::P");
        a.fields
            .push(FieldDefinition::new("x", ValueType::of(TypeRef::Int)));
        let mut b = a.clone();
        b.local_name = "two::P".into();
        b.fields[0].local_name = Some("x_coord".into());

        assert!(a.check_compatible(&b).is_ok());

        b.fields[0].ty = ValueType::of(TypeRef::Long);
        let details = a.check_compatible(&b).unwrap_err();
        assert_eq!(details, vec!["changed type of x: int -> long".to_string()]);
    }

    #[test]
    fn test_service_compat_detects_parameter_changes() {
        let a = ServiceDefinition {
            name: "Calc".into(),
            local_name: "demo::Calc".into(),
            session: None,
            methods: vec![method("add", &[("a", TypeRef::Int), ("b", TypeRef::Int)])],
        };

        let mut renamed = a.clone();
        renamed.methods[0].parameters[1].name = "c".into();
        assert!(a.check_compatible(&renamed).is_err());

        let mut missing = a.clone();
        missing.methods[0].parameters.pop();
        assert!(a.check_compatible(&missing).is_err());

        let mut local_only = a.clone();
        local_only.methods[0].local_name = Some("plus".into());
        assert!(a.check_compatible(&local_only).is_ok());
    }

    #[test]
    fn test_resolve_by_name_and_arity() {
        let def = ServiceDefinition {
            name: "Calc".into(),
            local_name: "demo::Calc".into(),
            session: None,
            methods: vec![
                method("sum", &[("a", TypeRef::Int)]),
                method("sum", &[("a", TypeRef::Int), ("b", TypeRef::Int)]),
                method("neg", &[("a", TypeRef::Int)]),
            ],
        };

        assert_eq!(def.resolve("sum", 2).map(|m| m.arity()), Some(2));
        assert_eq!(def.resolve("sum", 1).map(|m| m.arity()), Some(1));
        assert!(def.resolve("sum", 3).is_none());
        assert!(def.resolve("neg", 0).is_none());
        assert!(def.resolve("neg", 2).is_none());
        assert!(def.resolve("mul", 2).is_none());
    }
}
