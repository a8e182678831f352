// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type metadata: declarations, wire definitions and the type registry.
//!
//! Local types are described with the builders in [`decl`]; the
//! [`TypeRegistry`] turns them into [`StructDefinition`],
//! [`EnumDefinition`] and [`ServiceDefinition`] values collected in a
//! [`MetaData`] aggregate that peers can merge and persist.

mod decl;
mod definitions;
mod metadata;
mod persistence;
mod registry;
mod type_tag;

pub use decl::{
    simple_name, Describe, EnumDecl, EnumValueDecl, FieldDecl, LocalType, MethodDecl, ParamDecl,
    ServiceDecl, StructDecl,
};
pub use definitions::{
    Definition, DefinitionKind, EnumDefinition, EnumValueDefinition, FieldDefinition,
    MethodDefinition, ParameterDefinition, ServiceDefinition, StructDefinition, ValueType,
};
pub use metadata::{DefinitionIndex, Handle, MetaData};
pub use persistence::{load_snapshot, save_snapshot};
pub use registry::TypeRegistry;
pub use type_tag::{derive_enum_id, TypeRef, TypeTag};
