// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::items_after_statements)] // Test helpers

//! Registry persistence and merge behavior
//!
//! Snapshots written by one registry must load into another, repeatedly,
//! and an incompatible merge must leave the target untouched.

use tempfile::TempDir;
use wirecall::meta::{
    derive_enum_id, Describe, EnumDecl, LocalType, MethodDecl, ServiceDecl, StructDecl, TypeRef,
    TypeRegistry,
};
use wirecall::RpcError;

mod geo {
    pub struct Point;
}

mod legacy {
    pub struct Point;
}

mod mirror {
    pub struct Point;
}

struct Extra;

fn point() -> StructDecl {
    StructDecl::of::<geo::Point>()
        .field("x", LocalType::Int)
        .field("y", LocalType::Int)
}

fn mirror_point() -> StructDecl {
    StructDecl::of::<mirror::Point>()
        .field("x", LocalType::Int)
        .field("y", LocalType::Int)
}

fn legacy_point() -> StructDecl {
    StructDecl::of::<legacy::Point>().field("x", LocalType::Long)
}

fn extra() -> StructDecl {
    StructDecl::of::<Extra>().field("note", LocalType::String)
}

fn color() -> EnumDecl {
    EnumDecl::new("paint::Color").value("RED").value("GREEN")
}

fn canvas() -> ServiceDecl {
    ServiceDecl::new("paint::Canvas")
        .method(
            MethodDecl::new("plot")
                .param("at", LocalType::Struct(point))
                .param("color", LocalType::Enum(color)),
        )
        .method(MethodDecl::new("clear"))
}

#[test]
fn test_snapshot_survives_reopen_and_double_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("meta").join("registry.json");

    {
        let registry = TypeRegistry::open(&path, false).unwrap();
        registry.register_service(&canvas()).unwrap();
        registry.register_struct(mirror_point).unwrap();
        registry.close().unwrap();
    }
    assert!(path.exists());

    let registry = TypeRegistry::open(&path, false).unwrap();
    let service = registry.find_service("Canvas").expect("service restored");
    assert_eq!(service.methods.len(), 2);
    assert!(registry.find_struct("Point").is_some());
    assert!(registry
        .find_struct_by_local(std::any::type_name::<geo::Point>())
        .is_some());
    let mirrored = registry
        .find_struct_by_local(std::any::type_name::<mirror::Point>())
        .expect("secondary binding restored");
    assert_eq!(mirrored.name, "Point");
    assert_eq!(registry.snapshot().structs().len(), 1);

    let before = registry.snapshot();
    registry.load(&path).unwrap();
    registry.load(&path).unwrap();
    assert_eq!(registry.snapshot(), before);

    // Re-registering against the restored definitions is a no-op.
    let again = registry.register_service(&canvas()).unwrap();
    assert_eq!(again, service);
}

#[test]
fn test_open_missing_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    let registry = TypeRegistry::open(dir.path().join("absent.json"), false).unwrap();
    assert!(registry.snapshot().is_empty());
}

#[test]
fn test_corrupt_snapshot_is_persistence_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    match TypeRegistry::open(&path, false) {
        Err(RpcError::Persistence(_)) => {}
        other => panic!("unexpected {:?}", other.map(|r| r.snapshot())),
    }
}

#[test]
fn test_incompatible_merge_applies_nothing() {
    let target = TypeRegistry::new();
    target.register_struct(point).unwrap();

    let source = TypeRegistry::new();
    source.register_struct(extra).unwrap();
    source.register_struct(legacy_point).unwrap();

    let err = target.merge(&source.snapshot()).unwrap_err();
    assert!(err.to_string().contains("Point"), "unexpected {}", err);
    assert!(target.find_struct("Extra").is_none());
    assert_eq!(target.snapshot().structs().len(), 1);
}

#[test]
fn test_compatible_merge_binds_local_names() {
    let target = TypeRegistry::new();
    target.register_struct(point).unwrap();

    let source = TypeRegistry::new();
    source.register_struct(extra).unwrap();
    source.register_struct(point).unwrap();

    target.merge(&source.snapshot()).unwrap();
    assert!(target.find_struct("Extra").is_some());
    assert_eq!(target.snapshot().structs().len(), 2);
}

#[test]
fn test_enum_ids_follow_names() {
    let registry = TypeRegistry::new();
    let def = registry.register_enum(color).unwrap();

    assert_eq!(def.value("RED").map(|v| v.id), Some(-584_668_284));
    assert_eq!(def.value("GREEN").map(|v| v.id), Some(-501_278_174));
    assert_eq!(derive_enum_id("RED"), -584_668_284);
}

struct Node;

impl Describe for Node {
    fn local_type() -> LocalType {
        LocalType::Struct(|| {
            StructDecl::of::<Node>()
                .field("label", LocalType::String)
                .field("children", Vec::<Node>::local_type())
                .field("parent", LocalType::Struct(Node::decl))
        })
    }
}

impl Node {
    fn decl() -> StructDecl {
        match Self::local_type() {
            LocalType::Struct(decl) => decl(),
            _ => unreachable!(),
        }
    }
}

#[test]
fn test_self_referential_struct() {
    let registry = TypeRegistry::new();
    let r = registry.type_ref(&Node::local_type()).unwrap();
    assert_eq!(r, TypeRef::Struct("Node".into()));

    let def = registry.find_struct("Node").unwrap();
    let children = def.field("children").unwrap();
    assert_eq!(children.ty.type_ref, TypeRef::List);
    assert_eq!(children.ty.element, Some(TypeRef::Struct("Node".into())));
    assert_eq!(
        def.field("parent").map(|f| f.ty.type_ref.clone()),
        Some(TypeRef::Struct("Node".into()))
    );
    assert_eq!(registry.snapshot().structs().len(), 1);
}
