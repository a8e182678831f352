// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry: builds wire definitions from local declarations.
//!
//! Definitions are created lazily on first reference and memoized by
//! local-type identifier. A struct is inserted into the index as an empty
//! placeholder before its fields are resolved, so a field that refers back
//! to the struct finds the placeholder instead of recursing forever.
//!
//! Lookups take a read lock; the first registration of a type takes the
//! write lock for its whole duration, so readers never observe a
//! placeholder and two threads cannot register the same type twice.

use super::decl::{EnumDecl, LocalType, ServiceDecl, StructDecl};
use super::definitions::{
    Definition, DefinitionKind, EnumDefinition, EnumValueDefinition, FieldDefinition,
    MethodDefinition, ParameterDefinition, ServiceDefinition, StructDefinition, ValueType,
};
use super::metadata::{DefinitionIndex, MetaData};
use super::persistence::{load_snapshot, save_snapshot};
use super::type_tag::{derive_enum_id, TypeRef, TypeTag};
use crate::adapter::{Adapter, AdapterRegistry, DurationAdapter, IpAddrAdapter, SystemTimeAdapter};
use crate::config::ASYNC_SUFFIX;
use crate::error::{IncompatibleSchemaError, RpcError, RpcResult, SchemaError};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Registry of struct, enum and service definitions plus adapters.
///
/// # Example
///
/// ```
/// use wirecall::meta::{LocalType, MethodDecl, ServiceDecl, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let calc = ServiceDecl::new("demo::Calculator").method(
///     MethodDecl::new("add")
///         .param("a", LocalType::Int)
///         .param("b", LocalType::Int)
///         .returns(LocalType::Int),
/// );
///
/// let def = registry.register_service(&calc).unwrap();
/// assert_eq!(def.name, "Calculator");
/// assert_eq!(def.methods[0].parameters.len(), 2);
/// ```
pub struct TypeRegistry {
    meta: RwLock<MetaData>,
    adapters: AdapterRegistry,
    snapshot: Option<PathBuf>,
    closed: AtomicBool,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create an empty registry without adapters.
    pub fn new() -> Self {
        Self {
            meta: RwLock::new(MetaData::new()),
            adapters: AdapterRegistry::new(),
            snapshot: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Create a registry with the built-in adapters installed.
    pub fn with_auto_adapters() -> RpcResult<Self> {
        let registry = Self::new();
        registry.install_builtin_adapters()?;
        Ok(registry)
    }

    /// Create a registry backed by a snapshot file.
    ///
    /// An existing snapshot is merged in immediately; the registry is
    /// written back on [`close`](Self::close), or on drop.
    pub fn open(path: impl Into<PathBuf>, auto_adapters: bool) -> RpcResult<Self> {
        let path = path.into();
        let mut registry = Self::new();
        if auto_adapters {
            registry.install_builtin_adapters()?;
        }
        registry.load(&path)?;
        registry.snapshot = Some(path);
        Ok(registry)
    }

    fn install_builtin_adapters(&self) -> RpcResult<()> {
        self.register_adapter(DurationAdapter)?;
        self.register_adapter(SystemTimeAdapter)?;
        self.register_adapter(IpAddrAdapter)?;
        Ok(())
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Copy of the current definitions.
    pub fn snapshot(&self) -> MetaData {
        self.meta.read().clone()
    }

    // === Adapters ===

    /// Register an adapter and the definition of its remote shape.
    pub fn register_adapter<A: Adapter>(&self, adapter: A) -> RpcResult<()> {
        let local_name = std::any::type_name::<A::Local>();
        let remote = adapter.remote_type();

        match self.classify(&remote) {
            Some(tag) if !tag.is_container() => {}
            _ => {
                return Err(RpcError::schema(
                    local_name,
                    "adapter remote type must reduce to a primitive, struct or enum",
                ))
            }
        }

        let remote_struct = match &remote {
            LocalType::Struct(decl) => Some(self.register_struct(*decl)?.name),
            LocalType::Enum(decl) => {
                self.register_enum(*decl)?;
                None
            }
            _ => None,
        };

        self.adapters.insert(adapter, remote_struct);
        log::debug!("registry: registered adapter for {}", local_name);
        Ok(())
    }

    // === Classification ===

    /// Wire tag of a local type, or `None` when it has no wire form.
    pub fn classify(&self, ty: &LocalType) -> Option<TypeTag> {
        if let Some(remote) = ty.local_id().and_then(|id| self.adapters.remote_type_of(&id)) {
            return self.classify(&remote);
        }
        match ty {
            LocalType::Bool => Some(TypeTag::Bool),
            LocalType::Int => Some(TypeTag::Int),
            LocalType::Long => Some(TypeTag::Long),
            LocalType::Double => Some(TypeTag::Double),
            LocalType::String => Some(TypeTag::String),
            LocalType::List(_) => Some(TypeTag::List),
            LocalType::Set(_) => Some(TypeTag::Set),
            LocalType::Map(..) => Some(TypeTag::Map),
            LocalType::Struct(_) | LocalType::Dynamic => Some(TypeTag::Struct),
            LocalType::Enum(_) => Some(TypeTag::Enum),
            LocalType::Void | LocalType::Named(_) => None,
        }
    }

    /// Resolve a local type to the type reference stored in definitions,
    /// registering any struct or enum it names.
    pub fn type_ref(&self, ty: &LocalType) -> RpcResult<TypeRef> {
        if let Some(tag) = self.classify(ty) {
            if tag.is_primitive() || tag.is_container() {
                if let Some(r) = TypeRef::from_tag(tag) {
                    return Ok(r);
                }
            }
        }
        self.write(|reg| reg.value_type(ty, "<type>", "<value>").map(|vt| vt.type_ref))
    }

    // === Registration ===

    /// Register a struct and everything its fields reference.
    pub fn register_struct(&self, decl: fn() -> StructDecl) -> RpcResult<StructDefinition> {
        let local = decl().local_name;
        if let Some(def) = self.meta.read().structs().by_local(&local) {
            return Ok(def.clone());
        }
        self.write(|reg| {
            let name = reg.struct_def(decl)?;
            reg.meta
                .structs()
                .by_name(&name)
                .cloned()
                .ok_or_else(|| RpcError::schema(&local, "definition vanished"))
        })
    }

    /// Register an enum.
    pub fn register_enum(&self, decl: fn() -> EnumDecl) -> RpcResult<EnumDefinition> {
        let local = decl().local_name;
        if let Some(def) = self.meta.read().enums().by_local(&local) {
            return Ok(def.clone());
        }
        self.write(|reg| {
            let name = reg.enum_def(decl)?;
            reg.meta
                .enums()
                .by_name(&name)
                .cloned()
                .ok_or_else(|| RpcError::schema(&local, "definition vanished"))
        })
    }

    /// Register a service, its parameter and return types.
    pub fn register_service(&self, decl: &ServiceDecl) -> RpcResult<ServiceDefinition> {
        if let Some(def) = self.meta.read().services().by_local(&decl.local_name) {
            return Ok(def.clone());
        }
        self.write(|reg| reg.service_def(decl))
    }

    /// Run a registration under the write lock; on failure the definitions
    /// are restored to their state before the call.
    fn write<T>(&self, op: impl FnOnce(&mut Registrar<'_>) -> RpcResult<T>) -> RpcResult<T> {
        let mut meta = self.meta.write();
        let checkpoint = meta.checkpoint();
        let mut reg = Registrar {
            meta: &mut meta,
            adapters: &self.adapters,
            bound: Vec::new(),
        };
        let result = op(&mut reg);
        if result.is_err() {
            let bound = std::mem::take(&mut reg.bound);
            meta.rollback(checkpoint, &bound);
        }
        result
    }

    // === Lookup ===

    pub fn find_struct(&self, name: &str) -> Option<StructDefinition> {
        self.meta.read().structs().by_name(name).cloned()
    }

    pub fn find_struct_by_local(&self, local: &str) -> Option<StructDefinition> {
        self.meta.read().structs().by_local(local).cloned()
    }

    pub fn find_enum(&self, name: &str) -> Option<EnumDefinition> {
        self.meta.read().enums().by_name(name).cloned()
    }

    pub fn find_enum_by_local(&self, local: &str) -> Option<EnumDefinition> {
        self.meta.read().enums().by_local(local).cloned()
    }

    pub fn find_service(&self, name: &str) -> Option<ServiceDefinition> {
        self.meta.read().services().by_name(name).cloned()
    }

    pub fn find_service_by_local(&self, local: &str) -> Option<ServiceDefinition> {
        self.meta.read().services().by_local(local).cloned()
    }

    // === Snapshots ===

    /// Merge a metadata aggregate into the registry.
    pub fn merge(&self, other: &MetaData) -> Result<(), IncompatibleSchemaError> {
        self.meta.write().merge(other)
    }

    /// Merge the snapshot stored at `path`, if any.
    pub fn load(&self, path: &Path) -> RpcResult<()> {
        if let Some(meta) = load_snapshot(path)? {
            self.merge(&meta)?;
            log::debug!("registry: loaded {} from {}", meta, path.display());
        }
        Ok(())
    }

    /// Write all definitions to `path`.
    pub fn save(&self, path: &Path) -> RpcResult<()> {
        let meta = self.snapshot();
        save_snapshot(path, &meta)?;
        log::debug!("registry: saved {} to {}", meta, path.display());
        Ok(())
    }

    /// Save to the snapshot file the registry was opened with.
    pub fn close(&self) -> RpcResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match &self.snapshot {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }
}

impl Drop for TypeRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("registry: failed to save snapshot on drop: {}", e);
        }
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("meta", &*self.meta.read())
            .field("adapters", &self.adapters)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Registrar
// ---------------------------------------------------------------------------

/// Write-side view used while holding the registry's write lock.
struct Registrar<'a> {
    meta: &'a mut MetaData,
    adapters: &'a AdapterRegistry,
    /// Local names bound to pre-existing definitions during this call
    bound: Vec<(DefinitionKind, String)>,
}

impl Registrar<'_> {
    fn value_type(&mut self, ty: &LocalType, owner: &str, member: &str) -> RpcResult<ValueType> {
        if let Some(remote) = ty.local_id().and_then(|id| self.adapters.remote_type_of(&id)) {
            return self.value_type(&remote, owner, member);
        }

        let vt = match ty {
            LocalType::Void => ValueType::of(TypeRef::Void),
            LocalType::Bool => ValueType::of(TypeRef::Bool),
            LocalType::Int => ValueType::of(TypeRef::Int),
            LocalType::Long => ValueType::of(TypeRef::Long),
            LocalType::Double => ValueType::of(TypeRef::Double),
            LocalType::String => ValueType::of(TypeRef::String),
            LocalType::Dynamic => ValueType::of(TypeRef::Dynamic),
            LocalType::List(elem) => ValueType {
                element: self.element_ref(elem.as_deref(), owner, member)?,
                ..ValueType::of(TypeRef::List)
            },
            LocalType::Set(elem) => ValueType {
                element: self.element_ref(elem.as_deref(), owner, member)?,
                ..ValueType::of(TypeRef::Set)
            },
            LocalType::Map(key, value) => ValueType {
                key: self.element_ref(key.as_deref(), owner, member)?,
                value: self.element_ref(value.as_deref(), owner, member)?,
                ..ValueType::of(TypeRef::Map)
            },
            LocalType::Struct(decl) => ValueType::of(TypeRef::Struct(self.struct_def(*decl)?)),
            LocalType::Enum(decl) => ValueType::of(TypeRef::Enum(self.enum_def(*decl)?)),
            LocalType::Named(id) => {
                return Err(RpcError::schema(
                    owner,
                    format!("'{}' has local type {} with no adapter", member, id),
                ))
            }
        };
        vt.validate(owner, member)?;
        Ok(vt)
    }

    fn element_ref(
        &mut self,
        ty: Option<&LocalType>,
        owner: &str,
        member: &str,
    ) -> RpcResult<Option<TypeRef>> {
        match ty {
            Some(ty) => {
                let vt = self.value_type(ty, owner, member)?;
                if vt.type_ref == TypeRef::Void {
                    return Err(RpcError::schema(owner, format!("'{}' holds void", member)));
                }
                Ok(Some(vt.type_ref))
            }
            None => Ok(None),
        }
    }

    /// Register a struct, returning its wire name.
    fn struct_def(&mut self, decl_fn: fn() -> StructDecl) -> RpcResult<String> {
        let decl = decl_fn();
        if let Some(def) = self.meta.structs().by_local(&decl.local_name) {
            return Ok(def.name.clone());
        }
        let name = decl.resolved_wire_name();

        // Another local type already owns the wire name: bind this one to it
        // first (cycle guard), then require an identical shape.
        if let Some(handle) = self.meta.structs().handle_by_name(&name) {
            self.meta
                .structs_mut()
                .bind_local(decl.local_name.clone(), handle);
            self.bound
                .push((DefinitionKind::Struct, decl.local_name.clone()));
            let candidate = self.fill_struct(&decl, &name)?;
            if let Some(existing) = self.meta.structs().get(handle) {
                existing.check_compatible(&candidate).map_err(|details| {
                    IncompatibleSchemaError::new(StructDefinition::KIND, &name, details.join("; "))
                })?;
            }
            log::debug!("registry: bound {} to struct '{}'", decl.local_name, name);
            return Ok(name);
        }

        let handle = self
            .meta
            .structs_mut()
            .insert(StructDefinition::new(&name, &decl.local_name));
        let filled = self.fill_struct(&decl, &name)?;
        if let Some(slot) = self.meta.structs_mut().get_mut(handle) {
            *slot = filled;
        }
        log::debug!("registry: registered struct '{}' ({})", name, decl.local_name);
        Ok(name)
    }

    fn fill_struct(&mut self, decl: &StructDecl, name: &str) -> RpcResult<StructDefinition> {
        let mut def = StructDefinition::new(name, &decl.local_name);
        for field in &decl.fields {
            let wire = field.wire_name();
            let ty = self.value_type(&field.ty, name, wire)?;
            if ty.type_ref == TypeRef::Void {
                return Err(RpcError::schema(name, format!("field '{}' is void", wire)));
            }
            def.fields.push(FieldDefinition {
                name: wire.to_string(),
                local_name: field.wire_name.as_ref().map(|_| field.name.clone()),
                ty,
            });
        }
        def.validate()?;
        Ok(def)
    }

    /// Register an enum, returning its wire name.
    fn enum_def(&mut self, decl_fn: fn() -> EnumDecl) -> RpcResult<String> {
        let decl = decl_fn();
        if let Some(def) = self.meta.enums().by_local(&decl.local_name) {
            return Ok(def.name.clone());
        }
        let name = decl.resolved_wire_name();
        let values = decl
            .values
            .iter()
            .map(|v| {
                let wire = v.wire_name.clone().unwrap_or_else(|| v.name.clone());
                EnumValueDefinition {
                    id: v.id.map_or_else(|| derive_enum_id(&wire), i64::from),
                    local_name: v.wire_name.as_ref().map(|_| v.name.clone()),
                    name: wire,
                }
            })
            .collect();
        let def = EnumDefinition {
            name: name.clone(),
            local_name: decl.local_name.clone(),
            values,
        };
        def.validate()?;
        install(self.meta.enums_mut(), def, &mut self.bound)?;
        log::debug!("registry: registered enum '{}' ({})", name, decl.local_name);
        Ok(name)
    }

    fn service_def(&mut self, decl: &ServiceDecl) -> RpcResult<ServiceDefinition> {
        if let Some(def) = self.meta.services().by_local(&decl.local_name) {
            return Ok(def.clone());
        }
        let name = decl.resolved_wire_name();

        let session = match &decl.session {
            Some(ty) => Some(self.value_type(ty, &name, "session")?.type_ref),
            None => None,
        };

        let mut methods = Vec::with_capacity(decl.methods.len());
        let mut signatures = HashSet::new();
        for m in &decl.methods {
            let wire = m.resolved_wire_name();
            if m.name.ends_with(ASYNC_SUFFIX) || wire.ends_with(ASYNC_SUFFIX) {
                return Err(SchemaError::new(
                    &name,
                    format!(
                        "method '{}' must be declared without the {} suffix",
                        m.name, ASYNC_SUFFIX
                    ),
                )
                .into());
            }
            if !signatures.insert((wire.to_string(), m.params.len())) {
                return Err(SchemaError::new(
                    &name,
                    format!("method '{}' declared twice with {} parameters", wire, m.params.len()),
                )
                .into());
            }

            let mut parameters = Vec::with_capacity(m.params.len());
            let mut param_names = HashSet::new();
            for p in &m.params {
                if !param_names.insert(p.name.as_str()) {
                    return Err(RpcError::schema(
                        &name,
                        format!("method '{}' repeats parameter '{}'", wire, p.name),
                    ));
                }
                let member = format!("{}.{}", wire, p.name);
                let ty = self.value_type(&p.ty, &name, &member)?;
                if ty.type_ref == TypeRef::Void {
                    return Err(RpcError::schema(&name, format!("parameter '{}' is void", member)));
                }
                parameters.push(ParameterDefinition {
                    name: p.name.clone(),
                    ty,
                });
            }

            let returns = self.value_type(&m.returns, &name, wire)?.type_ref;
            methods.push(MethodDefinition {
                name: wire.to_string(),
                local_name: (wire != m.name).then(|| m.name.clone()),
                returns,
                parameters,
            });
        }

        let def = ServiceDefinition {
            name: name.clone(),
            local_name: decl.local_name.clone(),
            session,
            methods,
        };
        install(self.meta.services_mut(), def.clone(), &mut self.bound)?;
        log::debug!(
            "registry: registered service '{}' with {} methods",
            name,
            def.methods.len()
        );
        Ok(def)
    }
}

/// Insert a definition, or bind its local name to a compatible definition
/// already registered under the same wire name.
fn install<T: Definition>(
    index: &mut DefinitionIndex<T>,
    def: T,
    bound: &mut Vec<(DefinitionKind, String)>,
) -> RpcResult<()> {
    match index.handle_by_name(def.name()) {
        Some(handle) => {
            if let Some(existing) = index.get(handle) {
                existing.check_compatible(&def).map_err(|details| {
                    IncompatibleSchemaError::new(T::KIND, def.name(), details.join("; "))
                })?;
            }
            index.bind_local(def.local_name().to_string(), handle);
            bound.push((T::KIND, def.local_name().to_string()));
        }
        None => {
            index.insert(def);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{Describe, MethodDecl};
    use std::collections::BTreeMap;
    use std::time::Duration;

    struct Node;

    fn node_decl() -> StructDecl {
        StructDecl::of::<Node>()
            .field("label", LocalType::String)
            .field("next", LocalType::Struct(node_decl))
            .field("children", LocalType::list_of(LocalType::Struct(node_decl)))
    }

    fn color_decl() -> EnumDecl {
        EnumDecl::new("demo::Color")
            .value("RED")
            .value_with_id("GREEN", 7)
            .renamed_value("Blue", "BLUE")
    }

    fn bag_decl() -> StructDecl {
        StructDecl::new("demo::Bag").field("items", LocalType::List(None))
    }

    #[test]
    fn test_self_reference_terminates() {
        let registry = TypeRegistry::new();
        let def = registry.register_struct(node_decl).unwrap();

        assert_eq!(def.name, "Node");
        assert_eq!(
            def.field("next").map(|f| &f.ty.type_ref),
            Some(&TypeRef::Struct("Node".into()))
        );
        assert_eq!(
            def.field("children").and_then(|f| f.ty.element.clone()),
            Some(TypeRef::Struct("Node".into()))
        );
        assert_eq!(registry.snapshot().structs().len(), 1);

        // memoized
        assert_eq!(registry.register_struct(node_decl).unwrap(), def);
        assert_eq!(registry.snapshot().structs().len(), 1);
    }

    #[test]
    fn test_missing_element_type_is_schema_error() {
        let registry = TypeRegistry::new();
        match registry.register_struct(bag_decl) {
            Err(RpcError::Schema(e)) => {
                assert_eq!(e.type_name(), "Bag");
                assert!(e.reason().contains("items"));
            }
            other => panic!("unexpected {:?}", other),
        }
        // nothing half-registered survives
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_enum_ids() {
        let registry = TypeRegistry::new();
        let def = registry.register_enum(color_decl).unwrap();

        assert_eq!(def.value("RED").map(|v| v.id), Some(derive_enum_id("RED")));
        assert_eq!(def.value("GREEN").map(|v| v.id), Some(7));
        let blue = def.value("BLUE").unwrap();
        assert_eq!(blue.local_name.as_deref(), Some("Blue"));
        assert!(blue.id < 0);
    }

    #[test]
    fn test_classify() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.classify(&LocalType::Int), Some(TypeTag::Int));
        assert_eq!(
            registry.classify(&Vec::<String>::local_type()),
            Some(TypeTag::List)
        );
        assert_eq!(
            registry.classify(&BTreeMap::<String, i64>::local_type()),
            Some(TypeTag::Map)
        );
        assert_eq!(
            registry.classify(&LocalType::Struct(node_decl)),
            Some(TypeTag::Struct)
        );
        assert_eq!(
            registry.classify(&LocalType::Enum(color_decl)),
            Some(TypeTag::Enum)
        );
        assert_eq!(registry.classify(&Duration::local_type()), None);
    }

    #[test]
    fn test_adapter_substitutes_remote_type() {
        let registry = TypeRegistry::with_auto_adapters().unwrap();
        assert_eq!(
            registry.classify(&Duration::local_type()),
            Some(TypeTag::Struct)
        );
        assert_eq!(
            registry.classify(&std::net::IpAddr::local_type()),
            Some(TypeTag::String)
        );
        assert!(registry.find_struct("Duration").is_some());
        assert_eq!(
            registry.type_ref(&Duration::local_type()).unwrap(),
            TypeRef::Struct("Duration".into())
        );
    }

    #[test]
    fn test_unadapted_named_type_rejected() {
        let registry = TypeRegistry::new();
        fn timed() -> StructDecl {
            StructDecl::new("demo::Timed").field("after", Duration::local_type())
        }
        assert!(matches!(
            registry.register_struct(timed),
            Err(RpcError::Schema(_))
        ));
    }

    #[test]
    fn test_service_registration() {
        let registry = TypeRegistry::new();
        let decl = ServiceDecl::new("demo::Graph")
            .session(LocalType::String)
            .method(
                MethodDecl::new("insert")
                    .param("node", LocalType::Struct(node_decl))
                    .param("color", LocalType::Enum(color_decl))
                    .returns(LocalType::Bool),
            )
            .method(MethodDecl::new("size").wire_name("count").returns(LocalType::Long));

        let def = registry.register_service(&decl).unwrap();
        assert_eq!(def.name, "Graph");
        assert_eq!(def.session, Some(TypeRef::String));
        assert_eq!(def.methods[0].parameters[0].ty.type_ref, TypeRef::Struct("Node".into()));
        assert_eq!(def.methods[0].parameters[1].ty.type_ref, TypeRef::Enum("Color".into()));
        assert_eq!(def.methods[1].name, "count");
        assert_eq!(def.methods[1].implementation_name(), "size");
        assert!(registry.find_struct("Node").is_some());
        assert!(registry.find_enum("Color").is_some());
        assert_eq!(registry.find_service_by_local("demo::Graph"), Some(def));
    }

    #[test]
    fn test_async_suffix_rejected_in_declaration() {
        let registry = TypeRegistry::new();
        let decl = ServiceDecl::new("demo::Bad").method(MethodDecl::new("add_async"));
        assert!(matches!(
            registry.register_service(&decl),
            Err(RpcError::Schema(_))
        ));
    }

    #[test]
    fn test_same_wire_name_different_local_binds() {
        let registry = TypeRegistry::new();
        fn a() -> StructDecl {
            StructDecl::new("one::Point").field("x", LocalType::Int)
        }
        fn b() -> StructDecl {
            StructDecl::new("two::Point").field("x", LocalType::Int)
        }
        fn c() -> StructDecl {
            StructDecl::new("three::Point").field("x", LocalType::Long)
        }

        registry.register_struct(a).unwrap();
        let bound = registry.register_struct(b).unwrap();
        assert_eq!(bound.local_name, "one::Point");
        assert!(registry.find_struct_by_local("two::Point").is_some());

        assert!(matches!(
            registry.register_struct(c),
            Err(RpcError::IncompatibleSchema(_))
        ));
        assert!(registry.find_struct_by_local("three::Point").is_none());
    }

    #[test]
    fn test_failed_service_leaves_registry_unchanged() {
        let registry = TypeRegistry::new();
        fn one() -> StructDecl {
            StructDecl::new("one::Point").field("x", LocalType::Int)
        }
        fn two() -> StructDecl {
            StructDecl::new("two::Point").field("x", LocalType::Int)
        }
        registry.register_struct(one).unwrap();
        let before = registry.snapshot();

        let decl = ServiceDecl::new("demo::Broken")
            .method(
                MethodDecl::new("insert")
                    .param("at", LocalType::Struct(two))
                    .param("node", LocalType::Struct(node_decl))
                    .param("color", LocalType::Enum(color_decl)),
            )
            .method(MethodDecl::new("wait").param("for", Duration::local_type()));

        assert!(matches!(
            registry.register_service(&decl),
            Err(RpcError::Schema(_))
        ));
        assert_eq!(registry.snapshot(), before);
        assert!(registry.find_struct_by_local("two::Point").is_none());
        assert!(registry.find_struct("Node").is_none());
        assert!(registry.find_enum("Color").is_none());

        // The same types register cleanly afterwards.
        registry.register_struct(two).unwrap();
        registry.register_struct(node_decl).unwrap();
        assert_eq!(registry.snapshot().structs().len(), 2);
    }

    #[test]
    fn test_remote_adapter_must_not_be_container() {
        struct BytesAdapter;
        impl Adapter for BytesAdapter {
            type Local = Vec<u8>;
            fn remote_type(&self) -> LocalType {
                LocalType::list_of(LocalType::Int)
            }
            fn to_remote(&self, local: &Vec<u8>) -> RpcResult<crate::Value> {
                Ok(crate::Value::List(
                    local.iter().map(|b| crate::Value::Int(i32::from(*b))).collect(),
                ))
            }
            fn to_local(&self, _remote: crate::Value) -> RpcResult<Vec<u8>> {
                Ok(Vec::new())
            }
        }

        let registry = TypeRegistry::new();
        assert!(registry.register_adapter(BytesAdapter).is_err());
        assert!(registry.adapters().is_empty());
    }

    #[test]
    fn test_open_persists_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");

        {
            let registry = TypeRegistry::open(&path, false).unwrap();
            registry.register_struct(node_decl).unwrap();
            registry.close().unwrap();
        }

        let reopened = TypeRegistry::open(&path, false).unwrap();
        assert!(reopened.find_struct("Node").is_some());
    }
}
