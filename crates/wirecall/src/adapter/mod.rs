// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Adapters between local domain types and wire-representable shapes.
//!
//! An [`Adapter`] bridges one local type (carried as [`Value::Local`]) and a
//! remote shape that reduces to a primitive, struct or enum. Adapters are
//! registered through
//! [`TypeRegistry::register_adapter`](crate::meta::TypeRegistry::register_adapter),
//! which also registers the remote shape's definition.

mod builtin;

pub use builtin::{DurationAdapter, IpAddrAdapter, SystemTimeAdapter};

use crate::data::{LocalValue, Value};
use crate::error::{RpcError, RpcResult};
use crate::meta::LocalType;
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

/// Bidirectional converter for one local type.
pub trait Adapter: Send + Sync + 'static {
    /// Local type handled by this adapter.
    type Local: Any + Send + Sync;

    /// Shape the local type travels as.
    fn remote_type(&self) -> LocalType;

    fn to_remote(&self, local: &Self::Local) -> RpcResult<Value>;

    fn to_local(&self, remote: Value) -> RpcResult<Self::Local>;
}

/// Object-safe view of an [`Adapter`].
trait ErasedAdapter: Send + Sync {
    fn to_remote(&self, local: &LocalValue) -> RpcResult<Value>;
    fn to_local(&self, remote: Value) -> RpcResult<Value>;
}

struct Erased<A>(A);

impl<A: Adapter> ErasedAdapter for Erased<A> {
    fn to_remote(&self, local: &LocalValue) -> RpcResult<Value> {
        let local = local.downcast_ref::<A::Local>().ok_or_else(|| {
            RpcError::conversion(format!(
                "adapter for {} got a {}",
                std::any::type_name::<A::Local>(),
                local.type_name()
            ))
        })?;
        self.0.to_remote(local)
    }

    fn to_local(&self, remote: Value) -> RpcResult<Value> {
        self.0.to_local(remote).map(Value::local)
    }
}

struct AdapterEntry {
    local_name: String,
    remote: LocalType,
    adapter: Box<dyn ErasedAdapter>,
}

/// Registered adapters, indexed by local type and by remote struct name.
#[derive(Default)]
pub struct AdapterRegistry {
    by_local: DashMap<String, Arc<AdapterEntry>>,
    by_remote_struct: DashMap<String, Arc<AdapterEntry>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an adapter; `remote_struct` is the wire name of its remote
    /// shape when that shape is a struct.
    pub(crate) fn insert<A: Adapter>(&self, adapter: A, remote_struct: Option<String>) {
        let local_name = std::any::type_name::<A::Local>().to_string();
        let entry = Arc::new(AdapterEntry {
            local_name: local_name.clone(),
            remote: adapter.remote_type(),
            adapter: Box::new(Erased(adapter)),
        });

        if let Some(name) = remote_struct {
            self.by_remote_struct.insert(name, Arc::clone(&entry));
        }
        self.by_local.insert(local_name, entry);
    }

    pub fn len(&self) -> usize {
        self.by_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_local.is_empty()
    }

    pub fn is_adapted(&self, local_id: &str) -> bool {
        self.by_local.contains_key(local_id)
    }

    /// Remote shape of an adapted local type.
    pub fn remote_type_of(&self, local_id: &str) -> Option<LocalType> {
        self.by_local.get(local_id).map(|e| e.remote.clone())
    }

    fn entry(&self, local_id: &str) -> Option<Arc<AdapterEntry>> {
        self.by_local.get(local_id).map(|e| Arc::clone(e.value()))
    }

    /// Replace local values by their remote shape, recursively.
    ///
    /// Values without an adapter pass through unchanged.
    pub fn adapt_local_to_remote(&self, value: Value) -> RpcResult<Value> {
        if self.is_empty() {
            return Ok(value);
        }
        match value {
            Value::Local(local) => match self.entry(local.type_name()) {
                Some(entry) => {
                    let remote = entry.adapter.to_remote(&local)?;
                    self.adapt_local_to_remote(remote)
                }
                None => Ok(Value::Local(local)),
            },
            Value::List(items) => Ok(Value::List(self.local_items(items)?)),
            Value::Set(items) => Ok(Value::Set(self.local_items(items)?)),
            Value::Map(entries) => Ok(Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        Ok((self.adapt_local_to_remote(k)?, self.adapt_local_to_remote(v)?))
                    })
                    .collect::<RpcResult<_>>()?,
            )),
            Value::Struct(s) => {
                let name = s.name().to_string();
                let fields = s
                    .into_fields()
                    .into_iter()
                    .map(|(n, v)| Ok((n, self.adapt_local_to_remote(v)?)))
                    .collect::<RpcResult<Vec<_>>>()?;
                let mut out = crate::data::DynamicStruct::new(name);
                for (n, v) in fields {
                    out.set_field(n, v);
                }
                Ok(Value::Struct(out))
            }
            other => Ok(other),
        }
    }

    fn local_items(&self, items: Vec<Value>) -> RpcResult<Vec<Value>> {
        items
            .into_iter()
            .map(|v| self.adapt_local_to_remote(v))
            .collect()
    }

    /// Convert a received value back to local values, guided by the type
    /// the receiver declared for it.
    pub fn adapt_remote_to_local(&self, value: Value, declared: &LocalType) -> RpcResult<Value> {
        if self.is_empty() || value.is_null() {
            return Ok(value);
        }

        if let Some(entry) = declared.local_id().and_then(|id| self.entry(&id)) {
            let remote = self.adapt_remote_to_local(value, &entry.remote)?;
            log::trace!("adapter: remote -> {}", entry.local_name);
            return entry.adapter.to_local(remote);
        }

        match (declared, value) {
            (LocalType::Struct(decl), Value::Struct(s)) => {
                let decl = decl();
                let name = s.name().to_string();
                let mut out = crate::data::DynamicStruct::new(name);
                for (field, v) in s.into_fields() {
                    let v = match decl.field_by_wire_name(&field) {
                        Some(fd) => self.adapt_remote_to_local(v, &fd.ty)?,
                        None => v,
                    };
                    out.set_field(field, v);
                }
                Ok(Value::Struct(out))
            }
            (LocalType::List(Some(elem)), Value::List(items)) => {
                Ok(Value::List(self.remote_items(items, elem)?))
            }
            (LocalType::Set(Some(elem)), Value::Set(items)) => {
                Ok(Value::Set(self.remote_items(items, elem)?))
            }
            (LocalType::Map(Some(kt), Some(vt)), Value::Map(entries)) => Ok(Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        Ok((
                            self.adapt_remote_to_local(k, kt)?,
                            self.adapt_remote_to_local(v, vt)?,
                        ))
                    })
                    .collect::<RpcResult<_>>()?,
            )),
            (_, other) => Ok(other),
        }
    }

    fn remote_items(&self, items: Vec<Value>, elem: &LocalType) -> RpcResult<Vec<Value>> {
        items
            .into_iter()
            .map(|v| self.adapt_remote_to_local(v, elem))
            .collect()
    }

    /// Convert a received value with no declared type.
    ///
    /// Structs are matched by their remote struct name, containers are
    /// searched recursively. Used for failure details.
    pub fn adapt_remote_to_local_untyped(&self, value: Value) -> RpcResult<Value> {
        if self.is_empty() {
            return Ok(value);
        }
        match value {
            Value::Struct(s) => {
                let entry = self
                    .by_remote_struct
                    .get(s.name())
                    .map(|e| Arc::clone(e.value()));
                match entry {
                    Some(entry) => entry.adapter.to_local(Value::Struct(s)),
                    None => {
                        let name = s.name().to_string();
                        let mut out = crate::data::DynamicStruct::new(name);
                        for (field, v) in s.into_fields() {
                            out.set_field(field, self.adapt_remote_to_local_untyped(v)?);
                        }
                        Ok(Value::Struct(out))
                    }
                }
            }
            Value::List(items) => Ok(Value::List(self.untyped_items(items)?)),
            Value::Set(items) => Ok(Value::Set(self.untyped_items(items)?)),
            Value::Map(entries) => Ok(Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        Ok((
                            self.adapt_remote_to_local_untyped(k)?,
                            self.adapt_remote_to_local_untyped(v)?,
                        ))
                    })
                    .collect::<RpcResult<_>>()?,
            )),
            other => Ok(other),
        }
    }

    fn untyped_items(&self, items: Vec<Value>) -> RpcResult<Vec<Value>> {
        items
            .into_iter()
            .map(|v| self.adapt_remote_to_local_untyped(v))
            .collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.by_local.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("AdapterRegistry")
            .field("adapters", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DynamicStruct;
    use crate::meta::{Describe, StructDecl};
    use std::net::IpAddr;
    use std::time::Duration;

    fn registry() -> AdapterRegistry {
        let reg = AdapterRegistry::new();
        reg.insert(DurationAdapter, Some("Duration".to_string()));
        reg.insert(IpAddrAdapter, None);
        reg
    }

    fn session_decl() -> StructDecl {
        StructDecl::new("demo::Session")
            .field("timeout", Duration::local_type())
            .field("peers", Vec::<IpAddr>::local_type())
    }

    #[test]
    fn test_unadapted_values_pass_through() {
        let reg = registry();
        let value = Value::List(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(reg.adapt_local_to_remote(value.clone()).unwrap(), value);
        assert_eq!(
            reg.adapt_remote_to_local(value.clone(), &Vec::<i32>::local_type())
                .unwrap(),
            value
        );
    }

    #[test]
    fn test_local_to_remote_recurses() {
        let reg = registry();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let session = DynamicStruct::new("Session")
            .with_field("timeout", Value::local(Duration::from_secs(3)))
            .with_field("peers", Value::List(vec![Value::local(ip)]));

        let remote = reg.adapt_local_to_remote(Value::Struct(session)).unwrap();
        assert!(remote.is_representable());

        let remote = remote.as_struct().unwrap();
        assert_eq!(
            remote.get_field("peers"),
            Some(&Value::List(vec![Value::from("10.0.0.1")]))
        );
        let timeout = remote.get_field("timeout").and_then(Value::as_struct).unwrap();
        assert_eq!(timeout.name(), "Duration");
        assert_eq!(timeout.get_field("seconds"), Some(&Value::Long(3)));
    }

    #[test]
    fn test_remote_to_local_follows_declared_fields() {
        let reg = registry();
        let ip: IpAddr = "::1".parse().unwrap();
        let local = DynamicStruct::new("Session")
            .with_field("timeout", Value::local(Duration::from_millis(1500)))
            .with_field("peers", Value::List(vec![Value::local(ip)]));

        let remote = reg.adapt_local_to_remote(Value::Struct(local)).unwrap();
        let back = reg
            .adapt_remote_to_local(remote, &LocalType::Struct(session_decl))
            .unwrap();

        let back = back.as_struct().unwrap();
        assert_eq!(
            back.get_field("timeout").and_then(|v| v.as_local::<Duration>()),
            Some(&Duration::from_millis(1500))
        );
        let peers = back.get_field("peers").and_then(Value::as_elements).unwrap();
        assert_eq!(peers[0].as_local::<IpAddr>(), Some(&ip));
    }

    #[test]
    fn test_untyped_matches_remote_struct_name() {
        let reg = registry();
        let remote = reg
            .adapt_local_to_remote(Value::local(Duration::from_secs(9)))
            .unwrap();
        let wrapped = Value::Map(vec![(Value::from("wait"), remote)]);

        let back = reg.adapt_remote_to_local_untyped(wrapped).unwrap();
        match back {
            Value::Map(entries) => {
                assert_eq!(
                    entries[0].1.as_local::<Duration>(),
                    Some(&Duration::from_secs(9))
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_null_stays_null() {
        let reg = registry();
        assert_eq!(
            reg.adapt_remote_to_local(Value::Null, &Duration::local_type())
                .unwrap(),
            Value::Null
        );
    }
}
