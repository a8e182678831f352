// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aggregate of all known definitions, indexed by wire and local name.

use super::definitions::{
    Definition, DefinitionKind, EnumDefinition, ServiceDefinition, StructDefinition,
};
use crate::error::{IncompatibleSchemaError, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable position of a definition inside a [`DefinitionIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

/// Append-only arena of definitions with O(1) lookup by wire name and by
/// local-type identifier.
///
/// One definition may be bound to several local identifiers; each local
/// identifier maps to exactly one definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionIndex<T> {
    items: Vec<T>,
    by_name: HashMap<String, usize>,
    by_local: HashMap<String, usize>,
}

impl<T> Default for DefinitionIndex<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_name: HashMap::new(),
            by_local: HashMap::new(),
        }
    }
}

impl<T: Definition> DefinitionIndex<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.items.get(handle.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).and_then(|&i| self.items.get(i))
    }

    pub fn by_local(&self, local: &str) -> Option<&T> {
        self.by_local.get(local).and_then(|&i| self.items.get(i))
    }

    pub fn handle_by_name(&self, name: &str) -> Option<Handle> {
        self.by_name.get(name).copied().map(Handle)
    }

    pub fn handle_by_local(&self, local: &str) -> Option<Handle> {
        self.by_local.get(local).copied().map(Handle)
    }

    /// Every local binding with the definition it points at.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &T)> {
        self.by_local
            .iter()
            .filter_map(|(local, &i)| self.items.get(i).map(|d| (local.as_str(), d)))
    }

    /// Append a definition whose wire name is not yet indexed.
    pub(crate) fn insert(&mut self, def: T) -> Handle {
        let idx = self.items.len();
        self.by_name.insert(def.name().to_string(), idx);
        self.by_local.insert(def.local_name().to_string(), idx);
        self.items.push(def);
        Handle(idx)
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.items.get_mut(handle.0)
    }

    pub(crate) fn bind_local(&mut self, local: impl Into<String>, handle: Handle) {
        self.by_local.insert(local.into(), handle.0);
    }

    /// Drop the definitions appended after the first `len` and the given
    /// local bindings.
    fn rollback<'a>(&mut self, len: usize, bound: impl Iterator<Item = &'a str>) {
        for local in bound {
            self.by_local.remove(local);
        }
        if len >= self.items.len() {
            return;
        }
        for def in self.items.drain(len..) {
            self.by_name.remove(def.name());
            self.by_local.remove(def.local_name());
        }
    }

    fn check_merge(&self, theirs: &Self) -> Result<(), IncompatibleSchemaError> {
        for def in theirs.iter() {
            if let Some(ours) = self.by_name(def.name()) {
                ours.check_compatible(def).map_err(|details| {
                    IncompatibleSchemaError::new(T::KIND, def.name(), details.join("; "))
                })?;
            }
        }
        for (local, def) in theirs.bindings() {
            if let Some(ours) = self.by_local(local) {
                if ours.name() != def.name() {
                    return Err(IncompatibleSchemaError::new(
                        T::KIND,
                        def.name(),
                        format!("local type {} is already bound to {}", local, ours.name()),
                    ));
                }
            }
        }
        Ok(())
    }

    fn apply_merge(&mut self, theirs: &Self) -> usize {
        let mut added = 0;
        for def in theirs.iter() {
            // check_merge guarantees the primary local name is free here
            if self.handle_by_name(def.name()).is_none() {
                self.insert(def.clone());
                added += 1;
            }
        }
        for (local, def) in theirs.bindings() {
            if self.by_local.contains_key(local) {
                continue;
            }
            if let Some(handle) = self.handle_by_name(def.name()) {
                self.bind_local(local, handle);
            }
        }
        added
    }

    fn check_unique(&self) -> Result<(), SchemaError> {
        let mut seen = HashMap::new();
        for def in &self.items {
            if seen.insert(def.name(), ()).is_some() {
                return Err(SchemaError::new(
                    def.name(),
                    format!("{} defined twice", T::KIND),
                ));
            }
        }
        Ok(())
    }
}

/// Arena lengths of a [`MetaData`] at some point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    structs: usize,
    enums: usize,
    services: usize,
}

/// All struct, enum and service definitions known to a registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetaDataDocument", into = "MetaDataDocument")]
pub struct MetaData {
    structs: DefinitionIndex<StructDefinition>,
    enums: DefinitionIndex<EnumDefinition>,
    services: DefinitionIndex<ServiceDefinition>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn structs(&self) -> &DefinitionIndex<StructDefinition> {
        &self.structs
    }

    pub fn enums(&self) -> &DefinitionIndex<EnumDefinition> {
        &self.enums
    }

    pub fn services(&self) -> &DefinitionIndex<ServiceDefinition> {
        &self.services
    }

    pub(crate) fn structs_mut(&mut self) -> &mut DefinitionIndex<StructDefinition> {
        &mut self.structs
    }

    pub(crate) fn enums_mut(&mut self) -> &mut DefinitionIndex<EnumDefinition> {
        &mut self.enums
    }

    pub(crate) fn services_mut(&mut self) -> &mut DefinitionIndex<ServiceDefinition> {
        &mut self.services
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty() && self.enums.is_empty() && self.services.is_empty()
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            structs: self.structs.len(),
            enums: self.enums.len(),
            services: self.services.len(),
        }
    }

    /// Undo everything added since `checkpoint`.
    ///
    /// Definitions are append-only, so truncating the arenas removes new
    /// definitions with their primary bindings. `bound` lists the extra
    /// local bindings made since, each to a key that was free before.
    pub(crate) fn rollback(
        &mut self,
        checkpoint: Checkpoint,
        bound: &[(DefinitionKind, String)],
    ) {
        let of = |kind: DefinitionKind| {
            bound
                .iter()
                .filter(move |(k, _)| *k == kind)
                .map(|(_, local)| local.as_str())
        };
        self.structs
            .rollback(checkpoint.structs, of(DefinitionKind::Struct));
        self.enums.rollback(checkpoint.enums, of(DefinitionKind::Enum));
        self.services
            .rollback(checkpoint.services, of(DefinitionKind::Service));
    }

    /// Merge another aggregate into this one.
    ///
    /// Definitions absent by wire name are added; present ones must match
    /// structurally. Everything is checked before anything is applied, so
    /// a failed merge leaves `self` untouched. Merging the same aggregate
    /// again changes nothing.
    pub fn merge(&mut self, other: &MetaData) -> Result<(), IncompatibleSchemaError> {
        self.enums.check_merge(&other.enums)?;
        self.structs.check_merge(&other.structs)?;
        self.services.check_merge(&other.services)?;

        let enums = self.enums.apply_merge(&other.enums);
        let structs = self.structs.apply_merge(&other.structs);
        let services = self.services.apply_merge(&other.services);

        log::debug!(
            "metadata: merged {} enums, {} structs, {} services",
            enums,
            structs,
            services
        );
        Ok(())
    }

    /// Validate every definition and the uniqueness of wire names.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.structs.check_unique()?;
        self.enums.check_unique()?;
        self.services.check_unique()?;
        for def in self.structs.iter() {
            def.validate()?;
        }
        for def in self.enums.iter() {
            def.validate()?;
        }
        Ok(())
    }
}

impl fmt::Display for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MetaData({} structs, {} enums, {} services)",
            self.structs.len(),
            self.enums.len(),
            self.services.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Snapshot document
// ---------------------------------------------------------------------------

/// Persisted form of [`MetaData`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MetaDataDocument {
    #[serde(default)]
    enums: Vec<EnumDefinition>,
    #[serde(default)]
    structs: Vec<StructDefinition>,
    #[serde(default)]
    services: Vec<ServiceDefinition>,
    #[serde(default, skip_serializing_if = "DocumentBindings::is_empty")]
    bindings: DocumentBindings,
}

/// Local identifiers bound to a definition besides its own `localName`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DocumentBindings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    enums: Vec<LocalBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    structs: Vec<LocalBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    services: Vec<LocalBinding>,
}

impl DocumentBindings {
    fn is_empty(&self) -> bool {
        self.enums.is_empty() && self.structs.is_empty() && self.services.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocalBinding {
    local: String,
    name: String,
}

impl From<MetaData> for MetaDataDocument {
    fn from(meta: MetaData) -> Self {
        let bindings = DocumentBindings {
            enums: meta.enums.secondary_bindings(),
            structs: meta.structs.secondary_bindings(),
            services: meta.services.secondary_bindings(),
        };
        Self {
            enums: meta.enums.items,
            structs: meta.structs.items,
            services: meta.services.items,
            bindings,
        }
    }
}

impl TryFrom<MetaDataDocument> for MetaData {
    type Error = SchemaError;

    fn try_from(doc: MetaDataDocument) -> Result<Self, Self::Error> {
        let mut meta = MetaData::new();
        for def in doc.enums {
            meta.enums.push_checked(def)?;
        }
        for def in doc.structs {
            meta.structs.push_checked(def)?;
        }
        for def in doc.services {
            meta.services.push_checked(def)?;
        }
        meta.enums.bind_checked(doc.bindings.enums)?;
        meta.structs.bind_checked(doc.bindings.structs)?;
        meta.services.bind_checked(doc.bindings.services)?;
        meta.validate()?;
        Ok(meta)
    }
}

impl<T: Definition> DefinitionIndex<T> {
    fn push_checked(&mut self, def: T) -> Result<Handle, SchemaError> {
        if self.by_name.contains_key(def.name()) {
            return Err(SchemaError::new(
                def.name(),
                format!("{} defined twice", T::KIND),
            ));
        }
        if self.by_local.contains_key(def.local_name()) {
            return Err(SchemaError::new(
                def.name(),
                format!("local type {} bound twice", def.local_name()),
            ));
        }
        Ok(self.insert(def))
    }

    /// Bindings other than each definition's primary local name, sorted by
    /// local identifier.
    fn secondary_bindings(&self) -> Vec<LocalBinding> {
        let mut out: Vec<_> = self
            .bindings()
            .filter(|(local, def)| *local != def.local_name())
            .map(|(local, def)| LocalBinding {
                local: local.to_string(),
                name: def.name().to_string(),
            })
            .collect();
        out.sort_by(|a, b| a.local.cmp(&b.local));
        out
    }

    fn bind_checked(&mut self, bindings: Vec<LocalBinding>) -> Result<(), SchemaError> {
        for LocalBinding { local, name } in bindings {
            let handle = self.handle_by_name(&name).ok_or_else(|| {
                SchemaError::new(&name, format!("binding for {} names no {}", local, T::KIND))
            })?;
            match self.handle_by_local(&local) {
                Some(existing) if existing != handle => {
                    return Err(SchemaError::new(
                        &name,
                        format!("local type {} bound twice", local),
                    ));
                }
                Some(_) => {}
                None => self.bind_local(local, handle),
            }
        }
        Ok(())
    }
}
