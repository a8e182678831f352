// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fs;
use std::path::Path;

use super::MetaData;
use crate::error::{RpcError, RpcResult};

// ---------------------------------------------------------------------------
// Metadata snapshots
// ---------------------------------------------------------------------------

/// Read a metadata snapshot; a missing file yields `None`.
pub fn load_snapshot(path: &Path) -> RpcResult<Option<MetaData>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path).map_err(|e| {
        RpcError::Persistence(format!("failed to read {}: {}", path.display(), e))
    })?;
    let meta = serde_json::from_str(&json).map_err(|e| {
        RpcError::Persistence(format!("failed to parse {}: {}", path.display(), e))
    })?;
    Ok(Some(meta))
}

/// Write a metadata snapshot, creating parent directories as needed.
///
/// The document is written to a sibling temporary file and renamed into
/// place so readers never observe a partial snapshot.
pub fn save_snapshot(path: &Path, meta: &MetaData) -> RpcResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                RpcError::Persistence(format!(
                    "failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
    }

    let json = serde_json::to_string_pretty(meta)
        .map_err(|e| RpcError::Persistence(format!("serialization error: {}", e)))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| {
        RpcError::Persistence(format!("failed to write {}: {}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        RpcError::Persistence(format!("failed to move {} into place: {}", tmp.display(), e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{StructDefinition, TypeRef, ValueType, FieldDefinition};

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_snapshot(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("meta.json");

        let mut meta = MetaData::new();
        let mut def = StructDefinition::new("Point", "demo::Point");
        def.fields
            .push(FieldDefinition::new("x", ValueType::of(TypeRef::Int)));
        meta.structs_mut().insert(def);

        save_snapshot(&path, &meta).unwrap();
        let loaded = load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded, meta);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(&path, "{ not json").unwrap();

        match load_snapshot(&path) {
            Err(RpcError::Persistence(msg)) => assert!(msg.contains("failed to parse")),
            other => panic!("unexpected {:?}", other.map(|m| m.is_some())),
        }
    }
}
