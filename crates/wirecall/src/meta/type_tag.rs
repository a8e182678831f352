// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire type tags and type references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire-level classification of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Bool,
    Int,
    Long,
    Double,
    String,
    List,
    Set,
    Map,
    Struct,
    Enum,
}

impl TypeTag {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Struct => "struct",
            Self::Enum => "enum",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Long | Self::Double | Self::String
        )
    }

    /// LIST and SET need an element type, MAP needs key and value types.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Map)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of a field, parameter or return value as stored in a definition.
///
/// Struct and enum references carry the referenced definition's wire name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TypeRef {
    /// Method returns nothing.
    Void,
    Bool,
    Int,
    Long,
    Double,
    String,
    List,
    Set,
    Map,
    /// Struct without a definition (a bare `DynamicStruct`).
    Dynamic,
    Struct(String),
    Enum(String),
}

impl TypeRef {
    pub fn from_tag(tag: TypeTag) -> Option<Self> {
        Some(match tag {
            TypeTag::Bool => Self::Bool,
            TypeTag::Int => Self::Int,
            TypeTag::Long => Self::Long,
            TypeTag::Double => Self::Double,
            TypeTag::String => Self::String,
            TypeTag::List => Self::List,
            TypeTag::Set => Self::Set,
            TypeTag::Map => Self::Map,
            TypeTag::Struct | TypeTag::Enum => return None,
        })
    }

    /// Wire tag of the referenced type; `None` for `Void`.
    pub fn tag(&self) -> Option<TypeTag> {
        Some(match self {
            Self::Void => return None,
            Self::Bool => TypeTag::Bool,
            Self::Int => TypeTag::Int,
            Self::Long => TypeTag::Long,
            Self::Double => TypeTag::Double,
            Self::String => TypeTag::String,
            Self::List => TypeTag::List,
            Self::Set => TypeTag::Set,
            Self::Map => TypeTag::Map,
            Self::Dynamic | Self::Struct(_) => TypeTag::Struct,
            Self::Enum(_) => TypeTag::Enum,
        })
    }

    /// Name of the referenced struct or enum definition.
    pub fn definition_name(&self) -> Option<&str> {
        match self {
            Self::Struct(name) | Self::Enum(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Dynamic => f.write_str("struct"),
            Self::Struct(name) | Self::Enum(name) => f.write_str(name),
            other => match other.tag() {
                Some(tag) => f.write_str(tag.name()),
                None => f.write_str("void"),
            },
        }
    }
}

/// Derive the wire id of an enum value that has no explicit id.
///
/// The id is the first four bytes of the MD5 digest of the value's UTF-8
/// name, read big-endian, masked to 31 bits, plus one, negated. The result
/// lies in `[-2^31, -1]`: negative, non-zero and identical in every process.
/// Explicit ids are non-negative, so derived ids never collide with them.
pub fn derive_enum_id(name: &str) -> i64 {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();

    let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) & 0x7FFF_FFFF;
    -(i64::from(word) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_id_golden_values() {
        assert_eq!(derive_enum_id("RED"), -584_668_284);
        assert_eq!(derive_enum_id("GREEN"), -501_278_174);
        assert_eq!(derive_enum_id(""), -1_411_222_746);
    }

    #[test]
    fn test_enum_id_negative_non_zero() {
        for name in ["A", "B", "ACTIVE", "INACTIVE", "x_y_z", "\u{e9}t\u{e9}"] {
            let id = derive_enum_id(name);
            assert!(id < 0, "{} -> {}", name, id);
            assert!(id >= -(1i64 << 31));
            assert_eq!(id, derive_enum_id(name));
        }
    }

    #[test]
    fn test_type_ref_tags() {
        assert_eq!(TypeRef::Struct("P".into()).tag(), Some(TypeTag::Struct));
        assert_eq!(TypeRef::Dynamic.tag(), Some(TypeTag::Struct));
        assert_eq!(TypeRef::Enum("Color".into()).tag(), Some(TypeTag::Enum));
        assert_eq!(TypeRef::Void.tag(), None);
        assert_eq!(TypeRef::from_tag(TypeTag::Map), Some(TypeRef::Map));
        assert_eq!(TypeRef::from_tag(TypeTag::Struct), None);
    }

    #[test]
    fn test_type_ref_display() {
        assert_eq!(TypeRef::Long.to_string(), "long");
        assert_eq!(TypeRef::Struct("Point".into()).to_string(), "Point");
    }
}
