// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte codecs for request and response envelopes.

use crate::error::TransportError;
use crate::service::{Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes and decodes one message type.
///
/// Implementations must keep struct field names and order, and must keep
/// `int` and `long` values distinguishable.
pub trait Protocol<T>: Send + Sync + 'static {
    fn serialize(&self, value: &T) -> Result<Vec<u8>, TransportError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<T, TransportError>;
}

/// A protocol for both directions of a call.
pub trait MessageProtocol: Protocol<Request> + Protocol<Response> {}

impl<P: Protocol<Request> + Protocol<Response>> MessageProtocol for P {}

/// Reference codec: JSON through `serde_json`.
///
/// Every value carries its type tag, so `Int(5)` and `Long(5)` decode to
/// the variant they were encoded from.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonProtocol;

impl<T> Protocol<T> for JsonProtocol
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(value).map_err(|e| TransportError::codec(format!("encode: {}", e)))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, TransportError> {
        serde_json::from_slice(bytes).map_err(|e| TransportError::codec(format!("decode: {}", e)))
    }
}
