// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Adapters installed by registries created with auto adapters.

use super::Adapter;
use crate::data::{DynamicStruct, Value};
use crate::error::{RpcError, RpcResult};
use crate::meta::{LocalType, StructDecl};
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn remote_struct(value: Value, name: &str) -> RpcResult<DynamicStruct> {
    match value {
        Value::Struct(s) if s.name() == name => Ok(s),
        other => Err(RpcError::conversion(format!(
            "expected {} struct, got {}",
            name,
            other.kind()
        ))),
    }
}

fn long_field(s: &DynamicStruct, field: &str) -> RpcResult<i64> {
    s.get_field(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| RpcError::conversion(format!("{}.{} missing", s.name(), field)))
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

fn duration_decl() -> StructDecl {
    StructDecl::new("wirecall::adapter::Duration")
        .wire_name("Duration")
        .field("seconds", LocalType::Long)
        .field("nanos", LocalType::Int)
}

/// `Duration` as `Duration { seconds: long, nanos: int }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationAdapter;

impl Adapter for DurationAdapter {
    type Local = Duration;

    fn remote_type(&self) -> LocalType {
        LocalType::Struct(duration_decl)
    }

    fn to_remote(&self, local: &Duration) -> RpcResult<Value> {
        let seconds = i64::try_from(local.as_secs())
            .map_err(|_| RpcError::conversion("duration seconds overflow a long"))?;
        Ok(Value::Struct(
            DynamicStruct::new("Duration")
                .with_field("seconds", seconds)
                .with_field("nanos", local.subsec_nanos() as i32),
        ))
    }

    fn to_local(&self, remote: Value) -> RpcResult<Duration> {
        let s = remote_struct(remote, "Duration")?;
        let seconds = u64::try_from(long_field(&s, "seconds")?)
            .map_err(|_| RpcError::conversion("negative duration"))?;
        let nanos = u32::try_from(long_field(&s, "nanos")?)
            .map_err(|_| RpcError::conversion("negative duration nanos"))?;
        Ok(Duration::new(seconds, nanos))
    }
}

// ---------------------------------------------------------------------------
// SystemTime
// ---------------------------------------------------------------------------

fn timestamp_decl() -> StructDecl {
    StructDecl::new("wirecall::adapter::Timestamp")
        .wire_name("Timestamp")
        .field("epochMillis", LocalType::Long)
}

/// `SystemTime` as `Timestamp { epochMillis: long }`, negative before 1970.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeAdapter;

impl Adapter for SystemTimeAdapter {
    type Local = SystemTime;

    fn remote_type(&self) -> LocalType {
        LocalType::Struct(timestamp_decl)
    }

    fn to_remote(&self, local: &SystemTime) -> RpcResult<Value> {
        let millis = match local.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Ok(Value::Struct(
            DynamicStruct::new("Timestamp").with_field("epochMillis", millis),
        ))
    }

    fn to_local(&self, remote: Value) -> RpcResult<SystemTime> {
        let s = remote_struct(remote, "Timestamp")?;
        let millis = long_field(&s, "epochMillis")?;
        let offset = Duration::from_millis(millis.unsigned_abs());
        let time = if millis >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(|| RpcError::conversion("timestamp out of range"))
    }
}

// ---------------------------------------------------------------------------
// IpAddr
// ---------------------------------------------------------------------------

/// `IpAddr` as its textual form.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpAddrAdapter;

impl Adapter for IpAddrAdapter {
    type Local = IpAddr;

    fn remote_type(&self) -> LocalType {
        LocalType::String
    }

    fn to_remote(&self, local: &IpAddr) -> RpcResult<Value> {
        Ok(Value::String(local.to_string()))
    }

    fn to_local(&self, remote: Value) -> RpcResult<IpAddr> {
        match remote {
            Value::String(s) => s
                .parse()
                .map_err(|e| RpcError::conversion(format!("bad address '{}': {}", s, e))),
            other => Err(RpcError::conversion(format!(
                "expected string address, got {}",
                other.kind()
            ))),
        }
    }
}
