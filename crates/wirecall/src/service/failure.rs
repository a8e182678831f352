// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::config::FAILURE_STRUCT;
use crate::data::{DynamicStruct, Value};
use crate::error::{RpcError, RpcResult};
use std::fmt;

/// Application-level failure raised by a service implementation.
///
/// A *declared* (checked) failure is part of the method's contract and
/// reaches remote callers wrapped in a
/// [`ServiceError`](crate::error::ServiceError). An unchecked failure is
/// re-raised on the caller as-is.
///
/// On the wire a failure is a struct named `Failure`:
///
/// ```text
/// Failure { type: string, message: string, checked: bool, detail?: any }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    name: String,
    message: String,
    checked: bool,
    detail: Option<Box<Value>>,
}

impl Failure {
    /// A failure the method declares it may raise.
    pub fn declared(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            checked: true,
            detail: None,
        }
    }

    /// A failure outside the method's contract.
    pub fn unchecked(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            checked: false,
            detail: None,
        }
    }

    /// Attach a payload describing the failure.
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = Some(Box::new(detail.into()));
        self
    }

    /// Failure type name, e.g. `InsufficientFunds`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_deref()
    }

    /// Rewrite the detail payload, e.g. through an adapter.
    pub(crate) fn map_detail(
        mut self,
        f: impl FnOnce(Value) -> RpcResult<Value>,
    ) -> RpcResult<Self> {
        if let Some(detail) = self.detail.take() {
            self.detail = Some(Box::new(f(*detail)?));
        }
        Ok(self)
    }

    pub fn into_value(self) -> Value {
        let mut s = DynamicStruct::new(FAILURE_STRUCT)
            .with_field("type", self.name)
            .with_field("message", self.message)
            .with_field("checked", self.checked);
        if let Some(detail) = self.detail {
            s.set_field("detail", *detail);
        }
        Value::Struct(s)
    }

    pub fn from_value(value: Value) -> RpcResult<Self> {
        let mut s = match value {
            Value::Struct(s) if s.name() == FAILURE_STRUCT => s,
            other => {
                return Err(RpcError::conversion(format!(
                    "expected {} struct, got {}",
                    FAILURE_STRUCT,
                    other.kind()
                )))
            }
        };

        let name = match s.remove_field("type") {
            Some(Value::String(name)) => name,
            _ => return Err(RpcError::conversion("failure without a type name")),
        };
        let message = match s.remove_field("message") {
            Some(Value::String(message)) => message,
            _ => String::new(),
        };
        let checked = s
            .get_field("checked")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let detail = s
            .remove_field("detail")
            .filter(|d| !d.is_null())
            .map(Box::new);

        Ok(Self {
            name,
            message,
            checked,
            detail,
        })
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for Failure {}
