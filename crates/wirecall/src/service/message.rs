// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request and response envelopes.

use super::Failure;
use crate::config::{RESULT_FIELD, RESULT_STRUCT};
use crate::data::{DynamicStruct, Value};
use serde::{Deserialize, Serialize};

/// One call as sent to a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Wire name of the target service
    pub service_name: String,

    /// Wire name of the method, never carrying the async suffix
    pub method_name: String,

    /// `false` asks for the method's definition instead of invoking it
    pub execute: bool,

    /// Arguments keyed by declared parameter name, in declaration order
    pub arguments: DynamicStruct,

    /// Per-call session value supplied by the caller
    #[serde(default)]
    pub session: Value,

    /// Correlates the request with its log lines on both sides
    pub request_id: String,
}

impl Request {
    /// Invocation request with a null session.
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        arguments: DynamicStruct,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            method_name: method_name.into(),
            execute: true,
            arguments,
            session: Value::Null,
            request_id: request_id.into(),
        }
    }

    pub fn with_session(mut self, session: Value) -> Self {
        self.session = session;
        self
    }

    /// Turn the request into a metadata probe.
    pub fn probe(mut self) -> Self {
        self.execute = false;
        self
    }
}

/// Outcome of a call: a result struct or an exception value, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    /// Struct named `Result` with a single `result` field
    Result(DynamicStruct),

    /// Encoded [`Failure`]
    Exception(Value),
}

impl Response {
    /// Wrap a successful return value.
    pub fn success(value: Value) -> Self {
        Self::Result(DynamicStruct::new(RESULT_STRUCT).with_field(RESULT_FIELD, value))
    }

    pub fn failure(failure: Failure) -> Self {
        Self::Exception(failure.into_value())
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception(_))
    }
}
