// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for schema registration, transport and service calls.

use crate::meta::DefinitionKind;
use crate::service::Failure;
use std::fmt;
use std::io;
use std::net::SocketAddr;

/// Result type for wirecall operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while describing, transporting or invoking calls
#[derive(Debug)]
pub enum RpcError {
    // === Schema ===
    /// Malformed type declaration (fatal at registration time)
    Schema(SchemaError),

    /// Two definitions share a wire name but differ structurally
    IncompatibleSchema(IncompatibleSchemaError),

    // === Transport ===
    /// The request/response exchange did not complete
    Transport(TransportError),

    // === Application ===
    /// Declared failure raised by a remote implementation
    Service(ServiceError),

    /// Unchecked failure, propagated with its original identity
    Failure(Failure),

    /// No service bound under this wire name
    ServiceNotFound(String),

    /// Service has no method with this name and arity
    MethodNotFound { service: String, method: String },

    // === Values ===
    /// A value could not be converted to the requested shape
    Conversion(String),

    /// Metadata snapshot could not be read or written
    Persistence(String),
}

impl RpcError {
    /// Create a conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create a schema error for the given type
    pub fn schema(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema(SchemaError::new(type_name, reason))
    }

    /// The application failure carried by this error, wrapped or not.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Service(e) => Some(e.cause()),
            Self::Failure(f) => Some(f),
            _ => None,
        }
    }

    /// Check whether the exchange itself failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "{}", e),
            Self::IncompatibleSchema(e) => write!(f, "{}", e),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Service(e) => write!(f, "{}", e),
            Self::Failure(e) => write!(f, "{}", e),
            Self::ServiceNotFound(name) => write!(f, "Service not found: {}", name),
            Self::MethodNotFound { service, method } => {
                write!(f, "Method not found: {}.{}", service, method)
            }
            Self::Conversion(msg) => write!(f, "Conversion error: {}", msg),
            Self::Persistence(msg) => write!(f, "Metadata persistence error: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            Self::IncompatibleSchema(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Service(e) => Some(e),
            Self::Failure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for RpcError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<IncompatibleSchemaError> for RpcError {
    fn from(e: IncompatibleSchemaError) -> Self {
        Self::IncompatibleSchema(e)
    }
}

impl From<TransportError> for RpcError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ServiceError> for RpcError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

// ---------------------------------------------------------------------------
// SchemaError
// ---------------------------------------------------------------------------

/// A type declaration that cannot be turned into a wire definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    type_name: String,
    reason: String,
}

impl SchemaError {
    pub fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Local or wire name of the offending type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema error in '{}': {}", self.type_name, self.reason)
    }
}

impl std::error::Error for SchemaError {}

// ---------------------------------------------------------------------------
// IncompatibleSchemaError
// ---------------------------------------------------------------------------

/// Two definitions share a wire name but disagree on their shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompatibleSchemaError {
    kind: DefinitionKind,
    name: String,
    reason: String,
}

impl IncompatibleSchemaError {
    pub fn new(kind: DefinitionKind, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> DefinitionKind {
        self.kind
    }

    /// Wire name of the offending definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for IncompatibleSchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Incompatible {} definition '{}': {}",
            self.kind, self.name, self.reason
        )
    }
}

impl std::error::Error for IncompatibleSchemaError {}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// The request/response exchange did not complete.
///
/// No automatic retry happens; whether the server applied the call is
/// unknown.
#[derive(Debug)]
pub enum TransportError {
    /// Could not establish the connection
    Connect { addr: SocketAddr, source: io::Error },

    /// Connection attempt exceeded the configured timeout
    ConnectTimeout(SocketAddr),

    /// Could not open the listening socket
    Bind { addr: SocketAddr, source: io::Error },

    /// Transport configuration rejected by validation
    InvalidConfig(&'static str),

    /// Writing the request frame failed
    Write(io::Error),

    /// Reading from the connection failed
    Read(io::Error),

    /// Peer closed the connection at a frame boundary
    Closed,

    /// Peer closed the connection inside a frame
    IncompleteFrame { expected: usize, received: usize },

    /// Declared frame length exceeds the configured maximum
    FrameTooLarge { len: usize, max: usize },

    /// Payload could not be encoded or decoded by the protocol
    Codec(String),

    /// Completion side dropped before producing a response
    Abandoned,
}

impl TransportError {
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { addr, source } => write!(f, "connect to {} failed: {}", addr, source),
            Self::ConnectTimeout(addr) => write!(f, "connect to {} timed out", addr),
            Self::Bind { addr, source } => write!(f, "bind to {} failed: {}", addr, source),
            Self::InvalidConfig(msg) => write!(f, "invalid transport config: {}", msg),
            Self::Write(e) => write!(f, "write failed: {}", e),
            Self::Read(e) => write!(f, "read failed: {}", e),
            Self::Closed => write!(f, "connection closed"),
            Self::IncompleteFrame { expected, received } => write!(
                f,
                "incomplete frame: {} of {} bytes received",
                received, expected
            ),
            Self::FrameTooLarge { len, max } => {
                write!(f, "frame too large: {} bytes (max {})", len, max)
            }
            Self::Codec(msg) => write!(f, "codec error: {}", msg),
            Self::Abandoned => write!(f, "call abandoned before completion"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect { source, .. } | Self::Bind { source, .. } => Some(source),
            Self::Write(e) | Self::Read(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// Wraps a declared failure raised by a remote implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceError {
    cause: Failure,
}

impl ServiceError {
    pub fn new(cause: Failure) -> Self {
        Self { cause }
    }

    /// The failure raised by the implementation.
    pub fn cause(&self) -> &Failure {
        &self.cause
    }

    pub fn into_cause(self) -> Failure {
        self.cause
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service error: {}", self.cause)
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
