// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # wirecall - schema-driven RPC runtime
//!
//! Services are declared once, registered into a [`TypeRegistry`] that
//! derives language-neutral definitions, and called either in-process or
//! across a socket with the same proxy interface.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wirecall::meta::{LocalType, MethodDecl, ServiceDecl, TypeRegistry};
//! use wirecall::service::{MethodRouter, ServiceProxy, ServiceProxyFactory};
//! use wirecall::transport::{SocketClientTransport, SocketServerTransport, TransportConfig};
//! use wirecall::{RpcResult, Value};
//!
//! fn main() -> RpcResult<()> {
//!     let runtime = tokio::runtime::Runtime::new().expect("runtime");
//!     let calc = ServiceDecl::new("demo::Calculator").method(
//!         MethodDecl::new("add")
//!             .param("a", LocalType::Int)
//!             .param("b", LocalType::Int)
//!             .returns(LocalType::Int),
//!     );
//!
//!     // Server side
//!     let server_factory =
//!         ServiceProxyFactory::new(Arc::new(TypeRegistry::new()), runtime.handle().clone());
//!     let dispatcher = Arc::new(server_factory.create_dispatcher());
//!     dispatcher.register(
//!         &calc,
//!         Arc::new(MethodRouter::new().binary("add", |a: i32, b: i32| Ok(a + b))),
//!         None,
//!     )?;
//!     let server =
//!         SocketServerTransport::bind(TransportConfig::default(), dispatcher, runtime.handle())?;
//!
//!     // Client side
//!     let client_factory =
//!         ServiceProxyFactory::new(Arc::new(TypeRegistry::new()), runtime.handle().clone());
//!     let transport = SocketClientTransport::new(
//!         TransportConfig::new(server.local_addr()),
//!         runtime.handle().clone(),
//!     )?;
//!     let proxy = client_factory.create_remote_proxy(&calc, Arc::new(transport), None)?;
//!
//!     assert_eq!(proxy.call("add", vec![Value::Int(2), Value::Int(3)])?, Value::Int(5));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  ServiceProxyFactory -> LocalProxy | RemoteProxy | Dispatcher|
//! +-------------------------------------------------------------+
//! |  TypeRegistry (MetaData)        |  AdapterRegistry          |
//! +-------------------------------------------------------------+
//! |  Value / DynamicStruct          |  Failure / RpcError       |
//! +-------------------------------------------------------------+
//! |  Protocol (JSON) | FrameCodec | Socket / Loopback transports|
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeRegistry`] | Registers declarations, owns the wire definitions |
//! | [`Value`] | Wire value: primitives, containers, structs, enums |
//! | [`DynamicStruct`] | Named struct with ordered fields |
//! | [`ServiceProxyFactory`] | Creates proxies and dispatchers |
//! | [`RpcError`] | Every failure a call or registration can report |
//!
//! ## Logging
//!
//! The crate logs through the `log` facade and installs no logger.
//! Registration and binding log at `debug`, call state transitions at
//! `trace`, server start and stop at `info`.

pub mod adapter;
pub mod config;
pub mod data;
pub mod error;
pub mod meta;
pub mod service;
pub mod transport;

pub use adapter::{Adapter, AdapterRegistry};
pub use data::{DynamicStruct, EnumValue, FromValue, IntoValue, Value};
pub use error::{
    IncompatibleSchemaError, RpcError, RpcResult, SchemaError, ServiceError, TransportError,
};
pub use meta::{Describe, LocalType, MetaData, ServiceDecl, TypeRegistry};
pub use service::{Failure, PendingCall, ServiceProxy, ServiceProxyFactory};
