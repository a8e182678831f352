// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Moving requests and responses between processes.
//!
//! # Wire format
//!
//! Every message is one frame:
//!
//! ```text
//! +----------------+------------------------+
//! | Length (4B BE) |  Payload (N bytes)     |
//! +----------------+------------------------+
//! ```
//!
//! The payload is whatever the configured [`Protocol`] produces; the
//! reference [`JsonProtocol`] keeps field order and the int/long split.
//!
//! A client writes one request frame and reads one response frame. The
//! socket client opens a new connection for every call; the server keeps
//! reading request frames from a connection until the peer closes it.

mod client;
mod config;
mod frame_codec;
mod loopback;
mod protocol;
mod server;

pub use client::SocketClientTransport;
pub use config::TransportConfig;
pub use frame_codec::FrameCodec;
pub use loopback::LoopbackClientTransport;
pub use protocol::{JsonProtocol, MessageProtocol, Protocol};
pub use server::SocketServerTransport;

use crate::error::RpcResult;
use crate::meta::{ServiceDecl, ServiceDefinition};
use crate::service::{Pending, Request, Response, ServiceImpl, SessionConsumer};
use std::sync::Arc;

/// Response still in flight.
pub type PendingResponse = Pending<Response>;

/// Sends requests and yields their responses.
///
/// `send` must not block; I/O failures surface through the returned
/// handle as [`TransportError`](crate::error::TransportError)s.
pub trait ClientTransport: Send + Sync {
    fn send(&self, request: Request) -> PendingResponse;
}

/// Accepts requests and routes them to registered implementations.
pub trait ServerTransport: Send + Sync {
    fn register(
        &self,
        decl: &ServiceDecl,
        implementation: Arc<dyn ServiceImpl>,
        session_consumer: Option<SessionConsumer>,
    ) -> RpcResult<ServiceDefinition>;
}
