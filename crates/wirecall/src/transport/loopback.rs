// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process client transport.

use super::{ClientTransport, JsonProtocol, MessageProtocol, PendingResponse, Protocol};
use crate::error::{RpcError, RpcResult};
use crate::service::{Dispatcher, Failure, Pending, Request, Response};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Hands requests straight to a [`Dispatcher`] in the same process.
///
/// Requests and responses still pass through the protocol, so a call sees
/// exactly what it would see over a socket, without any I/O.
pub struct LoopbackClientTransport<P = JsonProtocol> {
    dispatcher: Arc<Dispatcher>,
    protocol: Arc<P>,
    handle: Handle,
}

impl LoopbackClientTransport {
    pub fn new(dispatcher: Arc<Dispatcher>, handle: Handle) -> Self {
        Self::with_protocol(dispatcher, JsonProtocol, handle)
    }
}

impl<P: MessageProtocol> LoopbackClientTransport<P> {
    pub fn with_protocol(dispatcher: Arc<Dispatcher>, protocol: P, handle: Handle) -> Self {
        Self {
            dispatcher,
            protocol: Arc::new(protocol),
            handle,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

fn exchange<P: MessageProtocol>(
    dispatcher: &Dispatcher,
    protocol: &P,
    payload: &[u8],
) -> RpcResult<Response> {
    let request = Protocol::<Request>::deserialize(protocol, payload)?;
    let response = dispatcher.dispatch(request);
    let bytes = Protocol::<Response>::serialize(protocol, &response)?;
    Ok(Protocol::<Response>::deserialize(protocol, &bytes)?)
}

impl<P: MessageProtocol> ClientTransport for LoopbackClientTransport<P> {
    fn send(&self, request: Request) -> PendingResponse {
        let payload = match Protocol::<Request>::serialize(self.protocol.as_ref(), &request) {
            Ok(payload) => payload,
            Err(e) => return Pending::ready(Err(RpcError::Transport(e))),
        };

        let (completer, pending) = Pending::channel();
        let dispatcher = Arc::clone(&self.dispatcher);
        let protocol = Arc::clone(&self.protocol);
        let request_id = request.request_id;
        let task = self
            .handle
            .spawn_blocking(move || exchange(&dispatcher, protocol.as_ref(), &payload));

        self.handle.spawn(async move {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("loopback: [{}] dispatch task failed: {}", request_id, e);
                    Ok(Response::failure(Failure::unchecked("Panic", e.to_string())))
                }
            };
            let _ = completer.send(result);
        });
        pending
    }
}

impl<P> std::fmt::Debug for LoopbackClientTransport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackClientTransport")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DynamicStruct, Value};
    use crate::meta::{LocalType, MethodDecl, ServiceDecl, TypeRegistry};
    use crate::service::MethodRouter;

    #[test]
    fn test_loopback_roundtrip() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(TypeRegistry::new())));
        let decl = ServiceDecl::new("Echo").method(
            MethodDecl::new("echo")
                .param("text", LocalType::String)
                .returns(LocalType::String),
        );
        dispatcher
            .register(
                &decl,
                Arc::new(MethodRouter::new().unary("echo", |s: String| Ok(s))),
                None,
            )
            .unwrap();

        let transport = LoopbackClientTransport::new(dispatcher, rt.handle().clone());
        let args = DynamicStruct::new("echo_Request").with_field("text", "hi");
        let response = transport
            .send(Request::new("Echo", "echo", args, "l-1"))
            .wait()
            .unwrap();
        assert_eq!(response, Response::success(Value::from("hi")));
    }
}
