// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP client transport: one connection per call.

use super::{
    ClientTransport, FrameCodec, JsonProtocol, MessageProtocol, PendingResponse, Protocol,
    TransportConfig,
};
use crate::error::{RpcError, RpcResult, TransportError};
use crate::service::{Pending, Request, Response};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::runtime::Handle;

/// Sends each request over a fresh TCP connection.
///
/// `send` only schedules the exchange on the runtime; the connection is
/// opened, used for one request/response pair and closed by a task.
///
/// Call states, logged at trace level:
///
/// ```text
/// INIT -> SENDING -> AWAITING_RESPONSE -> COMPLETED
///            |               |
///            +---------------+-----------> FAILED
/// ```
pub struct SocketClientTransport<P = JsonProtocol> {
    config: TransportConfig,
    protocol: Arc<P>,
    handle: Handle,
}

impl SocketClientTransport {
    /// Client for `config.address` using the JSON protocol.
    pub fn new(config: TransportConfig, handle: Handle) -> RpcResult<Self> {
        Self::with_protocol(config, JsonProtocol, handle)
    }
}

impl<P: MessageProtocol> SocketClientTransport<P> {
    pub fn with_protocol(config: TransportConfig, protocol: P, handle: Handle) -> RpcResult<Self> {
        config.validate().map_err(TransportError::InvalidConfig)?;
        Ok(Self {
            config,
            protocol: Arc::new(protocol),
            handle,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl<P: MessageProtocol> ClientTransport for SocketClientTransport<P> {
    fn send(&self, request: Request) -> PendingResponse {
        let payload = match Protocol::<Request>::serialize(self.protocol.as_ref(), &request) {
            Ok(payload) => payload,
            Err(e) => {
                log::trace!("client: [{}] FAILED: {}", request.request_id, e);
                return Pending::ready(Err(RpcError::Transport(e)));
            }
        };

        let (completer, pending) = Pending::channel();
        let config = self.config.clone();
        let protocol = Arc::clone(&self.protocol);
        let request_id = request.request_id;

        self.handle.spawn(async move {
            let result = exchange(&config, protocol.as_ref(), &request_id, &payload).await;
            match &result {
                Ok(_) => log::trace!("client: [{}] COMPLETED", request_id),
                Err(e) => log::trace!("client: [{}] FAILED: {}", request_id, e),
            }
            let _ = completer.send(result.map_err(RpcError::Transport));
        });
        pending
    }
}

async fn exchange<P: MessageProtocol>(
    config: &TransportConfig,
    protocol: &P,
    request_id: &str,
    payload: &[u8],
) -> Result<Response, TransportError> {
    let addr = config.address;
    log::trace!("client: [{}] SENDING to {}", request_id, addr);

    let mut stream = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr)).await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
        Err(_) => return Err(TransportError::ConnectTimeout(addr)),
    };
    if let Err(e) = stream.set_nodelay(config.nodelay) {
        log::debug!("client: set_nodelay failed: {}", e);
    }

    let mut codec = FrameCodec::new(config.max_frame_size);
    codec.write_frame(&mut stream, payload).await?;

    log::trace!("client: [{}] AWAITING_RESPONSE", request_id);
    let frame = codec.read_frame(&mut stream).await?;
    Protocol::<Response>::deserialize(protocol, &frame)
}

impl<P> std::fmt::Debug for SocketClientTransport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClientTransport")
            .field("address", &self.config.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DynamicStruct;
    use std::net::TcpListener;
    use std::time::Duration;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    fn unused_addr() -> std::net::SocketAddr {
        // Bind then release to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    #[test]
    fn test_unreachable_is_transport_error() {
        let rt = runtime();
        let config = TransportConfig::new(unused_addr())
            .with_connect_timeout(Duration::from_millis(500));
        let client = SocketClientTransport::new(config, rt.handle().clone()).unwrap();

        let request = Request::new("S", "m", DynamicStruct::default(), "c-1");
        match client.send(request).wait() {
            Err(RpcError::Transport(
                TransportError::Connect { .. } | TransportError::ConnectTimeout(_),
            )) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_peer_closing_early_is_transport_error() {
        let rt = runtime();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            // Accept and hang up without answering.
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let client =
            SocketClientTransport::new(TransportConfig::new(addr), rt.handle().clone()).unwrap();
        let request = Request::new("S", "m", DynamicStruct::default(), "c-2");
        let result = client.send(request).wait();
        server.join().unwrap();

        match result {
            Err(e) => assert!(e.is_transport()),
            Ok(r) => panic!("unexpected response {:?}", r),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let rt = runtime();
        let config = TransportConfig::default().with_max_frame_size(0);
        assert!(matches!(
            SocketClientTransport::new(config, rt.handle().clone()),
            Err(RpcError::Transport(TransportError::InvalidConfig(_)))
        ));
    }
}
