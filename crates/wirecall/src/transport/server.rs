// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP server transport.

use super::{
    FrameCodec, JsonProtocol, MessageProtocol, Protocol, ServerTransport, TransportConfig,
};
use crate::config::ACCEPT_RETRY_DELAY;
use crate::error::{RpcResult, TransportError};
use crate::meta::{ServiceDecl, ServiceDefinition};
use crate::service::{Dispatcher, Failure, Request, Response, ServiceImpl, SessionConsumer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::Notify;

/// Accepts connections and answers framed requests through a [`Dispatcher`].
///
/// Each connection is served by its own task and may carry any number of
/// sequential requests. Dispatch runs on the blocking pool, so slow
/// implementations never stall the accept loop.
pub struct SocketServerTransport<P = JsonProtocol> {
    dispatcher: Arc<Dispatcher>,
    protocol: Arc<P>,
    config: TransportConfig,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
    connections_served: Arc<AtomicU64>,
}

impl SocketServerTransport {
    /// Bind `config.address` and start accepting on `handle`.
    pub fn bind(
        config: TransportConfig,
        dispatcher: Arc<Dispatcher>,
        handle: &Handle,
    ) -> RpcResult<Self> {
        Self::bind_with_protocol(config, dispatcher, JsonProtocol, handle)
    }
}

impl<P: MessageProtocol> SocketServerTransport<P> {
    pub fn bind_with_protocol(
        config: TransportConfig,
        dispatcher: Arc<Dispatcher>,
        protocol: P,
        handle: &Handle,
    ) -> RpcResult<Self> {
        config.validate().map_err(TransportError::InvalidConfig)?;

        let addr = config.address;
        let std_listener =
            create_listener(&config).map_err(|source| TransportError::Bind { addr, source })?;
        let listener = {
            let _guard = handle.enter();
            TcpListener::from_std(std_listener)
                .map_err(|source| TransportError::Bind { addr, source })?
        };
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        let server = Self {
            dispatcher,
            protocol: Arc::new(protocol),
            config,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            connections_served: Arc::new(AtomicU64::new(0)),
        };

        handle.spawn(accept_loop(
            listener,
            Arc::clone(&server.dispatcher),
            Arc::clone(&server.protocol),
            server.config.clone(),
            Arc::clone(&server.shutdown),
            Arc::clone(&server.notify),
            Arc::clone(&server.connections_served),
        ));

        log::info!("server: listening on {}", local_addr);
        Ok(server)
    }

    /// Bound address, with the real port when the config asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Connections accepted so far.
    pub fn connections_served(&self) -> u64 {
        self.connections_served.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting. Connections already open finish their current
    /// request and close when the peer does.
    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
            log::info!("server: stopping listener on {}", self.local_addr);
        }
    }
}

impl<P: MessageProtocol> ServerTransport for SocketServerTransport<P> {
    fn register(
        &self,
        decl: &ServiceDecl,
        implementation: Arc<dyn ServiceImpl>,
        session_consumer: Option<SessionConsumer>,
    ) -> RpcResult<ServiceDefinition> {
        self.dispatcher.register(decl, implementation, session_consumer)
    }
}

impl<P> Drop for SocketServerTransport<P> {
    fn drop(&mut self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }
}

impl<P> std::fmt::Debug for SocketServerTransport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketServerTransport")
            .field("local_addr", &self.local_addr)
            .field("running", &!self.shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

fn create_listener(config: &TransportConfig) -> std::io::Result<std::net::TcpListener> {
    let addr = config.address;
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;
    socket.set_reuse_address(config.reuse_address)?;
    socket.bind(&addr.into())?;
    socket.listen(config.listen_backlog)?;

    let listener: std::net::TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}

async fn accept_loop<P: MessageProtocol>(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    protocol: Arc<P>,
    config: TransportConfig,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
    connections_served: Arc<AtomicU64>,
) {
    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        tokio::select! {
            _ = notify.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections_served.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = stream.set_nodelay(config.nodelay) {
                        log::debug!("server: set_nodelay for {} failed: {}", peer, e);
                    }
                    log::debug!("server: accepted connection from {}", peer);
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&dispatcher),
                        Arc::clone(&protocol),
                        config.max_frame_size,
                    ));
                }
                Err(e) => {
                    // Errors such as EMFILE persist until a connection closes.
                    log::error!("server: accept failed: {}", e);
                    if back_off(&notify).await {
                        break;
                    }
                }
            },
        }
    }
    log::debug!("server: accept loop exited");
}

/// Wait out [`ACCEPT_RETRY_DELAY`]; `true` when shutdown arrived meanwhile.
async fn back_off(notify: &Notify) -> bool {
    tokio::select! {
        _ = notify.notified() => true,
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => false,
    }
}

async fn serve_connection<P: MessageProtocol>(
    mut stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    protocol: Arc<P>,
    max_frame_size: usize,
) {
    let mut codec = FrameCodec::new(max_frame_size);
    loop {
        let frame = match codec.read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(TransportError::Closed) => break,
            Err(e) => {
                log::warn!("server: read from {} failed: {}", peer, e);
                break;
            }
        };

        let request = match Protocol::<Request>::deserialize(protocol.as_ref(), &frame) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("server: undecodable request from {}: {}", peer, e);
                break;
            }
        };

        let request_id = request.request_id.clone();
        let worker = Arc::clone(&dispatcher);
        let response = match tokio::task::spawn_blocking(move || worker.dispatch(request)).await
        {
            Ok(response) => response,
            Err(e) => Response::failure(Failure::unchecked("Panic", e.to_string())),
        };

        let bytes = match Protocol::<Response>::serialize(protocol.as_ref(), &response) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("server: [{}] response not encodable: {}", request_id, e);
                let fallback =
                    Response::failure(Failure::unchecked("Conversion", e.to_string()));
                match Protocol::<Response>::serialize(protocol.as_ref(), &fallback) {
                    Ok(bytes) => bytes,
                    Err(_) => break,
                }
            }
        };

        if let Err(e) = codec.write_frame(&mut stream, &bytes).await {
            log::warn!("server: [{}] write to {} failed: {}", request_id, peer, e);
            break;
        }
    }
    log::debug!("server: connection from {} closed", peer);
}
