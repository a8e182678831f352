// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Socket transport configuration.
//!
//! # Example
//!
//! ```
//! use wirecall::transport::TransportConfig;
//! use std::time::Duration;
//!
//! let config = TransportConfig::new("127.0.0.1:7400".parse().unwrap())
//!     .with_connect_timeout(Duration::from_secs(2))
//!     .with_max_frame_size(1024 * 1024);
//! assert!(config.validate().is_ok());
//! ```

use crate::config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_LISTEN_BACKLOG, DEFAULT_MAX_FRAME_SIZE, MAX_FRAME_SIZE_LIMIT,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Settings shared by the socket client and server transports.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    // === Endpoint ===
    /// Server: address to bind (port 0 = ephemeral). Client: address to
    /// connect to.
    pub address: SocketAddr,

    // === Connection ===
    /// Timeout for outbound connections
    pub connect_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub nodelay: bool,

    // === Listener ===
    /// TCP listen backlog (pending connection queue size)
    pub listen_backlog: i32,

    /// Set SO_REUSEADDR on the listening socket
    pub reuse_address: bool,

    // === Framing ===
    /// Maximum frame payload in bytes; larger frames are rejected
    pub max_frame_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nodelay: true,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
            reuse_address: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl TransportConfig {
    /// Config for the given endpoint, defaults elsewhere.
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Builder: set endpoint address
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    /// Builder: set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder: set max frame size
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Builder: set TCP_NODELAY
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Builder: set listen backlog
    pub fn with_listen_backlog(mut self, backlog: i32) -> Self {
        self.listen_backlog = backlog;
        self
    }

    /// Builder: set SO_REUSEADDR
    pub fn with_reuse_address(mut self, reuse: bool) -> Self {
        self.reuse_address = reuse;
        self
    }

    /// Validate configuration, returning error message if invalid.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_frame_size == 0 {
            return Err("max_frame_size must be > 0");
        }
        if self.max_frame_size > MAX_FRAME_SIZE_LIMIT {
            return Err("max_frame_size too large (> 1 GB)");
        }
        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be > 0");
        }
        if self.listen_backlog <= 0 {
            return Err("listen_backlog must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.address.port(), 0);
        assert!(config.address.ip().is_loopback());
        assert_eq!(config.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(config.listen_backlog, 128);
        assert!(config.nodelay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let addr: SocketAddr = "10.1.2.3:9000".parse().unwrap();
        let config = TransportConfig::default()
            .with_address(addr)
            .with_nodelay(false)
            .with_listen_backlog(16)
            .with_reuse_address(false);
        assert_eq!(config.address, addr);
        assert!(!config.nodelay);
        assert_eq!(config.listen_backlog, 16);
        assert!(!config.reuse_address);
    }

    #[test]
    fn test_invalid_frame_size() {
        let config = TransportConfig::default().with_max_frame_size(0);
        assert!(config.validate().is_err());

        let config = TransportConfig::default().with_max_frame_size(2 * 1024 * 1024 * 1024);
        assert_eq!(config.validate(), Err("max_frame_size too large (> 1 GB)"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = TransportConfig::default().with_connect_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
