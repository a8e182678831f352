// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide constants.
//!
//! Values that must agree between every client and server speaking the
//! protocol live here. Per-endpoint tunables are in
//! [`TransportConfig`](crate::transport::TransportConfig).

use std::time::Duration;

/// Suffix marking the asynchronous variant of a service method.
///
/// `add` and `add_async` share the wire method name `add`.
pub const ASYNC_SUFFIX: &str = "_async";

/// Name of the single field carried by a successful response struct.
pub const RESULT_FIELD: &str = "result";

/// Wire name of the response struct wrapping a successful result.
pub const RESULT_STRUCT: &str = "Result";

/// Suffix appended to a method's wire name to name its argument struct.
pub const REQUEST_STRUCT_SUFFIX: &str = "_Request";

/// Wire name of the struct carrying an application failure.
pub const FAILURE_STRUCT: &str = "Failure";

/// Frame header size (4 bytes for length).
pub const FRAME_HEADER_SIZE: usize = 4;

/// Default maximum frame payload (16 MB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Hard ceiling for a configured maximum frame payload (1 GB).
pub const MAX_FRAME_SIZE_LIMIT: usize = 1024 * 1024 * 1024;

/// Default timeout for outbound connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before accepting again after a failed accept.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Default TCP listen backlog.
pub const DEFAULT_LISTEN_BACKLOG: i32 = 128;

/// Read chunk size used by socket frame readers.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;
