// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service proxies, server-side dispatch and the call envelopes.
//!
//! Every declared method `m` can be called as `m` (blocking) or as
//! `m_async` (returns a [`PendingCall`]). Both spellings resolve to the same
//! declared method and travel under the same wire method name.

mod dispatch;
mod failure;
mod handler;
mod message;
mod pending;
mod proxy;

pub use dispatch::Dispatcher;
pub use failure::Failure;
pub use handler::{MethodRouter, ServiceImpl, SessionConsumer, SessionSupplier};
pub use message::{Request, Response};
pub use pending::{Completer, Pending, PendingCall};
pub use proxy::{Invocation, LocalProxy, RemoteProxy, ServiceProxy, ServiceProxyFactory};

use crate::config::ASYNC_SUFFIX;

/// Whether a called method name uses the asynchronous convention.
pub fn is_async_method(name: &str) -> bool {
    name.len() > ASYNC_SUFFIX.len() && name.ends_with(ASYNC_SUFFIX)
}

/// Declared method name behind a called name.
pub fn base_method_name(name: &str) -> &str {
    if is_async_method(name) {
        &name[..name.len() - ASYNC_SUFFIX.len()]
    } else {
        name
    }
}

/// Asynchronous spelling of a declared method name.
pub fn async_method_name(name: &str) -> String {
    format!("{}{}", name, ASYNC_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_and_async_share_base_name() {
        assert_eq!(base_method_name("add"), "add");
        assert_eq!(base_method_name("add_async"), "add");
        assert_eq!(base_method_name(&async_method_name("add")), "add");
        assert!(is_async_method("add_async"));
        assert!(!is_async_method("add"));
    }

    #[test]
    fn test_bare_suffix_is_not_async() {
        assert!(!is_async_method("_async"));
        assert_eq!(base_method_name("_async"), "_async");
    }
}
