// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Completion handles for calls in flight.

use crate::data::{FromValue, Value};
use crate::error::{RpcError, RpcResult, TransportError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Sending half of a [`Pending`]; completing it wakes the waiter.
pub type Completer<T> = oneshot::Sender<RpcResult<T>>;

/// Handle to a result that is not available yet.
///
/// Await it from async code, or [`wait`](Self::wait) from a plain thread.
/// Dropping the handle does not cancel the work behind it.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<RpcResult<T>>,
}

/// Pending return value of an asynchronous service call.
pub type PendingCall = Pending<Value>;

impl<T> Pending<T> {
    /// Create a connected completer/handle pair.
    pub fn channel() -> (Completer<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A handle that is already complete.
    pub fn ready(result: RpcResult<T>) -> Self {
        let (tx, pending) = Self::channel();
        // The receiver is alive, the send cannot fail.
        let _ = tx.send(result);
        pending
    }

    /// Block the current thread until the result is available.
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn wait(self) -> RpcResult<T> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(RpcError::Transport(TransportError::Abandoned)))
    }

    /// Result if already complete, without blocking.
    pub fn try_take(&mut self) -> Option<RpcResult<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(RpcError::Transport(TransportError::Abandoned)))
            }
        }
    }
}

impl Pending<Value> {
    /// Block and convert the value.
    pub fn wait_as<T: FromValue>(self) -> RpcResult<T> {
        self.wait().and_then(T::from_value)
    }
}

impl<T> Future for Pending<T> {
    type Output = RpcResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or(Err(RpcError::Transport(TransportError::Abandoned)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_and_wait() {
        let pending = Pending::ready(Ok(Value::Int(5)));
        assert_eq!(pending.wait_as::<i32>().unwrap(), 5);
    }

    #[test]
    fn test_dropped_completer_is_abandoned() {
        let (tx, pending) = Pending::<Value>::channel();
        drop(tx);
        assert!(matches!(
            pending.wait(),
            Err(RpcError::Transport(TransportError::Abandoned))
        ));
    }

    #[test]
    fn test_completion_from_other_thread() {
        let (tx, pending) = Pending::channel();
        let worker = std::thread::spawn(move || {
            let _ = tx.send(Ok(Value::from("done")));
        });
        assert_eq!(pending.wait().unwrap(), Value::from("done"));
        worker.join().unwrap();
    }

    #[test]
    fn test_try_take() {
        let (tx, mut pending) = Pending::<Value>::channel();
        assert!(pending.try_take().is_none());
        let _ = tx.send(Ok(Value::Null));
        assert!(matches!(pending.try_take(), Some(Ok(Value::Null))));
    }

    #[test]
    fn test_await() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let value = rt.block_on(Pending::ready(Ok(Value::Bool(true)))).unwrap();
        assert_eq!(value, Value::Bool(true));
    }
}
