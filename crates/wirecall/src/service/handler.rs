// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service implementations as seen by proxies and dispatchers.

use super::Failure;
use crate::data::{FromValue, IntoValue, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Produces the session value attached to each outgoing call.
pub type SessionSupplier = Arc<dyn Fn() -> Value + Send + Sync>;

/// Receives the session value of each incoming call before the
/// implementation runs, on the thread that runs it.
pub type SessionConsumer = Arc<dyn Fn(Value) + Send + Sync>;

/// Implementation of a service interface.
///
/// `method` is the local (implementation) name of the resolved method and
/// `args` hold one value per declared parameter, in order.
pub trait ServiceImpl: Send + Sync + 'static {
    fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, Failure>;
}

/// A function-based implementation.
impl<F> ServiceImpl for F
where
    F: Fn(&str, Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
{
    fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, Failure> {
        self(method, args)
    }
}

type Route = Box<dyn Fn(Vec<Value>) -> Result<Value, Failure> + Send + Sync>;

/// Implementation built from one closure per method and arity.
///
/// # Example
///
/// ```
/// use wirecall::service::{MethodRouter, ServiceImpl};
/// use wirecall::Value;
///
/// let calc = MethodRouter::new()
///     .binary("add", |a: i32, b: i32| Ok(a + b))
///     .unary("neg", |a: i32| Ok(-a));
///
/// let sum = calc.invoke("add", vec![Value::Int(2), Value::Int(3)]).unwrap();
/// assert_eq!(sum, Value::Int(5));
/// ```
#[derive(Default)]
pub struct MethodRouter {
    routes: HashMap<(String, usize), Route>,
}

impl MethodRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a method taking raw values.
    pub fn route<F>(mut self, method: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        self.routes.insert((method.into(), arity), Box::new(f));
        self
    }

    pub fn nullary<R, F>(self, method: impl Into<String>, f: F) -> Self
    where
        R: IntoValue,
        F: Fn() -> Result<R, Failure> + Send + Sync + 'static,
    {
        self.route(method, 0, move |_| f().map(IntoValue::into_value))
    }

    pub fn unary<A, R, F>(self, method: impl Into<String>, f: F) -> Self
    where
        A: FromValue,
        R: IntoValue,
        F: Fn(A) -> Result<R, Failure> + Send + Sync + 'static,
    {
        self.route(method, 1, move |args| {
            let mut args = args.into_iter();
            let a = argument(args.next())?;
            f(a).map(IntoValue::into_value)
        })
    }

    pub fn binary<A, B, R, F>(self, method: impl Into<String>, f: F) -> Self
    where
        A: FromValue,
        B: FromValue,
        R: IntoValue,
        F: Fn(A, B) -> Result<R, Failure> + Send + Sync + 'static,
    {
        self.route(method, 2, move |args| {
            let mut args = args.into_iter();
            let a = argument(args.next())?;
            let b = argument(args.next())?;
            f(a, b).map(IntoValue::into_value)
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn argument<T: FromValue>(value: Option<Value>) -> Result<T, Failure> {
    T::from_value(value.unwrap_or(Value::Null))
        .map_err(|e| Failure::unchecked("IllegalArgument", e.to_string()))
}

impl ServiceImpl for MethodRouter {
    fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, Failure> {
        match self.routes.get(&(method.to_string(), args.len())) {
            Some(route) => route(args),
            None => Err(Failure::unchecked(
                "UnsupportedOperation",
                format!("{} with {} arguments", method, args.len()),
            )),
        }
    }
}

impl std::fmt::Debug for MethodRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut routes: Vec<_> = self
            .routes
            .keys()
            .map(|(name, arity)| format!("{}/{}", name, arity))
            .collect();
        routes.sort();
        f.debug_struct("MethodRouter").field("routes", &routes).finish()
    }
}
