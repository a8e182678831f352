// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side proxies over a service declaration.
//!
//! Typed stubs funnel every call into [`ServiceProxy::invoke`]; the method
//! name alone decides whether the call blocks or returns a pending handle.

use super::dispatch::{invoke_guarded, Dispatcher};
use super::{
    async_method_name, base_method_name, is_async_method, Failure, PendingCall, Request, Response,
    ServiceImpl, SessionConsumer, SessionSupplier,
};
use crate::config::RESULT_FIELD;
use crate::data::{DynamicStruct, Value};
use crate::error::{RpcError, RpcResult, ServiceError};
use crate::meta::{
    LocalType, MethodDecl, MethodDefinition, ServiceDecl, ServiceDefinition, TypeRegistry,
};
use crate::transport::ClientTransport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> String {
    format!(
        "{:x}-{}",
        std::process::id(),
        REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

/// Outcome of [`ServiceProxy::invoke`].
#[derive(Debug)]
pub enum Invocation {
    /// Synchronous call, already finished
    Completed(RpcResult<Value>),

    /// Asynchronous call, completes later
    Pending(PendingCall),
}

impl Invocation {
    /// Result of the call, blocking for a pending one.
    pub fn wait(self) -> RpcResult<Value> {
        match self {
            Self::Completed(result) => result,
            Self::Pending(pending) => pending.wait(),
        }
    }

    /// The call as a pending handle.
    pub fn into_pending(self) -> PendingCall {
        match self {
            Self::Completed(result) => PendingCall::ready(result),
            Self::Pending(pending) => pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Generic entry point behind typed service stubs.
pub trait ServiceProxy: Send + Sync {
    fn definition(&self) -> &ServiceDefinition;

    /// Call `method` (`name` or `name_async`) with positional arguments.
    fn invoke(&self, method: &str, args: Vec<Value>) -> Invocation;

    /// Blocking call of a declared method.
    fn call(&self, method: &str, args: Vec<Value>) -> RpcResult<Value> {
        self.invoke(method, args).wait()
    }

    /// Asynchronous call of a declared method.
    fn call_async(&self, method: &str, args: Vec<Value>) -> PendingCall {
        self.invoke(&async_method_name(method), args).into_pending()
    }
}

/// Find the declared method called `name` with `arity` parameters and its
/// wire definition.
fn resolve<'a>(
    decl: &'a ServiceDecl,
    definition: &'a ServiceDefinition,
    name: &'a str,
    arity: usize,
) -> RpcResult<(&'a MethodDecl, &'a MethodDefinition)> {
    decl.methods_named(name)
        .find(|m| m.params.len() == arity)
        .and_then(|m| {
            definition
                .resolve(m.resolved_wire_name(), arity)
                .map(|def| (m, def))
        })
        .ok_or_else(|| RpcError::MethodNotFound {
            service: definition.name.clone(),
            method: format!("{}/{}", name, arity),
        })
}

// ---------------------------------------------------------------------------
// Local proxy
// ---------------------------------------------------------------------------

/// Proxy calling an in-process implementation.
///
/// Synchronous calls run on the caller's thread and propagate the
/// implementation's failure unwrapped. Asynchronous calls run on the
/// runtime's blocking pool after handing the supplied session to the
/// session consumer.
pub struct LocalProxy {
    definition: ServiceDefinition,
    decl: ServiceDecl,
    implementation: Arc<dyn ServiceImpl>,
    session_supplier: Option<SessionSupplier>,
    session_consumer: Option<SessionConsumer>,
    handle: Handle,
}

impl ServiceProxy for LocalProxy {
    fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> Invocation {
        let base = base_method_name(method);
        let method_def = match resolve(&self.decl, &self.definition, base, args.len()) {
            Ok((_, def)) => def,
            Err(e) => return Invocation::Completed(Err(e)),
        };
        let name = method_def.implementation_name().to_string();

        if !is_async_method(method) {
            log::trace!("local: {}.{} sync", self.definition.name, name);
            return Invocation::Completed(
                self.implementation
                    .invoke(&name, args)
                    .map_err(RpcError::Failure),
            );
        }

        log::trace!("local: {}.{} scheduled", self.definition.name, name);
        let (completer, pending) = PendingCall::channel();
        let implementation = Arc::clone(&self.implementation);
        let supplier = self.session_supplier.clone();
        let consumer = self.session_consumer.clone();

        self.handle.spawn_blocking(move || {
            if let Some(consumer) = consumer {
                consumer(supplier.map(|s| s()).unwrap_or_default());
            }
            let result = invoke_guarded(implementation.as_ref(), &name, args);
            let _ = completer.send(result.map_err(RpcError::Failure));
        });
        Invocation::Pending(pending)
    }
}

impl std::fmt::Debug for LocalProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalProxy")
            .field("service", &self.definition.name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Remote proxy
// ---------------------------------------------------------------------------

/// Proxy sending calls through a [`ClientTransport`].
pub struct RemoteProxy {
    definition: ServiceDefinition,
    decl: ServiceDecl,
    transport: Arc<dyn ClientTransport>,
    session_supplier: Option<SessionSupplier>,
    registry: Arc<TypeRegistry>,
    handle: Handle,
}

impl RemoteProxy {
    fn session(&self) -> RpcResult<Value> {
        match &self.session_supplier {
            Some(supplier) => self.registry.adapters().adapt_local_to_remote(supplier()),
            None => Ok(Value::Null),
        }
    }

    fn build_request(&self, method: &MethodDefinition, args: Vec<Value>) -> RpcResult<Request> {
        let adapters = self.registry.adapters();
        let args = args
            .into_iter()
            .map(|a| adapters.adapt_local_to_remote(a))
            .collect::<RpcResult<Vec<_>>>()?;
        let packed = method.pack_arguments(args)?;
        Ok(
            Request::new(&self.definition.name, &method.name, packed, next_request_id())
                .with_session(self.session()?),
        )
    }

    /// Ask the server for its definition of a method, without invoking it.
    pub fn probe(&self, method: &str, arity: usize) -> RpcResult<DynamicStruct> {
        let (_, method_def) = resolve(&self.decl, &self.definition, method, arity)?;
        let request = self
            .build_request(method_def, vec![Value::Null; arity])?
            .probe();
        let response = self.transport.send(request).wait()?;
        let value = complete(&self.registry, response, &LocalType::Dynamic)?;
        match value {
            Value::Struct(s) => Ok(s),
            other => Err(RpcError::conversion(format!(
                "probe answered with {}",
                other.kind()
            ))),
        }
    }
}

/// Turn a response into the caller's result.
fn complete(registry: &TypeRegistry, response: Response, returns: &LocalType) -> RpcResult<Value> {
    let adapters = registry.adapters();
    match response {
        Response::Result(mut s) => {
            let value = s.remove_field(RESULT_FIELD).unwrap_or_default();
            adapters.adapt_remote_to_local(value, returns)
        }
        Response::Exception(value) => {
            let failure = Failure::from_value(value)?
                .map_detail(|d| adapters.adapt_remote_to_local_untyped(d))?;
            if failure.is_checked() {
                Err(RpcError::Service(ServiceError::new(failure)))
            } else {
                Err(RpcError::Failure(failure))
            }
        }
    }
}

impl ServiceProxy for RemoteProxy {
    fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> Invocation {
        let base = base_method_name(method);
        let (method_decl, method_def) =
            match resolve(&self.decl, &self.definition, base, args.len()) {
                Ok(found) => found,
                Err(e) => return Invocation::Completed(Err(e)),
            };
        let request = match self.build_request(method_def, args) {
            Ok(request) => request,
            Err(e) => return Invocation::Completed(Err(e)),
        };
        let returns = method_decl.returns.clone();
        log::trace!(
            "remote: [{}] {}.{} INIT",
            request.request_id,
            request.service_name,
            request.method_name
        );

        let response = self.transport.send(request);

        if !is_async_method(method) {
            return Invocation::Completed(
                response
                    .wait()
                    .and_then(|r| complete(&self.registry, r, &returns)),
            );
        }

        let (completer, pending) = PendingCall::channel();
        let registry = Arc::clone(&self.registry);
        self.handle.spawn(async move {
            let result = match response.await {
                Ok(r) => complete(&registry, r, &returns),
                Err(e) => Err(e),
            };
            let _ = completer.send(result);
        });
        Invocation::Pending(pending)
    }
}

impl std::fmt::Debug for RemoteProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProxy")
            .field("service", &self.definition.name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds proxies and dispatchers sharing one registry and runtime.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use wirecall::meta::{LocalType, MethodDecl, ServiceDecl, TypeRegistry};
/// use wirecall::service::{MethodRouter, ServiceProxy, ServiceProxyFactory};
/// use wirecall::Value;
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// let factory = ServiceProxyFactory::new(Arc::new(TypeRegistry::new()), runtime.handle().clone());
///
/// let calc = ServiceDecl::new("demo::Calculator").method(
///     MethodDecl::new("add")
///         .param("a", LocalType::Int)
///         .param("b", LocalType::Int)
///         .returns(LocalType::Int),
/// );
/// let implementation = MethodRouter::new().binary("add", |a: i32, b: i32| Ok(a + b));
/// let proxy = factory
///     .create_local_proxy(&calc, Arc::new(implementation), None, None)
///     .unwrap();
///
/// assert_eq!(proxy.call("add", vec![Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
/// let pending = proxy.call_async("add", vec![Value::Int(4), Value::Int(4)]);
/// assert_eq!(pending.wait().unwrap(), Value::Int(8));
/// ```
#[derive(Debug, Clone)]
pub struct ServiceProxyFactory {
    registry: Arc<TypeRegistry>,
    handle: Handle,
}

impl ServiceProxyFactory {
    pub fn new(registry: Arc<TypeRegistry>, handle: Handle) -> Self {
        Self { registry, handle }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Proxy over an in-process implementation.
    pub fn create_local_proxy(
        &self,
        decl: &ServiceDecl,
        implementation: Arc<dyn ServiceImpl>,
        session_supplier: Option<SessionSupplier>,
        session_consumer: Option<SessionConsumer>,
    ) -> RpcResult<LocalProxy> {
        let definition = self.registry.register_service(decl)?;
        log::debug!("proxy: local proxy for '{}'", definition.name);
        Ok(LocalProxy {
            definition,
            decl: decl.clone(),
            implementation,
            session_supplier,
            session_consumer,
            handle: self.handle.clone(),
        })
    }

    /// Proxy sending every call through `transport`.
    pub fn create_remote_proxy(
        &self,
        decl: &ServiceDecl,
        transport: Arc<dyn ClientTransport>,
        session_supplier: Option<SessionSupplier>,
    ) -> RpcResult<RemoteProxy> {
        let definition = self.registry.register_service(decl)?;
        log::debug!("proxy: remote proxy for '{}'", definition.name);
        Ok(RemoteProxy {
            definition,
            decl: decl.clone(),
            transport,
            session_supplier,
            registry: Arc::clone(&self.registry),
            handle: self.handle.clone(),
        })
    }

    /// Empty dispatcher over this factory's registry.
    pub fn create_dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MethodDecl;
    use crate::service::MethodRouter;
    use crate::transport::LoopbackClientTransport;
    use parking_lot::Mutex;

    fn calculator() -> ServiceDecl {
        ServiceDecl::new("demo::Calculator")
            .method(
                MethodDecl::new("add")
                    .param("a", LocalType::Int)
                    .param("b", LocalType::Int)
                    .returns(LocalType::Int),
            )
            .method(
                MethodDecl::new("withdraw")
                    .param("amount", LocalType::Long)
                    .returns(LocalType::Long),
            )
            .method(MethodDecl::new("reset"))
    }

    fn router() -> MethodRouter {
        MethodRouter::new()
            .binary("add", |a: i32, b: i32| Ok(a + b))
            .unary("withdraw", |amount: i64| {
                if amount > 100 {
                    Err(Failure::declared("Overdrawn", "balance below zero").with_detail(amount))
                } else {
                    Ok(100 - amount)
                }
            })
            .nullary("reset", || Err::<(), _>(Failure::unchecked("IllegalState", "closed")))
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_local_sync_and_async() {
        let rt = runtime();
        let factory = ServiceProxyFactory::new(Arc::new(TypeRegistry::new()), rt.handle().clone());
        let proxy = factory
            .create_local_proxy(&calculator(), Arc::new(router()), None, None)
            .unwrap();

        let sync = proxy.invoke("add", vec![Value::Int(2), Value::Int(3)]);
        assert!(!sync.is_pending());
        assert_eq!(sync.wait().unwrap(), Value::Int(5));

        let pending = proxy.invoke("add_async", vec![Value::Int(2), Value::Int(3)]);
        assert!(pending.is_pending());
        assert_eq!(pending.wait().unwrap(), Value::Int(5));
    }

    #[test]
    fn test_local_failure_unwrapped() {
        let rt = runtime();
        let factory = ServiceProxyFactory::new(Arc::new(TypeRegistry::new()), rt.handle().clone());
        let proxy = factory
            .create_local_proxy(&calculator(), Arc::new(router()), None, None)
            .unwrap();

        match proxy.call("withdraw", vec![Value::Long(500)]) {
            Err(RpcError::Failure(f)) => assert_eq!(f.name(), "Overdrawn"),
            other => panic!("unexpected {:?}", other),
        }
        match proxy.call_async("withdraw", vec![Value::Long(500)]).wait() {
            Err(RpcError::Failure(f)) => assert!(f.is_checked()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_local_async_consumes_session() {
        let rt = runtime();
        let factory = ServiceProxyFactory::new(Arc::new(TypeRegistry::new()), rt.handle().clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let proxy = factory
            .create_local_proxy(
                &calculator(),
                Arc::new(router()),
                Some(Arc::new(|| Value::from("alice"))),
                Some(Arc::new(move |s: Value| sink.lock().push(s))),
            )
            .unwrap();

        proxy
            .call_async("add", vec![Value::Int(1), Value::Int(1)])
            .wait()
            .unwrap();
        assert_eq!(*seen.lock(), vec![Value::from("alice")]);
    }

    #[test]
    fn test_unknown_method() {
        let rt = runtime();
        let factory = ServiceProxyFactory::new(Arc::new(TypeRegistry::new()), rt.handle().clone());
        let proxy = factory
            .create_local_proxy(&calculator(), Arc::new(router()), None, None)
            .unwrap();

        assert!(matches!(
            proxy.call("add", vec![Value::Int(1)]),
            Err(RpcError::MethodNotFound { .. })
        ));
    }

    fn remote(rt: &tokio::runtime::Runtime) -> RemoteProxy {
        let registry = Arc::new(TypeRegistry::new());
        let factory = ServiceProxyFactory::new(Arc::clone(&registry), rt.handle().clone());
        let dispatcher = Arc::new(factory.create_dispatcher());
        dispatcher
            .register(&calculator(), Arc::new(router()), None)
            .unwrap();
        let transport = Arc::new(LoopbackClientTransport::new(dispatcher, rt.handle().clone()));
        factory
            .create_remote_proxy(&calculator(), transport, None)
            .unwrap()
    }

    #[test]
    fn test_remote_failures_classified() {
        let rt = runtime();
        let proxy = remote(&rt);

        match proxy.call("withdraw", vec![Value::Long(500)]) {
            Err(RpcError::Service(e)) => {
                assert_eq!(e.cause().name(), "Overdrawn");
                assert_eq!(e.cause().detail(), Some(&Value::Long(500)));
            }
            other => panic!("unexpected {:?}", other),
        }
        match proxy.call("reset", vec![]) {
            Err(RpcError::Failure(f)) => assert_eq!(f.name(), "IllegalState"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_remote_void_and_async() {
        let rt = runtime();
        let proxy = remote(&rt);

        let pending = proxy.call_async("withdraw", vec![Value::Long(30)]);
        assert_eq!(pending.wait().unwrap(), Value::Long(70));

        let value = rt
            .block_on(proxy.call_async("add", vec![Value::Int(20), Value::Int(22)]))
            .unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn test_remote_probe() {
        let rt = runtime();
        let proxy = remote(&rt);

        let method = proxy.probe("add", 2).unwrap();
        assert_eq!(method.get_field("name"), Some(&Value::from("add")));
        let params = method
            .get_field("parameters")
            .and_then(Value::as_elements)
            .unwrap();
        assert_eq!(params.len(), 2);
    }
}
