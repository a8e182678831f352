// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side dispatch of decoded requests to bound implementations.

use super::{base_method_name, Failure, Request, Response, ServiceImpl, SessionConsumer};
use crate::data::Value;
use crate::error::RpcResult;
use crate::meta::{LocalType, MethodDefinition, ServiceDecl, ServiceDefinition, TypeRegistry};
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Invoke an implementation, turning a panic into an unchecked failure.
pub(crate) fn invoke_guarded(
    implementation: &dyn ServiceImpl,
    method: &str,
    args: Vec<Value>,
) -> Result<Value, Failure> {
    match catch_unwind(AssertUnwindSafe(|| implementation.invoke(method, args))) {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "implementation panicked".to_string());
            log::warn!("dispatch: {} panicked: {}", method, message);
            Err(Failure::unchecked("Panic", message))
        }
    }
}

/// Local parameter and return types of a resolved method, from its
/// declaration.
pub(crate) fn local_signature(
    decl: &ServiceDecl,
    method: &MethodDefinition,
) -> (Vec<LocalType>, LocalType) {
    let found = decl
        .methods_named(method.implementation_name())
        .find(|m| m.params.len() == method.arity());
    match found {
        Some(m) => (
            m.params.iter().map(|p| p.ty.clone()).collect(),
            m.returns.clone(),
        ),
        None => (vec![LocalType::Dynamic; method.arity()], LocalType::Dynamic),
    }
}

struct Binding {
    definition: ServiceDefinition,
    decl: ServiceDecl,
    implementation: Arc<dyn ServiceImpl>,
    session_consumer: Option<SessionConsumer>,
}

/// Routes requests to implementations bound by service wire name.
///
/// `dispatch` is synchronous and may run on many threads at once; server
/// transports call it from the blocking pool.
pub struct Dispatcher {
    registry: Arc<TypeRegistry>,
    bindings: DashMap<String, Arc<Binding>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            bindings: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Bind an implementation to the service's wire name, registering the
    /// declaration first. A later binding for the same name replaces it.
    pub fn register(
        &self,
        decl: &ServiceDecl,
        implementation: Arc<dyn ServiceImpl>,
        session_consumer: Option<SessionConsumer>,
    ) -> RpcResult<ServiceDefinition> {
        let definition = self.registry.register_service(decl)?;
        let binding = Arc::new(Binding {
            definition: definition.clone(),
            decl: decl.clone(),
            implementation,
            session_consumer,
        });
        if self
            .bindings
            .insert(definition.name.clone(), binding)
            .is_some()
        {
            log::warn!("dispatch: replaced binding for service '{}'", definition.name);
        }
        log::debug!(
            "dispatch: bound service '{}' ({} methods)",
            definition.name,
            definition.methods.len()
        );
        Ok(definition)
    }

    pub fn unregister(&self, service_name: &str) -> bool {
        self.bindings.remove(service_name).is_some()
    }

    pub fn is_bound(&self, service_name: &str) -> bool {
        self.bindings.contains_key(service_name)
    }

    /// Service wire names currently bound.
    pub fn services(&self) -> Vec<String> {
        self.bindings.iter().map(|e| e.key().clone()).collect()
    }

    /// Handle one request. Every failure, including unknown services and
    /// methods, is reported as an exception response.
    pub fn dispatch(&self, request: Request) -> Response {
        let request_id = request.request_id.clone();
        let outcome = self.dispatch_inner(request);
        if let Err(failure) = &outcome {
            log::debug!("dispatch: [{}] failed: {}", request_id, failure);
        }
        let adapters = self.registry.adapters();
        match outcome {
            Ok(value) => match adapters.adapt_local_to_remote(value) {
                Ok(value) => Response::success(value),
                Err(e) => Response::failure(Failure::unchecked("Conversion", e.to_string())),
            },
            Err(failure) => match failure.map_detail(|d| adapters.adapt_local_to_remote(d)) {
                Ok(failure) => Response::failure(failure),
                Err(e) => Response::failure(Failure::unchecked("Conversion", e.to_string())),
            },
        }
    }

    fn dispatch_inner(&self, request: Request) -> Result<Value, Failure> {
        let binding = self
            .bindings
            .get(&request.service_name)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| {
                Failure::unchecked(
                    "ServiceNotFound",
                    format!("no service bound as '{}'", request.service_name),
                )
            })?;

        let name = base_method_name(&request.method_name);
        let method = binding
            .definition
            .resolve(name, request.arguments.len())
            .ok_or_else(|| {
                Failure::unchecked(
                    "MethodNotFound",
                    format!(
                        "{}.{} with {} arguments",
                        binding.definition.name,
                        name,
                        request.arguments.len()
                    ),
                )
            })?;

        if !request.execute {
            log::debug!(
                "dispatch: [{}] probe {}.{}",
                request.request_id,
                binding.definition.name,
                method.name
            );
            return Ok(Value::Struct(method.to_struct()));
        }

        log::debug!(
            "dispatch: [{}] {}.{}",
            request.request_id,
            binding.definition.name,
            method.name
        );

        let adapters = self.registry.adapters();
        let (param_types, _) = local_signature(&binding.decl, method);
        let args = method
            .unpack_arguments(request.arguments)
            .into_iter()
            .zip(&param_types)
            .map(|(arg, ty)| adapters.adapt_remote_to_local(arg, ty))
            .collect::<RpcResult<Vec<_>>>()
            .map_err(|e| Failure::unchecked("IllegalArgument", e.to_string()))?;

        if let Some(consumer) = &binding.session_consumer {
            let session_type = binding.decl.session.clone().unwrap_or(LocalType::Dynamic);
            let session = adapters
                .adapt_remote_to_local(request.session, &session_type)
                .map_err(|e| Failure::unchecked("IllegalArgument", e.to_string()))?;
            consumer(session);
        }

        invoke_guarded(
            binding.implementation.as_ref(),
            method.implementation_name(),
            args,
        )
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("services", &self.services())
            .finish()
    }
}
