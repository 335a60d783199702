//! Deploy-or-attach policy for a single spec.

use alloy_core::primitives::Address;

use crate::{
    component::{Component, DeploymentMode},
    error::OrchestrationError,
    registry::AddressRegistry,
    resource::{ArgDescriptor, ArgValue, EncodedCall, ResourceSpec, RunContext},
    traits::ChainBackend,
};

/// Result of resolving one spec.
#[derive(Debug, Clone)]
pub struct Resolution<H> {
    pub component: Component,
    /// Bound handle when the spec was attached. Deployed components are bound lazily,
    /// only if a link call targets them.
    pub handle: Option<H>,
}

/// Turn argument descriptors into concrete values.
///
/// Literals pass through; references are read from the registry and fail with
/// `UnresolvedDependency` when missing. A parameter that was never substituted is
/// reported the same way under the name `param:<name>`. Encoded calls keep their
/// structure with their own arguments resolved.
pub fn resolve_args(
    args: &[ArgDescriptor],
    registry: &AddressRegistry,
    sender: Address,
) -> Result<Vec<ArgValue>, OrchestrationError> {
    args.iter()
        .map(|arg| match arg {
            ArgDescriptor::Literal(value) => Ok(value.clone()),
            ArgDescriptor::Reference { component, .. } => {
                registry.get(component).map(ArgValue::Address)
            }
            ArgDescriptor::Param { param } => Err(OrchestrationError::UnresolvedDependency {
                name: format!("param:{param}"),
            }),
            ArgDescriptor::Context {
                context: RunContext::Sender,
            } => Ok(ArgValue::Address(sender)),
            ArgDescriptor::Encoded {
                method,
                contract,
                args,
            } => Ok(ArgValue::Call(EncodedCall {
                contract: contract.clone(),
                method: method.clone(),
                args: resolve_args(args, registry, sender)?,
            })),
        })
        .collect()
}

/// Decides whether a spec is deployed or attached, and records the outcome.
///
/// With a fixed address the spec is bound through [`ChainBackend::attach`] and no
/// transaction is sent. Otherwise its arguments are resolved and exactly one
/// [`ChainBackend::deploy_new`] call is made.
pub struct DeployOrAttachResolver<'a, B: ChainBackend> {
    backend: &'a B,
    network: &'a str,
}

impl<'a, B: ChainBackend> DeployOrAttachResolver<'a, B> {
    pub fn new(backend: &'a B, network: &'a str) -> Self {
        Self { backend, network }
    }

    pub async fn resolve(
        &self,
        spec: &ResourceSpec,
        registry: &mut AddressRegistry,
    ) -> Result<Resolution<B::Handle>, OrchestrationError> {
        if registry.is_resolved(&spec.name) {
            return Err(OrchestrationError::DuplicateComponent {
                name: spec.name.clone(),
            });
        }

        let contract = spec.contract_name();

        let resolution = match spec.address {
            Some(address) => {
                tracing::info!(
                    component = %spec.name,
                    contract = spec.interface_name(),
                    %address,
                    "Attaching to existing instance"
                );

                let handle = self.backend.attach(spec.interface_name(), address).await.map_err(|e| {
                    OrchestrationError::DeploymentFailed {
                        component: spec.name.clone(),
                        args: Vec::new(),
                        cause: e.into(),
                    }
                })?;

                Resolution {
                    component: self.component(spec, address, DeploymentMode::Attached, Vec::new()),
                    handle: Some(handle),
                }
            }
            None => {
                let args = resolve_args(&spec.args, registry, self.backend.sender())?;

                tracing::info!(
                    component = %spec.name,
                    contract,
                    args = ?args,
                    backend = B::BACKEND_NAME,
                    "Deploying new instance"
                );

                let address = self.backend.deploy_new(contract, &args).await.map_err(|e| {
                    OrchestrationError::DeploymentFailed {
                        component: spec.name.clone(),
                        args: args.clone(),
                        cause: e.into(),
                    }
                })?;

                Resolution {
                    component: self.component(spec, address, DeploymentMode::Deployed, args),
                    handle: None,
                }
            }
        };

        registry.set(&spec.name, resolution.component.address)?;

        Ok(resolution)
    }

    fn component(
        &self,
        spec: &ResourceSpec,
        address: Address,
        mode: DeploymentMode,
        args: Vec<ArgValue>,
    ) -> Component {
        Component {
            name: spec.name.clone(),
            contract: spec.contract_name().to_string(),
            network: self.network.to_string(),
            address,
            mode,
            args,
        }
    }
}
