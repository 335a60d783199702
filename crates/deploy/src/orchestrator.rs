//! Sequential execution of a deployment plan.

use std::collections::{BTreeMap, HashMap};

use alloy_core::primitives::Address;
use anyhow::Context;
use tokio::sync::watch;

use crate::{
    component::{Component, ComponentState, RunState},
    error::OrchestrationError,
    ordering::validate_plan,
    registry::AddressRegistry,
    resolver::{DeployOrAttachResolver, resolve_args},
    resource::{ArgValue, LinkCall, ResourceSpec},
    traits::{ChainBackend, ReportingSink},
};

/// Walks an ordered list of specs, resolving each one and running its link calls.
///
/// One orchestrator corresponds to one run: it owns the [`AddressRegistry`] for that
/// run. Spec `n + 1` is never started before spec `n` and all of its link calls have
/// finished. Failures abort the run without touching what was already resolved, and
/// nothing is retried.
pub struct DependencyOrchestrator<B: ChainBackend, S: ReportingSink> {
    backend: B,
    sink: S,
    network: String,
    registry: AddressRegistry,
    cancel: Option<watch::Receiver<bool>>,

    run_state: Option<RunState>,
    states: HashMap<String, ComponentState>,
    /// Artifact name per registry entry, used to bind link targets lazily.
    contracts: HashMap<String, String>,
    handles: HashMap<String, B::Handle>,
    components: Vec<Component>,
    children: BTreeMap<String, Address>,
    last_step: String,
}

impl<B: ChainBackend, S: ReportingSink> DependencyOrchestrator<B, S> {
    /// Create an orchestrator for `network`, starting from a (possibly seeded) registry.
    pub fn new(backend: B, sink: S, network: impl Into<String>, registry: AddressRegistry) -> Self {
        Self {
            backend,
            sink,
            network: network.into(),
            registry,
            cancel: None,
            run_state: None,
            states: HashMap::new(),
            contracts: HashMap::new(),
            handles: HashMap::new(),
            components: Vec::new(),
            children: BTreeMap::new(),
            last_step: "start".to_string(),
        }
    }

    /// Abort the run after the current step once `cancel` reads `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Execute `specs` in order.
    ///
    /// The plan is validated first; ordering and duplicate errors are returned before
    /// any backend call. On success every spec has been resolved exactly once. An
    /// orchestrator runs once: a second call fails with `AlreadyRan` and changes nothing.
    pub async fn run(&mut self, specs: &[ResourceSpec]) -> Result<Vec<Component>, OrchestrationError> {
        if let Some(state) = self.run_state {
            return Err(OrchestrationError::AlreadyRan { state });
        }

        self.run_state = Some(RunState::Running);
        self.states = specs
            .iter()
            .map(|spec| (spec.name.clone(), ComponentState::Pending))
            .collect();

        tracing::info!(
            network = %self.network,
            components = specs.len(),
            backend = B::BACKEND_NAME,
            "Starting orchestration run"
        );

        match self.run_inner(specs).await {
            Ok(()) => {
                self.run_state = Some(RunState::Completed);
                tracing::info!(
                    network = %self.network,
                    resolved = self.components.len(),
                    children = self.children.len(),
                    "Orchestration run completed"
                );
                self.sink.on_run_completed(&self.components);
                Ok(self.components.clone())
            }
            Err(err) => {
                self.run_state = Some(RunState::Aborted);
                tracing::error!(
                    network = %self.network,
                    error = %err,
                    resolved = self.components.len(),
                    "Orchestration run aborted"
                );
                self.sink.on_run_failed(&err);
                Err(err)
            }
        }
    }

    async fn run_inner(&mut self, specs: &[ResourceSpec]) -> Result<(), OrchestrationError> {
        validate_plan(specs, &self.registry)?;

        for spec in specs {
            self.check_cancelled()?;
            self.resolve_spec(spec).await?;

            for link in &spec.links {
                self.check_cancelled()?;
                self.execute_link(&spec.name, link).await?;
            }
        }

        Ok(())
    }

    async fn resolve_spec(&mut self, spec: &ResourceSpec) -> Result<(), OrchestrationError> {
        self.transition(&spec.name, ComponentState::Resolving);

        let resolver = DeployOrAttachResolver::new(&self.backend, &self.network);
        let resolution = match resolver.resolve(spec, &mut self.registry).await {
            Ok(resolution) => resolution,
            Err(err) => {
                self.transition(&spec.name, ComponentState::Failed);
                return Err(err);
            }
        };

        self.transition(&spec.name, ComponentState::Resolved);
        self.contracts
            .insert(spec.name.clone(), spec.interface_name().to_string());
        if let Some(handle) = resolution.handle {
            self.handles.insert(spec.name.clone(), handle);
        }

        let component = resolution.component;
        tracing::info!(
            component = %component.name,
            address = %component.address,
            mode = %component.mode,
            "Component resolved"
        );
        self.sink.on_component_resolved(&component);
        self.last_step = format!("resolving {}", component.name);
        self.components.push(component);

        Ok(())
    }

    async fn execute_link(&mut self, owner: &str, link: &LinkCall) -> Result<(), OrchestrationError> {
        let call = link.describe(owner);
        let sender = self.backend.sender();
        let args = resolve_args(&link.args, &self.registry, sender)?;

        let linking_failed = |cause: anyhow::Error, args: &[ArgValue]| OrchestrationError::LinkingFailed {
            component: owner.to_string(),
            call: call.clone(),
            args: args.to_vec(),
            cause: cause.into(),
        };

        let handle = self
            .handle_for(link.target_name(owner))
            .await
            .map_err(|e| linking_failed(e, &args))?;

        tracing::info!(component = owner, call = %call, args = ?args, "Executing link call");

        let receipt = self
            .backend
            .invoke(&handle, &link.method, &args)
            .await
            .map_err(|e| linking_failed(e, &args))?;

        tracing::debug!(component = owner, call = %call, tx_hash = ?receipt.tx_hash, "Link call mined");
        self.sink.on_link_executed(owner, &call, &receipt);
        self.last_step = call.clone();

        // The factory call above is the side effect; each child address is a separate
        // read that must succeed before the run continues.
        for query in &link.queries {
            let child_failed = |cause: anyhow::Error| OrchestrationError::ChildQueryFailed {
                component: owner.to_string(),
                call: call.clone(),
                child: query.name.clone(),
                cause: cause.into(),
            };

            let mut query_args = resolve_args(&query.args, &self.registry, sender)?;
            if let Some(length_getter) = &query.last_index_of {
                let length = self
                    .backend
                    .query_uint(&handle, length_getter, &[])
                    .await
                    .map_err(&child_failed)?;
                let last = length
                    .checked_sub(1)
                    .and_then(|index| i64::try_from(index).ok())
                    .ok_or_else(|| {
                        child_failed(anyhow::anyhow!(
                            "{length_getter} returned {length}, there is no last element"
                        ))
                    })?;
                query_args.push(ArgValue::Number(last));
            }

            let address = self
                .backend
                .query_address(&handle, &query.method, &query_args)
                .await
                .map_err(&child_failed)?;

            self.registry.set(&query.name, address)?;
            self.contracts
                .insert(query.name.clone(), query.contract_name().to_string());
            self.children.insert(query.name.clone(), address);

            tracing::info!(
                component = owner,
                child = %query.name,
                method = %query.method,
                %address,
                "Child component resolved"
            );
            self.sink.on_child_resolved(owner, &query.name, address);
        }

        Ok(())
    }

    /// Bound handle for a link target, attaching on first use.
    async fn handle_for(&mut self, name: &str) -> anyhow::Result<B::Handle> {
        if let Some(handle) = self.handles.get(name) {
            return Ok(handle.clone());
        }

        let address = self.registry.get(name)?;
        let contract = self
            .contracts
            .get(name)
            .map(String::as_str)
            .unwrap_or(name);

        let handle = self
            .backend
            .attach(contract, address)
            .await
            .with_context(|| format!("Failed to attach to {name} at {address}"))?;

        self.handles.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    fn transition(&mut self, name: &str, next: ComponentState) {
        let state = self
            .states
            .entry(name.to_string())
            .or_insert(ComponentState::Pending);
        debug_assert!(
            state.can_transition_to(next),
            "illegal transition for {name}: {state} -> {next}"
        );
        *state = next;
    }

    fn check_cancelled(&self) -> Result<(), OrchestrationError> {
        match &self.cancel {
            Some(cancel) if *cancel.borrow() => Err(OrchestrationError::Cancelled {
                after: self.last_step.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> AddressRegistry {
        self.registry
    }

    pub fn run_state(&self) -> Option<RunState> {
        self.run_state
    }

    pub fn component_state(&self, name: &str) -> Option<ComponentState> {
        self.states.get(name).copied()
    }

    /// Components resolved so far, in resolution order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Addresses produced by child queries.
    pub fn children(&self) -> &BTreeMap<String, Address> {
        &self.children
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
