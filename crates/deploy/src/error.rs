//! Error taxonomy for an orchestration run.

use crate::{component::RunState, resource::ArgValue};

/// Boxed collaborator failure (RPC transport, revert, missing artifact, ...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a reference was rejected by the ordering check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OrderingViolation {
    /// The referenced name is declared, but later in the plan.
    Forward,
    /// A component references its own address before it exists.
    SelfReference,
    /// The referenced name is neither declared in the plan nor seeded.
    Unknown,
}

/// Errors surfaced by the registry, the resolver and the orchestrator.
///
/// `InvalidOrdering` and `DuplicateComponent` are raised by the validation pass before
/// any transaction is sent. The remaining failures abort the run but keep whatever was
/// already resolved in the registry.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("component '{name}' has not been resolved")]
    UnresolvedDependency { name: String },

    #[error("component '{name}' is declared or resolved more than once")]
    DuplicateComponent { name: String },

    #[error("'{component}' references '{reference}' ({violation})")]
    InvalidOrdering {
        component: String,
        reference: String,
        violation: OrderingViolation,
    },

    #[error("failed to deploy '{component}' with args [{}]", display_args(.args))]
    DeploymentFailed {
        component: String,
        args: Vec<ArgValue>,
        #[source]
        cause: BoxError,
    },

    #[error("link call {call} on '{component}' failed with args [{}]", display_args(.args))]
    LinkingFailed {
        component: String,
        call: String,
        args: Vec<ArgValue>,
        #[source]
        cause: BoxError,
    },

    #[error("query for '{child}' after {call} on '{component}' failed")]
    ChildQueryFailed {
        component: String,
        call: String,
        child: String,
        #[source]
        cause: BoxError,
    },

    #[error("run cancelled after {after}")]
    Cancelled { after: String },

    #[error("orchestrator already ran (run is {state})")]
    AlreadyRan { state: RunState },
}

impl OrchestrationError {
    /// Name of the component the error is attributed to, if any.
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::UnresolvedDependency { name } | Self::DuplicateComponent { name } => Some(name),
            Self::InvalidOrdering { component, .. }
            | Self::DeploymentFailed { component, .. }
            | Self::LinkingFailed { component, .. }
            | Self::ChildQueryFailed { component, .. } => Some(component),
            Self::Cancelled { .. } | Self::AlreadyRan { .. } => None,
        }
    }

    /// The message followed by every underlying cause, joined with `": "`.
    pub fn chain(&self) -> String {
        use std::error::Error;

        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }

    /// Whether the error was raised before any on-chain side effect of the failing run.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidOrdering { .. } | Self::DuplicateComponent { .. } | Self::AlreadyRan { .. }
        )
    }
}

fn display_args(args: &[ArgValue]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
