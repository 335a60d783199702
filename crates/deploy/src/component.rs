//! Resolved components and lifecycle states.

use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::resource::ArgValue;

/// How a component obtained its address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeploymentMode {
    /// A new instance was created by a deployment transaction.
    Deployed,
    /// An existing instance was bound to without any transaction.
    Attached,
}

/// A component after resolution. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    /// Artifact the instance was deployed from or attached as.
    pub contract: String,
    pub network: String,
    pub address: Address,
    pub mode: DeploymentMode,
    /// Constructor arguments after resolution. Empty in attach mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgValue>,
}

/// Per-component lifecycle: `pending -> resolving -> {resolved | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComponentState {
    Pending,
    Resolving,
    Resolved,
    Failed,
}

impl ComponentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: ComponentState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Resolving)
                | (Self::Resolving, Self::Resolved)
                | (Self::Resolving, Self::Failed)
        )
    }
}

/// Per-run lifecycle: `running -> {completed | aborted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunState {
    Running,
    Completed,
    Aborted,
}
