//! chainwright-deploy - Ordered deployment of interdependent on-chain components.
//!
//! A deployment plan is an ordered list of [`ResourceSpec`]s. Each spec is either
//! deployed (one creation transaction with arguments taken from earlier components) or
//! attached at a known address, then followed by its link calls, which may register
//! child components created on-chain. The [`DependencyOrchestrator`] walks the plan one
//! step at a time against a [`ChainBackend`] and reports to a [`ReportingSink`].

mod component;
pub use component::{Component, ComponentState, DeploymentMode, RunState};

mod error;
pub use error::{BoxError, OrchestrationError, OrderingViolation};

mod resource;
pub use resource::{
    ArgDescriptor, ArgValue, ChildQuery, ComponentField, DeploymentPlan, EncodedCall, LinkCall,
    ResourceSpec, RunContext,
};

mod registry;
pub use registry::AddressRegistry;

mod resolver;
pub use resolver::{DeployOrAttachResolver, Resolution, resolve_args};

mod ordering;
pub use ordering::validate_plan;

mod orchestrator;
pub use orchestrator::DependencyOrchestrator;

mod manifest;
pub use manifest::{DEFAULT_VERIFY_COMMAND, MANIFEST_FILENAME, Manifest, NetworkConfig, NetworkPlan};

mod record;
pub use record::{DeploymentRecord, plan_hash, record_path};

mod reporting;
pub use reporting::{TracingSink, summary_table, verify_command};

pub mod backends;
pub mod rpc;
pub mod traits;

pub use traits::{CallReceipt, ChainBackend, NullSink, ReportingSink};
