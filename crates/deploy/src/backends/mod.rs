//! [`ChainBackend`](crate::traits::ChainBackend) implementations.

mod artifacts;
mod dry_run;
mod rpc;

pub use artifacts::{Artifact, ArtifactStore, DEFAULT_ARTIFACTS_DIR};
pub use dry_run::{DEFAULT_DRY_RUN_SENDER, DryRunBackend};
pub use rpc::{
    BoundContract, DEFAULT_RECEIPT_POLL_INTERVAL, DEFAULT_RECEIPT_TIMEOUT, RpcBackend,
};
