//! Record of a run, written next to the other outputs for later inspection.
//!
//! The record is an output only. A later run never reads it back to skip work; resuming
//! is done by pinning the recorded addresses in the manifest.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    component::{Component, RunState},
    error::OrchestrationError,
    manifest::NetworkPlan,
};

/// Compute a SHA-256 hash of a plan bound to its network.
///
/// The plan is serialized to JSON first, so two manifests that produce the same specs
/// and network settings after parameter substitution hash identically.
pub fn plan_hash(plan: &NetworkPlan) -> Result<String> {
    let json = serde_json::to_string(plan).context("Failed to serialize plan for hashing")?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Path of the record for `network` and `plan` under `outdata`.
pub fn record_path(outdata: &Path, network: &str, plan: &str) -> PathBuf {
    outdata.join(format!("{network}-{plan}.json"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub network: String,
    pub plan: String,
    pub plan_hash: String,
    pub backend: String,
    pub status: RunState,
    /// RFC 3339 start time.
    pub started_at: String,
    pub finished_at: String,
    pub components: Vec<Component>,
    #[serde(default)]
    pub children: BTreeMap<String, Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub chainwright_version: String,
}

impl DeploymentRecord {
    /// Start a record. `finished_at` and `status` are filled in by [`DeploymentRecord::finish`].
    pub fn start(network: &str, plan: &str, plan_hash: String, backend: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            network: network.to_string(),
            plan: plan.to_string(),
            plan_hash,
            backend: backend.to_string(),
            status: RunState::Running,
            started_at: now.clone(),
            finished_at: now,
            components: Vec::new(),
            children: BTreeMap::new(),
            error: None,
            chainwright_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Fill in the outcome of the run. On failure the components resolved before the
    /// failing step are still recorded.
    pub fn finish(
        mut self,
        components: &[Component],
        children: &BTreeMap<String, Address>,
        outcome: Result<(), &OrchestrationError>,
    ) -> Self {
        self.finished_at = chrono::Utc::now().to_rfc3339();
        self.components = components.to_vec();
        self.children = children.clone();
        match outcome {
            Ok(()) => self.status = RunState::Completed,
            Err(err) => {
                self.status = RunState::Aborted;
                self.error = Some(err.chain());
            }
        }
        self
    }

    /// Save this record as formatted JSON, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment record")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;

        tracing::info!(path = %path.display(), "Deployment record written");
        Ok(())
    }

    /// Load a record from a file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment record does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment record from {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse deployment record JSON")
    }
}

/// Error message followed by its causes, `: `-separated.
