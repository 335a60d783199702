//! Per-network deployment manifest.
//!
//! A manifest holds the ordered plans (one per flow, e.g. a fresh deploy and a proxy
//! upgrade) and, per network, the pinned addresses and literal parameters those plans
//! refer to. It is the data form of what would otherwise be hardcoded constants in a
//! deploy script.
//!
//! ```toml
//! [networks.arbitrum-rinkeby]
//! rpc_url = "http://127.0.0.1:8545"
//! [networks.arbitrum-rinkeby.pinned]
//! PriceOracle = "0x15C20c6c673c3B2244b465FC7736eAA0E8bd6DF6"
//! [networks.arbitrum-rinkeby.params]
//! weth = "0x655e2b2244934Aea3457E3C56a7438C271778D44"
//!
//! [[plans.core]]
//! name = "Config"
//! [[plans.core.link]]
//! method = "setPriceOracle"
//! args = [{ ref = "PriceOracle" }]
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    registry::AddressRegistry,
    resource::{ArgDescriptor, ArgValue, DeploymentPlan, ResourceSpec},
};

/// The default name for the manifest file when a directory is given.
pub const MANIFEST_FILENAME: &str = "Chainwright.toml";

/// Verification command prefix printed for deployed components.
pub const DEFAULT_VERIFY_COMMAND: &str = "npx hardhat verify --network";

/// Settings for one target network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of a node holding an unlocked sender account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// Sender for deployments and link calls. Defaults to the node's first account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_command: Option<String>,
    /// Known addresses seeded into the registry before the run.
    #[serde(default)]
    pub pinned: BTreeMap<String, Address>,
    /// Literal values substituted for `{ param = "..." }` arguments.
    #[serde(default)]
    pub params: BTreeMap<String, ArgValue>,
}

impl NetworkConfig {
    pub fn verify_command(&self) -> &str {
        self.verify_command
            .as_deref()
            .unwrap_or(DEFAULT_VERIFY_COMMAND)
    }
}

/// Top-level manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    pub plans: BTreeMap<String, Vec<ResourceSpec>>,
}

impl Manifest {
    /// Load a manifest from a TOML file, or from `Chainwright.toml` inside a directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Manifest file or directory not found: {}", path.display());
        }

        let manifest_path = Self::resolve_path(path);
        let content = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read manifest from {}", manifest_path.display()))?;
        let manifest = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", manifest_path.display()))?;

        tracing::info!(
            path = %manifest_path.display(),
            networks = manifest.networks.len(),
            plans = manifest.plans.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// The manifest file for `path`: the path itself, or `Chainwright.toml` inside it.
    pub fn resolve_path(path: &Path) -> PathBuf {
        if path.is_dir() {
            path.join(MANIFEST_FILENAME)
        } else {
            path.to_path_buf()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse manifest as TOML")
    }

    /// Select a plan for a network and substitute its parameters.
    pub fn plan_for(&self, plan: &str, network: &str) -> Result<NetworkPlan> {
        let specs = self.plans.get(plan).with_context(|| {
            format!(
                "Unknown plan '{}' (available: {})",
                plan,
                self.plans.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })?;
        let config = self.networks.get(network).with_context(|| {
            format!(
                "Unknown network '{}' (available: {})",
                network,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })?;

        let specs = specs
            .iter()
            .map(|spec| substitute_spec(spec, &config.params, network))
            .collect::<Result<DeploymentPlan>>()?;

        Ok(NetworkPlan {
            plan: plan.to_string(),
            network: network.to_string(),
            config: config.clone(),
            specs,
        })
    }
}

/// A plan bound to one network, with every parameter substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlan {
    pub plan: String,
    pub network: String,
    pub config: NetworkConfig,
    pub specs: DeploymentPlan,
}

impl NetworkPlan {
    /// Registry seeded with the network's pinned addresses.
    pub fn seeded_registry(&self) -> Result<AddressRegistry> {
        AddressRegistry::with_seeds(
            self.config
                .pinned
                .iter()
                .map(|(name, address)| (name.clone(), *address)),
        )
        .context("Failed to seed pinned addresses")
    }
}

fn substitute_spec(
    spec: &ResourceSpec,
    params: &BTreeMap<String, ArgValue>,
    network: &str,
) -> Result<ResourceSpec> {
    let subst = |args: &[ArgDescriptor]| substitute_args(args, params, &spec.name, network);

    let mut substituted = spec.clone();
    substituted.args = subst(&spec.args)?;
    for link in &mut substituted.links {
        link.args = subst(&link.args)?;
        for query in &mut link.queries {
            query.args = subst(&query.args)?;
        }
    }
    Ok(substituted)
}

fn substitute_args(
    args: &[ArgDescriptor],
    params: &BTreeMap<String, ArgValue>,
    component: &str,
    network: &str,
) -> Result<Vec<ArgDescriptor>> {
    args.iter()
        .map(|arg| match arg {
            ArgDescriptor::Param { param } => params
                .get(param)
                .cloned()
                .map(ArgDescriptor::Literal)
                .with_context(|| {
                    format!(
                        "Parameter '{}' used by '{}' is not defined for network '{}'",
                        param, component, network
                    )
                }),
            ArgDescriptor::Encoded {
                method,
                contract,
                args,
            } => Ok(ArgDescriptor::Encoded {
                method: method.clone(),
                contract: contract.clone(),
                args: substitute_args(args, params, component, network)?,
            }),
            other => Ok(other.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::address;
    use tempdir::TempDir;

    const MANIFEST: &str = r#"
        [networks.testnet]
        rpc_url = "http://127.0.0.1:8545"

        [networks.testnet.pinned]
        PriceOracle = "0x15C20c6c673c3B2244b465FC7736eAA0E8bd6DF6"

        [networks.testnet.params]
        weth = "0x655e2b2244934Aea3457E3C56a7438C271778D44"
        maxPayout = 100000000
        vestingTerm = 129600

        [networks.bare]

        [[plans.core]]
        name = "Config"
        [[plans.core.link]]
        method = "setPriceOracle"
        args = [{ ref = "PriceOracle" }]

        [[plans.core]]
        name = "BondPoolFactory"
        args = [{ ref = "Config" }, { param = "maxPayout" }, { param = "weth" }]

        [[plans.proxied]]
        name = "StakingPoolFactory"
        contract = "TransparentUpgradeableProxy"
        interface = "StakingPoolFactory"
        args = [
            { ref = "PriceOracle" },
            { encode = "initialize", contract = "StakingPoolFactory", args = [{ param = "vestingTerm" }, { context = "sender" }] },
        ]
    "#;

    #[test]
    fn test_plan_for_substitutes_params() {
        let manifest = Manifest::from_toml_str(MANIFEST).unwrap();
        let plan = manifest.plan_for("core", "testnet").unwrap();

        assert_eq!(plan.specs.len(), 2);
        assert_eq!(
            plan.specs[1].args,
            vec![
                ArgDescriptor::reference("Config"),
                ArgDescriptor::literal(100000000i64),
                ArgDescriptor::literal(address!("655e2b2244934Aea3457E3C56a7438C271778D44")),
            ]
        );
        assert_eq!(plan.config.verify_command(), DEFAULT_VERIFY_COMMAND);

        let registry = plan.seeded_registry().unwrap();
        assert_eq!(
            registry.get("PriceOracle").unwrap(),
            address!("15C20c6c673c3B2244b465FC7736eAA0E8bd6DF6")
        );
    }

    #[test]
    fn test_params_inside_encoded_calls_are_substituted() {
        let manifest = Manifest::from_toml_str(MANIFEST).unwrap();
        let plan = manifest.plan_for("proxied", "testnet").unwrap();

        assert_eq!(
            plan.specs[0].args[1],
            ArgDescriptor::encoded(
                "StakingPoolFactory",
                "initialize",
                vec![ArgDescriptor::literal(129600i64), ArgDescriptor::sender()],
            )
        );

        let err = manifest.plan_for("proxied", "bare").unwrap_err();
        assert!(err.to_string().contains("'vestingTerm'"), "unexpected error: {err}");
    }

    #[test]
    fn test_missing_param_is_reported() {
        let manifest = Manifest::from_toml_str(MANIFEST).unwrap();
        let err = manifest.plan_for("core", "bare").unwrap_err();
        assert!(
            err.to_string().contains("'maxPayout'"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unknown_plan_and_network() {
        let manifest = Manifest::from_toml_str(MANIFEST).unwrap();
        assert!(manifest.plan_for("upgrade", "testnet").is_err());
        assert!(manifest.plan_for("core", "mainnet").is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = TempDir::new("chainwright-test").expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join(MANIFEST_FILENAME), MANIFEST).unwrap();

        let manifest = Manifest::load_from_file(temp_dir.path()).unwrap();
        assert!(manifest.networks.contains_key("testnet"));
        assert!(Manifest::load_from_file(&temp_dir.path().join("missing.toml")).is_err());
    }
}
