//! Compiled contract artifacts on disk.
//!
//! Both Hardhat (`artifacts/contracts/Foo.sol/Foo.json`, `"bytecode": "0x..."`) and
//! Foundry (`out/Foo.sol/Foo.json`, `"bytecode": { "object": "0x..." }`) layouts are
//! understood. Artifacts are indexed by file stem, so the contract name in a plan is
//! the artifact's file name.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy_core::{json_abi::JsonAbi, primitives::Bytes};
use anyhow::{Context, Result};
use serde::Deserialize;
use walkdir::WalkDir;

/// Default artifacts directory, relative to the working directory.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// ABI and creation bytecode of one contract.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub abi: Arc<JsonAbi>,
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
struct RawArtifact {
    abi: JsonAbi,
    #[serde(default)]
    bytecode: Option<RawBytecode>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(Bytes),
    Object { object: Bytes },
}

impl RawBytecode {
    fn into_bytes(self) -> Bytes {
        match self {
            Self::Hex(bytes) | Self::Object { object: bytes } => bytes,
        }
    }
}

/// Index of artifact files under a root directory.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    root: PathBuf,
    index: BTreeMap<String, PathBuf>,
}

impl ArtifactStore {
    /// Scan `root` recursively for artifact JSON files.
    ///
    /// Debug sidecars (`*.dbg.json`) and build-info files are skipped. When two files
    /// share a stem the first one in walk order wins and the other is logged.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            anyhow::bail!("Artifacts directory not found: {}", root.display());
        }

        let mut index: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.into_path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(".json") || file_name.ends_with(".dbg.json") {
                continue;
            }
            if path.components().any(|c| c.as_os_str() == "build-info") {
                continue;
            }

            let name = file_name.trim_end_matches(".json").to_string();
            if let Some(existing) = index.get(&name) {
                tracing::debug!(
                    contract = %name,
                    kept = %existing.display(),
                    skipped = %path.display(),
                    "Duplicate artifact name"
                );
                continue;
            }
            index.insert(name, path);
        }

        tracing::debug!(root = %root.display(), artifacts = index.len(), "Artifacts indexed");

        Ok(Self {
            root: root.to_path_buf(),
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, contract: &str) -> bool {
        self.index.contains_key(contract)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Read and parse the artifact for `contract`.
    pub fn load(&self, contract: &str) -> Result<Artifact> {
        let path = self.index.get(contract).with_context(|| {
            format!(
                "No artifact named '{}' under {}",
                contract,
                self.root.display()
            )
        })?;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let raw: RawArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        Ok(Artifact {
            name: contract.to_string(),
            abi: Arc::new(raw.abi),
            bytecode: raw.bytecode.map(RawBytecode::into_bytes).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    const CONFIG_ARTIFACT: &str = r#"{
        "contractName": "Config",
        "abi": [
            {
                "type": "function",
                "name": "setPriceOracle",
                "inputs": [{ "name": "oracle", "type": "address" }],
                "outputs": [],
                "stateMutability": "nonpayable"
            }
        ],
        "bytecode": "0x6080604052"
    }"#;

    const ROUTER_ARTIFACT: &str = r#"{
        "abi": [
            {
                "type": "constructor",
                "inputs": [
                    { "name": "config", "type": "address" },
                    { "name": "factory", "type": "address" }
                ],
                "stateMutability": "nonpayable"
            }
        ],
        "bytecode": { "object": "0x60806040" }
    }"#;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_indexes_hardhat_and_foundry_layouts() {
        let temp_dir = TempDir::new("chainwright-artifacts").expect("Failed to create temp dir");
        write(temp_dir.path(), "contracts/Config.sol/Config.json", CONFIG_ARTIFACT);
        write(temp_dir.path(), "contracts/Config.sol/Config.dbg.json", "{}");
        write(temp_dir.path(), "build-info/abc123.json", "{}");
        write(temp_dir.path(), "out/Router.sol/Router.json", ROUTER_ARTIFACT);

        let store = ArtifactStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("Config"));
        assert!(!store.contains("Config.dbg"));

        let config = store.load("Config").unwrap();
        assert_eq!(config.bytecode.to_vec(), vec![0x60u8, 0x80, 0x60, 0x40, 0x52]);
        assert!(config.abi.function("setPriceOracle").is_some());

        let router = store.load("Router").unwrap();
        assert_eq!(router.bytecode.len(), 4);
        assert_eq!(router.abi.constructor().unwrap().inputs.len(), 2);
    }

    #[test]
    fn test_missing_artifact_and_root() {
        let temp_dir = TempDir::new("chainwright-artifacts").expect("Failed to create temp dir");
        let store = ArtifactStore::open(temp_dir.path()).unwrap();
        assert!(store.is_empty());
        assert!(store.load("Config").is_err());

        assert!(ArtifactStore::open(temp_dir.path().join("missing")).is_err());
    }
}
