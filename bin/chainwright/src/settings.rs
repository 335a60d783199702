//! Run settings layered from defaults, the manifest, the environment and the CLI.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use chainwright_deploy::{
    Manifest,
    backends::{DEFAULT_ARTIFACTS_DIR, DEFAULT_RECEIPT_TIMEOUT},
};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Cli;

/// Default directory for deployment records.
pub const DEFAULT_OUTDATA_DIR: &str = "deployments";

/// Prefix of environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "CHAINWRIGHT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub artifacts: PathBuf,
    pub outdata: PathBuf,
    /// Seconds to wait for a receipt.
    pub receipt_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            outdata: PathBuf::from(DEFAULT_OUTDATA_DIR),
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT.as_secs(),
            rpc_url: None,
            from: None,
        }
    }
}

/// Values given on the command line. Unset flags do not override lower layers.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outdata: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rpc_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<Address>,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            artifacts: cli.artifacts.clone(),
            outdata: cli.outdata.clone(),
            receipt_timeout: cli.receipt_timeout,
            rpc_url: cli.rpc_url.clone(),
            from: cli.from,
        }
    }
}

impl Settings {
    /// Merge, lowest priority first: defaults, the manifest's `[settings]` table,
    /// `CHAINWRIGHT_*` environment variables, then command-line flags.
    pub fn load(manifest: &Path, cli: &Cli) -> Result<Self> {
        Self::figment(manifest, CliOverrides::from(cli))
            .extract()
            .context("Failed to load settings")
    }

    fn figment(manifest: &Path, overrides: CliOverrides) -> Figment {
        let manifest_settings =
            Figment::from(Toml::file(Manifest::resolve_path(manifest))).focus("settings");

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(manifest_settings)
            .merge(Env::prefixed(ENV_PREFIX).only(&[
                "artifacts",
                "outdata",
                "receipt_timeout",
                "rpc_url",
                "from",
            ]))
            .merge(Serialized::defaults(overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layering() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "Chainwright.toml",
                r#"
                [settings]
                artifacts = "out"
                outdata = "records"

                [networks.local]
            "#,
            )?;
            jail.set_env("CHAINWRIGHT_OUTDATA", "env-records");
            jail.set_env("CHAINWRIGHT_RECEIPT_TIMEOUT", "30");

            let overrides = CliOverrides {
                receipt_timeout: Some(5),
                ..Default::default()
            };
            let settings: Settings = Settings::figment(Path::new("."), overrides).extract()?;

            assert_eq!(settings.artifacts, PathBuf::from("out"));
            assert_eq!(settings.outdata, PathBuf::from("env-records"));
            assert_eq!(settings.receipt_timeout, 5);
            assert_eq!(settings.rpc_url, None);
            Ok(())
        });
    }

    #[test]
    fn test_defaults_without_manifest_settings() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("Chainwright.toml", "[networks.local]\n")?;

            let settings: Settings =
                Settings::figment(Path::new("."), CliOverrides::default()).extract()?;
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }
}
