//! TOML configuration of the networks the deployer can target.
//!
//! Secrets are never part of the file. The file names the environment
//! variables holding the mnemonic and explorer API keys instead.

use {
    anyhow::{Context, Result, anyhow},
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
        time::Duration,
    },
    url::Url,
};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Directory holding one registry file per network.
    #[serde(default = "default_deployments_dir")]
    pub deployments_dir: PathBuf,

    /// Number of blocks a deployment needs on top of it before the contract
    /// is submitted for verification.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    #[serde(default)]
    pub networks: BTreeMap<String, Network>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Network {
    /// JSON RPC endpoint of a node.
    pub url: Url,

    /// Expected chain id. The deployer refuses to run against a node
    /// reporting a different one.
    pub chain_id: Option<u64>,

    /// Environment variable holding the BIP-39 mnemonic of the deployment
    /// accounts. Without it no transactions can be signed.
    pub mnemonic_env: Option<String>,

    /// Number of accounts derived from the mnemonic.
    #[serde(default = "default_accounts")]
    pub accounts: u32,

    /// Which derived account deploys contracts.
    #[serde(default)]
    pub account_index: usize,

    pub explorer: Option<Explorer>,
}

/// Etherscan compatible block explorer used for source verification.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Explorer {
    pub api_url: Url,

    /// Environment variable holding the explorer API key.
    pub api_key_env: String,

    /// Delay between verification status checks.
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// How many times the verification status is checked before giving up.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_deployments_dir() -> PathBuf {
    "deployments".into()
}

fn default_confirmations() -> u64 {
    5
}

fn default_accounts() -> u32 {
    10
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_polls() -> u32 {
    12
}

impl Configuration {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
        match Self::from_toml(&data) {
            Ok(self_) => Ok(self_),
            Err(err) if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") => Err(anyhow!(
                "failed to parse TOML config at {}: {err:#?}",
                path.as_ref().display()
            )),
            Err(_) => Err(anyhow!(
                "failed to parse TOML config at: {}. Set TOML_TRACE_ERROR=1 to print parsing \
                 error but this may leak secrets.",
                path.as_ref().display()
            )),
        }
    }

    pub fn from_toml(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    pub fn network(&self, name: &str) -> Result<&Network> {
        self.networks.get(name).with_context(|| {
            format!(
                "network {name:?} is not configured, known networks: {:?}",
                self.networks.keys().collect::<Vec<_>>()
            )
        })
    }
}

impl Network {
    /// Reads the mnemonic from the configured environment variable.
    ///
    /// `Ok(None)` means the network has no signing accounts configured.
    pub fn mnemonic(&self) -> Result<Option<String>> {
        let Some(var) = &self.mnemonic_env else {
            return Ok(None);
        };
        let phrase = std::env::var(var)
            .with_context(|| format!("environment variable {var} is not set"))?;
        if phrase.trim().is_empty() {
            return Err(anyhow!("environment variable {var} is empty"));
        }
        Ok(Some(phrase))
    }
}

impl Explorer {
    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}
