// Path: crates/node/src/config.rs
//! TOML configuration for the node binary.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use warden_types::policy::{LegacyPolicy, RulesDocument};
use warden_types::signer::Signer;

/// Top-level node configuration.
#[derive(Debug, Deserialize)]
pub struct NodeConfig {
    /// Address the REST gateway listens on. Put auth guards and TLS in
    /// front before exposing this beyond localhost.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to the native GMP signing helper. When unset, every session
    /// runs on the in-process WASM-compatible backend.
    #[serde(default)]
    pub native_signer_helper: Option<PathBuf>,

    /// Configured chains.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,

    /// Registered signers.
    #[serde(default)]
    pub signers: Vec<Signer>,

    /// Per-signer policy documents.
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8540".to_string()
}

/// One EVM chain endpoint.
#[derive(Debug, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
}

/// Policy attachment for one signer.
#[derive(Debug, Deserialize)]
pub struct PolicyConfig {
    /// The signer the policies apply to.
    pub signer_id: String,
    /// Rules document (preferred).
    #[serde(default)]
    pub rules: Option<RulesDocument>,
    /// Legacy policy list, used only without a rules document.
    #[serde(default)]
    pub legacy: Vec<LegacyPolicy>,
}

impl NodeConfig {
    /// Loads and parses the TOML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
        let config: NodeConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::signer::SignerStatus;

    #[test]
    fn parses_a_full_config() {
        let raw = r#"
            listen_addr = "127.0.0.1:9000"

            [[chains]]
            chain_id = 11155111
            rpc_url = "http://localhost:8545"

            [[signers]]
            id = "signer-1"
            eth_address = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
            owner_address = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
            status = "active"
            share_path = "/var/lib/warden/shares/signer-1.json"
            scheme = "cggmp24"

            [[policies]]
            signer_id = "signer-1"
            [policies.rules]
            policy_id = "default"
            defaults = "deny_all"
            rules = []
        "#;

        let config: NodeConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.chains[0].chain_id, 11155111);
        assert_eq!(config.signers[0].status, SignerStatus::Active);
        assert!(config.policies[0].rules.is_some());
        assert!(config.native_signer_helper.is_none());
    }
}
