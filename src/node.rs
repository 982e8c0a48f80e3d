//! Development node control
//!
//! Impersonation is a test-network capability exposed through node-specific
//! RPC methods (`hardhat_*` / `anvil_*`). `DevNode` is the seam the
//! impersonator and the ephemeral-network check talk to; `RpcDevNode`
//! implements it over any alloy Provider.

use crate::error::{HarnessError, Result};
use alloy::primitives::Address;
use alloy::providers::Provider;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Chain ids used by local development nodes
pub const DEV_CHAIN_IDS: [u64; 2] = [31337, 1337];

/// Client version fragments of nodes that support impersonation
const DEV_CLIENT_MARKERS: [&str; 2] = ["hardhat", "anvil"];

/// Flavor of development node, selects the impersonation RPC namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFlavor {
    Hardhat,
    Anvil,
}

impl NodeFlavor {
    pub fn impersonate_method(&self) -> &'static str {
        match self {
            NodeFlavor::Hardhat => "hardhat_impersonateAccount",
            NodeFlavor::Anvil => "anvil_impersonateAccount",
        }
    }

    pub fn stop_impersonating_method(&self) -> &'static str {
        match self {
            NodeFlavor::Hardhat => "hardhat_stopImpersonatingAccount",
            NodeFlavor::Anvil => "anvil_stopImpersonatingAccount",
        }
    }

    /// Infer flavor from a `web3_clientVersion` string
    pub fn detect(client_version: &str) -> Option<Self> {
        let lower = client_version.to_lowercase();
        if lower.contains("hardhat") {
            Some(NodeFlavor::Hardhat)
        } else if lower.contains("anvil") {
            Some(NodeFlavor::Anvil)
        } else {
            None
        }
    }
}

impl fmt::Display for NodeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeFlavor::Hardhat => write!(f, "hardhat"),
            NodeFlavor::Anvil => write!(f, "anvil"),
        }
    }
}

impl FromStr for NodeFlavor {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hardhat" => Ok(NodeFlavor::Hardhat),
            "anvil" => Ok(NodeFlavor::Anvil),
            other => Err(HarnessError::Config(format!(
                "unknown node flavor '{}' (expected hardhat or anvil)",
                other
            ))),
        }
    }
}

/// True when the node is a local/forked development network.
pub fn is_ephemeral(client_version: &str, chain_id: u64) -> bool {
    let lower = client_version.to_lowercase();
    DEV_CLIENT_MARKERS.iter().any(|m| lower.contains(m)) || DEV_CHAIN_IDS.contains(&chain_id)
}

/// Node-level control calls used by the harness
#[async_trait]
pub trait DevNode: Send + Sync {
    async fn client_version(&self) -> Result<String>;
    async fn chain_id(&self) -> Result<u64>;
    async fn impersonate(&self, account: Address) -> Result<()>;
    async fn stop_impersonating(&self, account: Address) -> Result<()>;
}

/// Abort unless the node is ephemeral. Must run before any impersonation.
pub async fn ensure_ephemeral<N: DevNode + ?Sized>(node: &N) -> Result<()> {
    let client_version = node.client_version().await?;
    let chain_id = node.chain_id().await?;

    if !is_ephemeral(&client_version, chain_id) {
        warn!(
            "🚨 Node '{}' (chain id {}) is not a local fork, refusing to impersonate accounts",
            client_version, chain_id
        );
        return Err(HarnessError::EnvironmentMisuse {
            client_version,
            chain_id,
        });
    }

    info!(
        "Ephemeral network confirmed: {} (chain id {}), all state is disposable",
        client_version, chain_id
    );
    Ok(())
}

/// `DevNode` over a JSON-RPC provider
pub struct RpcDevNode<P> {
    provider: P,
    flavor: NodeFlavor,
}

impl<P: Provider> RpcDevNode<P> {
    pub fn new(provider: P, flavor: NodeFlavor) -> Self {
        Self { provider, flavor }
    }

    /// Build a node handle, detecting the flavor from the client version when
    /// none is configured. A node whose flavor cannot be detected (Ganache,
    /// a plain dev-mode client) needs `NODE_FLAVOR` set explicitly.
    pub async fn connect(provider: P, flavor: Option<NodeFlavor>) -> Result<Self> {
        let flavor = match flavor {
            Some(f) => f,
            None => {
                let version = provider
                    .get_client_version()
                    .await
                    .map_err(|e| HarnessError::contract("web3_clientVersion", e))?;
                NodeFlavor::detect(&version).ok_or_else(|| {
                    warn!("Could not detect node flavor from '{}'", version);
                    HarnessError::Config(format!(
                        "node '{}' has no known impersonation RPC namespace; set NODE_FLAVOR",
                        version
                    ))
                })?
            }
        };
        debug!("Node flavor: {}", flavor);
        Ok(Self::new(provider, flavor))
    }

    pub fn flavor(&self) -> NodeFlavor {
        self.flavor
    }

    async fn control_call(&self, method: &'static str, account: Address) -> Result<()> {
        // hardhat answers `true`, anvil answers `null`
        let _: Value = self
            .provider
            .raw_request(method.into(), (account,))
            .await
            .map_err(|e| HarnessError::contract(method, e))?;
        Ok(())
    }
}

#[async_trait]
impl<P: Provider> DevNode for RpcDevNode<P> {
    async fn client_version(&self) -> Result<String> {
        self.provider
            .get_client_version()
            .await
            .map_err(|e| HarnessError::contract("web3_clientVersion", e))
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| HarnessError::contract("eth_chainId", e))
    }

    async fn impersonate(&self, account: Address) -> Result<()> {
        self.control_call(self.flavor.impersonate_method(), account).await
    }

    async fn stop_impersonating(&self, account: Address) -> Result<()> {
        self.control_call(self.flavor.stop_impersonating_method(), account)
            .await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingNode;
    use super::*;
    use crate::bindings::testing::{mocked, pending};

    #[test]
    fn test_detect_flavor() {
        assert_eq!(
            NodeFlavor::detect("HardhatNetwork/2.22.1/@ethereumjs/vm/7.0.0"),
            Some(NodeFlavor::Hardhat)
        );
        assert_eq!(NodeFlavor::detect("anvil/v0.2.0"), Some(NodeFlavor::Anvil));
        assert_eq!(NodeFlavor::detect("Geth/v1.13.14-stable/linux-amd64/go1.21.7"), None);
        assert_eq!(NodeFlavor::detect("Ganache/v7.9.1/EthereumJS TestRPC/v7.9.1/ethereum-js"), None);
    }

    #[test]
    fn test_rpc_method_names() {
        assert_eq!(NodeFlavor::Hardhat.impersonate_method(), "hardhat_impersonateAccount");
        assert_eq!(NodeFlavor::Anvil.stop_impersonating_method(), "anvil_stopImpersonatingAccount");
    }

    #[test]
    fn test_is_ephemeral() {
        assert!(is_ephemeral("HardhatNetwork/2.22.1", 31337));
        // anvil --fork-url keeps the forked chain id
        assert!(is_ephemeral("anvil/v0.2.0", 1));
        // Ganache is only accepted on a local chain id
        assert!(is_ephemeral("Ganache/v7.9.1/EthereumJS TestRPC", 1337));
        assert!(!is_ephemeral("Ganache/v7.9.1/EthereumJS TestRPC", 1));
        assert!(!is_ephemeral("Geth/v1.13.14-stable", 1));
        assert!(!is_ephemeral("erigon/2.59.0", 137));
    }

    #[tokio::test]
    async fn test_ensure_ephemeral_rejects_live_network() {
        let node = RecordingNode::with("Geth/v1.13.14-stable", 1);
        let err = ensure_ephemeral(&node).await.unwrap_err();
        assert!(matches!(err, HarnessError::EnvironmentMisuse { chain_id: 1, .. }));
        // Nothing beyond the two read-only calls was sent
        assert_eq!(node.calls(), vec!["web3_clientVersion", "eth_chainId"]);
    }

    #[tokio::test]
    async fn test_ensure_ephemeral_accepts_fork() {
        let node = RecordingNode::hardhat();
        assert!(ensure_ephemeral(&node).await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_detects_anvil() {
        let (provider, asserter) = mocked();
        asserter.push_success(&"anvil/v1.0.0");

        let node = RpcDevNode::connect(provider, None).await.unwrap();
        assert_eq!(node.flavor(), NodeFlavor::Anvil);
    }

    #[tokio::test]
    async fn test_connect_rejects_undetected_flavor() {
        let (provider, asserter) = mocked();
        asserter.push_success(&"Ganache/v7.9.1/EthereumJS TestRPC/v7.9.1/ethereum-js");

        let err = RpcDevNode::connect(provider, None).await.err().unwrap();
        assert!(matches!(err, HarnessError::Config(ref msg) if msg.contains("NODE_FLAVOR")), "{:?}", err);
    }

    #[tokio::test]
    async fn test_connect_honors_configured_flavor() {
        let (provider, asserter) = mocked();
        let node = RpcDevNode::connect(provider, Some(NodeFlavor::Hardhat)).await.unwrap();
        assert_eq!(node.flavor(), NodeFlavor::Hardhat);
        // Configured flavor skips web3_clientVersion
        assert_eq!(pending(&asserter), 0);
    }

    #[tokio::test]
    async fn test_impersonate_accepts_null_result() {
        let (provider, asserter) = mocked();
        // anvil answers impersonation requests with `null`
        asserter.push_success(&serde_json::Value::Null);
        let node = RpcDevNode::new(provider, NodeFlavor::Anvil);

        node.impersonate(Address::repeat_byte(0x72)).await.unwrap();
        assert_eq!(pending(&asserter), 0);
    }
}
