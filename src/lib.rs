//! Forked-network arbitrage verification harness
//!
//! Impersonates a high-balance account on a local fork, dumps tokens into a
//! V2 pool to push its price away from equilibrium, measures the price
//! before and after from raw reserves, and checks that an external
//! arbitrage contract profits from the resulting spread.

pub mod arbitrage;
pub mod bindings;
pub mod config;
pub mod contracts;
pub mod error;
pub mod harness;
pub mod impersonation;
pub mod node;
pub mod oracle;
pub mod swap;
pub mod tx;
pub mod types;
pub mod units;

// Re-export commonly used types
pub use config::{
    load_config, load_config_from, load_config_from_file, HarnessConfig, ScenarioConfig, ScenarioOverrides,
};
pub use error::{HarnessError, Result};
pub use harness::{ArbitrageVerificationHarness, ManipulationReport, VerificationReport};
pub use impersonation::{AccountImpersonator, ImpersonationSession};
pub use node::{DevNode, NodeFlavor, RpcDevNode};
pub use oracle::{PairPriceOracle, PriceRatio};
pub use swap::{SwapExecutor, SwapOrder, SwapReceipt};
pub use types::{DexAddresses, Exchange, TokenPair};
