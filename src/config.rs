//! Configuration management
//! Load settings from a .env file, with scenario knobs optionally
//! overridden by a TOML file.

use crate::node::NodeFlavor;
use crate::swap::DEFAULT_GAS_LIMIT;
use crate::types::{DexAddresses, Exchange};
use alloy::primitives::Address;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Whale dump size (whole tokens)
pub const DEFAULT_DUMP_AMOUNT: &str = "3000000000000";
/// Minimum arbitrage profit (whole quote tokens)
pub const DEFAULT_MIN_PROFIT: &str = "0.001";
pub const DEFAULT_FLASH_DIVISOR: u64 = 3;

/// Tunable parameters of the manipulation / verification scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioConfig {
    /// Whole base tokens to dump into the pool
    pub dump_amount: String,
    /// Exchange whose pool gets manipulated
    pub manipulate_on: Exchange,
    pub gas_limit: u64,
    /// Whole quote tokens the arbitrage must net
    pub min_profit: String,
    /// Flash amount = dump amount / divisor, unless `flash_amount` is set
    pub flash_divisor: u64,
    /// Explicit flash amount in smallest quote units
    pub flash_amount: Option<String>,
    /// None = start on the manipulated exchange
    pub start_on_exchange_a: Option<bool>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            dump_amount: DEFAULT_DUMP_AMOUNT.to_string(),
            manipulate_on: Exchange::Uniswap,
            gas_limit: DEFAULT_GAS_LIMIT,
            min_profit: DEFAULT_MIN_PROFIT.to_string(),
            flash_divisor: DEFAULT_FLASH_DIVISOR,
            flash_amount: None,
            start_on_exchange_a: None,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.flash_divisor == 0 {
            return Err(anyhow!("flash_divisor must be greater than zero"));
        }
        if self.gas_limit == 0 {
            return Err(anyhow!("gas_limit must be greater than zero"));
        }
        Ok(())
    }
}

/// Scenario keys set in a TOML file. Keys the file omits keep the value
/// already loaded from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScenarioOverrides {
    pub dump_amount: Option<String>,
    pub manipulate_on: Option<Exchange>,
    pub gas_limit: Option<u64>,
    pub min_profit: Option<String>,
    pub flash_divisor: Option<u64>,
    pub flash_amount: Option<String>,
    pub start_on_exchange_a: Option<bool>,
}

impl ScenarioOverrides {
    /// Load scenario overrides from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read scenario file: {}", path.as_ref().display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML scenario")
    }

    /// Overlay the keys present in the file onto `scenario`
    pub fn apply_to(self, scenario: &mut ScenarioConfig) -> Result<()> {
        if let Some(v) = self.dump_amount {
            scenario.dump_amount = v;
        }
        if let Some(v) = self.manipulate_on {
            scenario.manipulate_on = v;
        }
        if let Some(v) = self.gas_limit {
            scenario.gas_limit = v;
        }
        if let Some(v) = self.min_profit {
            scenario.min_profit = v;
        }
        if let Some(v) = self.flash_divisor {
            scenario.flash_divisor = v;
        }
        if self.flash_amount.is_some() {
            scenario.flash_amount = self.flash_amount;
        }
        if self.start_on_exchange_a.is_some() {
            scenario.start_on_exchange_a = self.start_on_exchange_a;
        }
        scenario.validate()
    }
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    // Network
    pub rpc_url: String,
    /// None = detect from web3_clientVersion
    pub node_flavor: Option<NodeFlavor>,

    // DEX addresses
    pub uniswap: DexAddresses,
    pub sushiswap: DexAddresses,

    // Tokens
    /// Token dumped to move the price (ARB_AGAINST, e.g. SHIB)
    pub base_token: Address,
    /// Token received and profited in (ARB_FOR, e.g. WETH)
    pub quote_token: Address,

    /// High-balance account impersonated for the dump
    pub whale: Address,

    // Arbitrage contract (verification only)
    pub arbitrage_contract: Option<Address>,
    /// Account calling executeTrade; defaults to the node's first unlocked account
    pub arbitrage_caller: Option<Address>,

    pub scenario: ScenarioConfig,
}

impl HarnessConfig {
    pub fn dex(&self, exchange: Exchange) -> DexAddresses {
        match exchange {
            Exchange::Uniswap => self.uniswap,
            Exchange::Sushiswap => self.sushiswap,
        }
    }
}

/// Load configuration from `.env` in the working directory plus the process environment
pub fn load_config() -> Result<HarnessConfig> {
    load_config_from(None)
}

/// Load configuration from an explicit env file plus the process environment
pub fn load_config_from_file(path: &str) -> Result<HarnessConfig> {
    load_config_from(Some(path))
}

/// Load configuration, reading `env_file` first when given.
///
/// A missing `.env` in the working directory is fine (every key may already
/// be exported); an explicitly named file must exist.
pub fn load_config_from(env_file: Option<&str>) -> Result<HarnessConfig> {
    load_env_file(env_file)?;
    from_lookup(|key| std::env::var(key).ok())
}

fn load_env_file(env_file: Option<&str>) -> Result<()> {
    match env_file {
        Some(path) => {
            dotenv::from_filename(path).with_context(|| format!("Failed to load env file {}", path))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).ok_or_else(|| anyhow!("{} not set", key))
}

fn address(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Address> {
    let raw = required(lookup, key)?;
    Address::from_str(raw.trim()).with_context(|| format!("{} is not an address: {}", key, raw))
}

fn optional_address(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Address>> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => Address::from_str(raw.trim())
            .map(Some)
            .with_context(|| format!("{} is not an address: {}", key, raw)),
        None => Ok(None),
    }
}

/// Build a config from any key → value source
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<HarnessConfig> {
    let defaults = ScenarioConfig::default();

    let node_flavor = match lookup("NODE_FLAVOR").map(|v| v.trim().to_lowercase()) {
        None => None,
        Some(v) if v.is_empty() || v == "auto" => None,
        Some(v) => Some(NodeFlavor::from_str(&v)?),
    };

    let scenario = ScenarioConfig {
        dump_amount: lookup("DUMP_AMOUNT").unwrap_or(defaults.dump_amount),
        manipulate_on: match lookup("MANIPULATE_ON") {
            Some(v) => Exchange::from_str(&v)?,
            None => defaults.manipulate_on,
        },
        gas_limit: match lookup("GAS_LIMIT") {
            Some(v) => v.trim().parse().context("GAS_LIMIT must be an integer")?,
            None => defaults.gas_limit,
        },
        min_profit: lookup("MIN_PROFIT").unwrap_or(defaults.min_profit),
        flash_divisor: match lookup("FLASH_DIVISOR") {
            Some(v) => v.trim().parse().context("FLASH_DIVISOR must be an integer")?,
            None => defaults.flash_divisor,
        },
        flash_amount: lookup("FLASH_AMOUNT").filter(|v| !v.trim().is_empty()),
        start_on_exchange_a: match lookup("START_ON_EXCHANGE_A") {
            Some(v) => Some(v.trim().parse().context("START_ON_EXCHANGE_A must be true or false")?),
            None => defaults.start_on_exchange_a,
        },
    };
    scenario.validate()?;

    Ok(HarnessConfig {
        rpc_url: required(&lookup, "RPC_URL")?,
        node_flavor,

        uniswap: DexAddresses {
            router: address(&lookup, "UNISWAP_ROUTER")?,
            factory: address(&lookup, "UNISWAP_FACTORY")?,
        },
        sushiswap: DexAddresses {
            router: address(&lookup, "SUSHISWAP_ROUTER")?,
            factory: address(&lookup, "SUSHISWAP_FACTORY")?,
        },

        base_token: address(&lookup, "ARB_AGAINST")?,
        quote_token: address(&lookup, "ARB_FOR")?,
        whale: address(&lookup, "WHALE_ADDRESS")?,

        arbitrage_contract: optional_address(&lookup, "ARBITRAGE_CONTRACT")?,
        arbitrage_caller: optional_address(&lookup, "ARBITRAGE_CALLER")?,

        scenario,
    })
}
