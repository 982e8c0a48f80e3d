//! Arbitrage Verification Harness
//!
//! Manipulation scenario:
//!   ephemeral check → impersonate whale → resolve pair → price before →
//!   dump base token → price after → release → report
//!
//! Verification scenario: the manipulation scenario, then the external
//! arbitrage contract trades across the created spread and the caller's
//! quote-token balance must rise by at least the configured minimum.
//!
//! Scenarios run strictly one at a time: every step waits for the previous
//! node call (or mined transaction) before starting.

use crate::arbitrage::{assert_profit, ArbitrageClient, TradeRequest, QUOTE_MARKET_ID};
use crate::bindings::{ContractBindings, TokenMeta};
use crate::config::HarnessConfig;
use crate::contracts::IERC20;
use crate::error::{HarnessError, Result};
use crate::impersonation::AccountImpersonator;
use crate::node::{ensure_ephemeral, DevNode};
use crate::oracle::{PairPriceOracle, PriceRatio};
use crate::swap::{SwapExecutor, SwapReceipt};
use crate::types::Exchange;
use crate::units::{from_smallest_unit, to_smallest_unit};
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of the price manipulation scenario
#[derive(Debug, Clone, Serialize)]
pub struct ManipulationReport {
    pub exchange: Exchange,
    pub pair: Address,
    pub base: TokenMeta,
    pub quote: TokenMeta,
    /// Quote per base before the dump
    pub price_before: PriceRatio,
    /// Quote per base after the dump
    pub price_after: PriceRatio,
    pub swap: SwapReceipt,
    pub recipient: Address,
    /// Recipient's quote-token balance after the dump (smallest units)
    pub recipient_quote_balance: U256,
    pub completed_at: DateTime<Utc>,
}

impl ManipulationReport {
    /// True when the dump lowered the quote-per-base price
    pub fn price_moved_down(&self) -> bool {
        self.price_after < self.price_before
    }

    /// Report rows quoted as "1 <QUOTE> = N <BASE>"
    pub fn rows(&self) -> Vec<(String, String)> {
        let quoted = |price: &PriceRatio| match price.inverse() {
            Some(inverse) => format!("1 {} = {} {}", self.quote.symbol, inverse.rounded(), self.base.symbol),
            None => format!("1 {} = ∞ {}", self.quote.symbol, self.base.symbol),
        };

        vec![
            ("Price Before".to_string(), quoted(&self.price_before)),
            ("Price After".to_string(), quoted(&self.price_after)),
            (
                "Receiver Balance".to_string(),
                format!(
                    "{} {}",
                    from_smallest_unit(self.recipient_quote_balance, self.quote.decimals),
                    self.quote.symbol
                ),
            ),
        ]
    }
}

/// Outcome of the full verification scenario
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub manipulation: ManipulationReport,
    pub arbitrage_contract: Address,
    pub caller: Address,
    pub flash_amount: U256,
    pub balance_before: U256,
    pub balance_after: U256,
    pub profit: U256,
}

/// Flash amount in smallest quote units.
///
/// An explicit amount wins; otherwise the dump amount, read as a raw
/// integer, is divided by `divisor`.
pub fn flash_amount(explicit: Option<&str>, dump_amount: &str, divisor: u64) -> Result<U256> {
    if let Some(raw) = explicit {
        return to_smallest_unit(raw, 0);
    }
    if divisor == 0 {
        return Err(HarnessError::Config("flash divisor must be greater than zero".into()));
    }
    Ok(to_smallest_unit(dump_amount, 0)? / U256::from(divisor))
}

pub struct ArbitrageVerificationHarness<P, N> {
    provider: P,
    impersonator: AccountImpersonator<N>,
    oracle: PairPriceOracle,
    config: HarnessConfig,
}

impl<P: Provider + Clone, N: DevNode> ArbitrageVerificationHarness<P, N> {
    pub fn new(provider: P, node: N, config: HarnessConfig) -> Self {
        Self {
            provider,
            impersonator: AccountImpersonator::new(node),
            oracle: PairPriceOracle::new(),
            config,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn impersonator(&self) -> &AccountImpersonator<N> {
        &self.impersonator
    }

    /// Move the configured pool's price by dumping the whale's base tokens
    pub async fn manipulate(&self) -> Result<ManipulationReport> {
        ensure_ephemeral(self.impersonator.node()).await?;
        self.dump_as_whale().await
    }

    async fn dump_as_whale(&self) -> Result<ManipulationReport> {
        let whale = self.config.whale;
        self.impersonator
            .scoped(whale, |signer| self.manipulate_as(signer))
            .await
    }

    async fn manipulate_as(&self, signer: Address) -> Result<ManipulationReport> {
        let scenario = &self.config.scenario;
        let exchange = scenario.manipulate_on;
        let bindings = ContractBindings::new(self.provider.clone(), signer, self.config.dex(exchange));

        let pair = bindings
            .resolve_pair(self.config.base_token, self.config.quote_token)
            .await?;
        info!(
            "Manipulating {}/{} on {} (pair {:?})",
            pair.base.symbol, pair.quote.symbol, exchange, pair.address
        );

        let price_before = self.oracle.price(&pair).await?;

        if let Ok(amount_in) = to_smallest_unit(&scenario.dump_amount, pair.base.decimals) {
            let reserves = self.oracle.read_pair(&pair).await?;
            debug!(
                "Constant-product estimate: {} {} in → {} {} out",
                amount_in,
                pair.base.symbol,
                reserves.quote_out_for_base_in(amount_in),
                pair.quote.symbol
            );
        }

        let executor = SwapExecutor::new(&bindings, scenario.gas_limit);
        let swap = executor
            .execute(pair.base.address, pair.quote.address, signer, &scenario.dump_amount)
            .await?;

        let price_after = self.oracle.price(&pair).await?;
        let before = price_before.as_f64();
        if before > 0.0 {
            info!(
                "📊 {} per {} moved {:+.2}%",
                pair.quote.symbol,
                pair.base.symbol,
                (price_after.as_f64() - before) / before * 100.0
            );
        }

        let recipient_quote_balance = bindings
            .token(pair.quote.address)
            .balanceOf(signer)
            .call()
            .await
            .map_err(|e| HarnessError::contract("balanceOf(recipient)", e))?;

        let report = ManipulationReport {
            exchange,
            pair: pair.address,
            base: pair.base.clone(),
            quote: pair.quote.clone(),
            price_before,
            price_after,
            swap,
            recipient: signer,
            recipient_quote_balance,
            completed_at: Utc::now(),
        };

        for (label, value) in report.rows() {
            info!("{:>16}: {}", label, value);
        }
        Ok(report)
    }

    /// Manipulate, then drive the arbitrage contract and assert it profits
    pub async fn verify(&self) -> Result<VerificationReport> {
        ensure_ephemeral(self.impersonator.node()).await?;

        let scenario = &self.config.scenario;
        let contract = self.config.arbitrage_contract.ok_or_else(|| {
            HarnessError::Config("ARBITRAGE_CONTRACT is required for verification".into())
        })?;

        // Every input is validated before the pool is touched
        let flash_amount = flash_amount(
            scenario.flash_amount.as_deref(),
            &scenario.dump_amount,
            scenario.flash_divisor,
        )?;
        let quote = IERC20::new(self.config.quote_token, self.provider.clone());
        let quote_decimals = quote
            .decimals()
            .call()
            .await
            .map_err(|e| HarnessError::contract("decimals() of quote token", e))?;
        let minimum = to_smallest_unit(&scenario.min_profit, quote_decimals)?;

        let caller = match self.config.arbitrage_caller {
            Some(caller) => caller,
            None => self.default_caller().await?,
        };

        let client = ArbitrageClient::new(contract, self.provider.clone(), caller, scenario.gas_limit);
        client
            .check_market_id(self.config.quote_token, U256::from(QUOTE_MARKET_ID))
            .await?;

        let manipulation = self.dump_as_whale().await?;

        let balance_before = quote
            .balanceOf(caller)
            .call()
            .await
            .map_err(|e| HarnessError::contract("balanceOf(caller) before trade", e))?;

        let request = TradeRequest {
            start_on_exchange_a: scenario
                .start_on_exchange_a
                .unwrap_or(scenario.manipulate_on == Exchange::Uniswap),
            token0: self.config.quote_token,
            token1: self.config.base_token,
            flash_amount,
        };
        let start = if request.start_on_exchange_a { Exchange::Uniswap } else { Exchange::Sushiswap };
        info!("Arbitrage route: borrow on {}, settle on {}", start, start.other());
        client.execute_trade(&request).await?;

        let balance_after = quote
            .balanceOf(caller)
            .call()
            .await
            .map_err(|e| HarnessError::contract("balanceOf(caller) after trade", e))?;

        let profit = assert_profit(balance_before, balance_after, minimum)?;

        Ok(VerificationReport {
            manipulation,
            arbitrage_contract: contract,
            caller,
            flash_amount,
            balance_before,
            balance_after,
            profit,
        })
    }

    /// First unlocked account of the node (the deployer on a Hardhat fork)
    async fn default_caller(&self) -> Result<Address> {
        let accounts = self
            .provider
            .get_accounts()
            .await
            .map_err(|e| HarnessError::contract("eth_accounts", e))?;
        accounts.first().copied().ok_or_else(|| {
            HarnessError::Config("node exposes no unlocked accounts; set ARBITRAGE_CALLER".into())
        })
    }
}
