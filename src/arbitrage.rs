//! Arbitrage contract client
//!
//! Thin wrapper over the externally deployed flash-loan arbitrage contract.
//! The contract's strategy is opaque here: the harness only sanity-checks its
//! market mapping, triggers `executeTrade` and measures the caller's balance.

use crate::contracts::IFlashArbitrage::{self, IFlashArbitrageInstance};
use crate::error::{HarnessError, Result};
use crate::tx::{send_confirmed, TxFailure};
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionReceipt;
use tracing::{info, warn};

/// Flash-loan market id the contract must report for the quote asset (WETH)
pub const QUOTE_MARKET_ID: u64 = 0;

/// Parameters of one `executeTrade` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeRequest {
    pub start_on_exchange_a: bool,
    /// Token flash-borrowed and repaid (the quote asset)
    pub token0: Address,
    /// Token traded against
    pub token1: Address,
    /// Smallest-unit amount of `token0` to borrow
    pub flash_amount: U256,
}

pub struct ArbitrageClient<P> {
    contract: IFlashArbitrageInstance<P>,
    caller: Address,
    gas_limit: u64,
}

impl<P: Provider + Clone> ArbitrageClient<P> {
    pub fn new(address: Address, provider: P, caller: Address, gas_limit: u64) -> Self {
        Self {
            contract: IFlashArbitrage::new(address, provider),
            caller,
            gas_limit,
        }
    }

    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Check the contract maps `token` to the `expected` flash-loan market
    pub async fn check_market_id(&self, token: Address, expected: U256) -> Result<()> {
        let actual = self
            .contract
            .getMarketId(token)
            .call()
            .await
            .map_err(|e| HarnessError::contract("getMarketId", e))?;

        if actual != expected {
            return Err(HarnessError::MarketIdMismatch {
                token,
                actual,
                expected,
            });
        }
        info!("Market id for {:?}: {}", token, actual);
        Ok(())
    }

    /// Trigger the contract's trade entry point and wait for it to be mined
    pub async fn execute_trade(&self, request: &TradeRequest) -> Result<TransactionReceipt> {
        info!(
            "⚡ executeTrade(startOnExchangeA={}, token0={:?}, token1={:?}, flash={})",
            request.start_on_exchange_a, request.token0, request.token1, request.flash_amount
        );

        let call = self
            .contract
            .executeTrade(
                request.start_on_exchange_a,
                request.token0,
                request.token1,
                request.flash_amount,
            )
            .from(self.caller);

        send_confirmed(call, self.gas_limit, "executeTrade")
            .await
            .map_err(|failure| match failure {
                TxFailure::Reverted { reason, .. } => HarnessError::Reverted {
                    to: self.address(),
                    reason,
                },
                TxFailure::Transport(e) => e,
            })
    }
}

/// Profit of a balance move, required to be strictly positive and at least `minimum`
pub fn assert_profit(before: U256, after: U256, minimum: U256) -> Result<U256> {
    let profit = after.saturating_sub(before);
    if profit.is_zero() || profit < minimum {
        warn!("📉 Arbitrage did not clear threshold: {} -> {} (min {})", before, after, minimum);
        return Err(HarnessError::ProfitBelowThreshold {
            before,
            after,
            minimum,
        });
    }
    info!("🎉 Arbitrage profit: {} (min {})", profit, minimum);
    Ok(profit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = 1_000_000_000_000_000; // 0.001 ether

    #[test]
    fn test_profit_above_threshold() {
        let before = U256::from(5u64) * U256::from(MIN);
        let after = before + U256::from(2 * MIN);
        assert_eq!(assert_profit(before, after, U256::from(MIN)).unwrap(), U256::from(2 * MIN));
    }

    #[test]
    fn test_profit_exactly_threshold() {
        let before = U256::from(MIN);
        let after = U256::from(2 * MIN);
        assert!(assert_profit(before, after, U256::from(MIN)).is_ok());
    }

    #[test]
    fn test_profit_below_threshold() {
        let before = U256::from(MIN);
        let after = before + U256::from(MIN - 1);
        let err = assert_profit(before, after, U256::from(MIN)).unwrap_err();
        assert!(matches!(err, HarnessError::ProfitBelowThreshold { .. }));
    }

    #[test]
    fn test_loss_and_flat_rejected() {
        let before = U256::from(MIN);
        assert!(assert_profit(before, U256::from(MIN / 2), U256::ZERO).is_err());
        // Zero threshold still demands a strict increase
        assert!(assert_profit(before, before, U256::ZERO).is_err());
    }
}
