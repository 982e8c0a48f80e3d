//! Harness error taxonomy
//!
//! Every failure is terminal for the running scenario: deterministic on-chain
//! rejections are never retried. Variants carry the addresses and reason
//! strings needed to diagnose a failure without re-running it.

use alloy::primitives::{Address, U256};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Impersonation requested against a node that is not a local/forked dev network.
    #[error(
        "refusing to impersonate on a non-ephemeral network (client: {client_version}, chain id: {chain_id})"
    )]
    EnvironmentMisuse { client_version: String, chain_id: u64 },

    /// Factory returned the zero address for the requested pair.
    #[error("no pool for {token_a:?}/{token_b:?} on factory {factory:?}")]
    PoolNotFound {
        factory: Address,
        token_a: Address,
        token_b: Address,
    },

    /// Pair contract does not hold the requested base/quote tokens.
    #[error("pair {pair:?} holds {token0:?}/{token1:?}, expected base {base:?} and quote {quote:?}")]
    TokenOrdering {
        pair: Address,
        token0: Address,
        token1: Address,
        base: Address,
        quote: Address,
    },

    #[error("insufficient balance of {token:?} held by {holder:?}: {detail}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        detail: String,
        /// Raised by the chain rather than by the pre-submission check
        reverted: bool,
    },

    #[error("insufficient allowance of {token:?} for spender {spender:?}: {reason}")]
    InsufficientAllowance {
        token: Address,
        spender: Address,
        reason: String,
    },

    #[error("swap deadline {deadline} exceeded: {reason}")]
    DeadlineExceeded { deadline: u64, reason: String },

    #[error("insufficient liquidity along path {path:?}: {reason}")]
    InsufficientLiquidity { path: Vec<Address>, reason: String },

    /// Revert whose reason does not map to a more specific variant.
    #[error("transaction to {to:?} reverted: {reason}")]
    Reverted { to: Address, reason: String },

    #[error("stale impersonation state: {0}")]
    StaleImpersonation(String),

    #[error("invalid amount {amount:?} for {decimals} decimals: {reason}")]
    InvalidAmount {
        amount: String,
        decimals: u8,
        reason: String,
    },

    #[error("profit below threshold: balance {before} -> {after}, required at least {minimum}")]
    ProfitBelowThreshold {
        before: U256,
        after: U256,
        minimum: U256,
    },

    #[error("market id for {token:?} is {actual}, expected {expected}")]
    MarketIdMismatch {
        token: Address,
        actual: U256,
        expected: U256,
    },

    #[error("configuration error: {0}")]
    Config(String),

    /// Transport, ABI decoding or node-side failure that is not a revert.
    #[error("{context}: {source}")]
    Contract {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl HarnessError {
    pub fn contract<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Contract {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// True for errors that originate from an on-chain revert.
    pub fn is_revert(&self) -> bool {
        matches!(
            self,
            Self::InsufficientAllowance { .. }
                | Self::DeadlineExceeded { .. }
                | Self::InsufficientLiquidity { .. }
                | Self::Reverted { .. }
        ) || matches!(self, Self::InsufficientBalance { reverted: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_not_found_names_addresses() {
        let err = HarnessError::PoolNotFound {
            factory: Address::repeat_byte(0x11),
            token_a: Address::repeat_byte(0x22),
            token_b: Address::repeat_byte(0x33),
        };
        let msg = err.to_string();
        assert!(msg.contains("0x1111111111111111111111111111111111111111"), "{msg}");
        assert!(msg.contains("0x2222222222222222222222222222222222222222"), "{msg}");
    }

    #[test]
    fn test_is_revert() {
        let deadline = HarnessError::DeadlineExceeded {
            deadline: 1,
            reason: "UniswapV2Router: EXPIRED".into(),
        };
        assert!(deadline.is_revert());

        let preflight = HarnessError::InsufficientBalance {
            token: Address::ZERO,
            holder: Address::ZERO,
            detail: "balance 1 < required 2".into(),
            reverted: false,
        };
        assert!(!preflight.is_revert());

        // Classification follows the flag, not the wording of the detail
        let on_chain = HarnessError::InsufficientBalance {
            token: Address::ZERO,
            holder: Address::ZERO,
            detail: "ds-math-sub-underflow".into(),
            reverted: true,
        };
        assert!(on_chain.is_revert());
        let worded_like_revert = HarnessError::InsufficientBalance {
            token: Address::ZERO,
            holder: Address::ZERO,
            detail: "reverted: balance 1 < required 2".into(),
            reverted: false,
        };
        assert!(!worded_like_revert.is_revert());

        assert!(!HarnessError::Config("missing".into()).is_revert());
    }
}
