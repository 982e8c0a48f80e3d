// Core data structures shared across the harness

use crate::error::{HarnessError, Result};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// V2 exchanges the scenario can manipulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Uniswap,
    Sushiswap,
}

impl Exchange {
    /// The exchange the arbitrage contract would settle on after starting here
    pub fn other(&self) -> Self {
        match self {
            Exchange::Uniswap => Exchange::Sushiswap,
            Exchange::Sushiswap => Exchange::Uniswap,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Exchange::Uniswap => write!(f, "Uniswap"),
            Exchange::Sushiswap => write!(f, "Sushiswap"),
        }
    }
}

impl FromStr for Exchange {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "uniswap" | "uni" => Ok(Exchange::Uniswap),
            "sushiswap" | "sushi" => Ok(Exchange::Sushiswap),
            other => Err(HarnessError::Config(format!(
                "unknown exchange '{}' (expected uniswap or sushiswap)",
                other
            ))),
        }
    }
}

/// Router + factory addresses for one V2 exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexAddresses {
    pub router: Address,
    pub factory: Address,
}

/// Pool reserves oriented to the caller's base/quote request.
///
/// `token_a` is always the base asset and `token_b` the quote asset,
/// regardless of the pool's canonical token0/token1 order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPair {
    pub token_a: Address,
    pub token_b: Address,
    pub reserve_a: U256,
    pub reserve_b: U256,
}

impl TokenPair {
    /// Map a pool's canonical (token0, token1, reserve0, reserve1) onto the
    /// requested base/quote orientation.
    pub fn from_canonical(
        pair: Address,
        (token0, token1): (Address, Address),
        (reserve0, reserve1): (U256, U256),
        base: Address,
        quote: Address,
    ) -> Result<Self> {
        let (reserve_a, reserve_b) = if token0 == base && token1 == quote {
            (reserve0, reserve1)
        } else if token0 == quote && token1 == base {
            (reserve1, reserve0)
        } else {
            return Err(HarnessError::TokenOrdering {
                pair,
                token0,
                token1,
                base,
                quote,
            });
        };

        Ok(Self {
            token_a: base,
            token_b: quote,
            reserve_a,
            reserve_b,
        })
    }

    /// Constant-product output (0.30% fee) for selling `amount_in` of the base token.
    ///
    /// Formula: amount_out = (amount_in * 997 * reserve_out) / (reserve_in * 1000 + amount_in * 997)
    pub fn quote_out_for_base_in(&self, amount_in: U256) -> U256 {
        if amount_in.is_zero() || self.reserve_a.is_zero() || self.reserve_b.is_zero() {
            return U256::ZERO;
        }

        let amount_in_with_fee = amount_in.saturating_mul(U256::from(997));
        let numerator = amount_in_with_fee.saturating_mul(self.reserve_b);
        let denominator = self
            .reserve_a
            .saturating_mul(U256::from(1000))
            .saturating_add(amount_in_with_fee);

        numerator / denominator
    }

    /// Reserves after a base-in / quote-out swap settles.
    pub fn after_base_in(&self, amount_in: U256) -> Self {
        let amount_out = self.quote_out_for_base_in(amount_in);
        Self {
            reserve_a: self.reserve_a.saturating_add(amount_in),
            reserve_b: self.reserve_b.saturating_sub(amount_out),
            ..*self
        }
    }
}
