//! Pair Price Oracle
//!
//! Derives a quote-per-base price from a V2 pair's raw reserves.
//!
//! Pools store reserves in canonical (token0 < token1) order, which has no
//! relation to which token the caller treats as base or quote. Every query
//! reads token0/token1 and maps the reserves explicitly before dividing.
//! Reserves are read fresh on every call and never cached.
//!
//! Prices are kept as exact rationals (U256 numerator / denominator) and
//! compared by cross-multiplication in U512; floats only appear in log output.

use crate::bindings::PairHandle;
use crate::error::{HarnessError, Result};
use crate::types::TokenPair;
use crate::units::from_smallest_unit;
use alloy::primitives::{U256, U512};
use alloy::providers::Provider;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// Fixed-point precision used for display
const DISPLAY_DECIMALS: u8 = 18;

fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Quote units per base unit, normalized for each token's decimals
#[derive(Debug, Clone, Copy)]
pub struct PriceRatio {
    numerator: U256,
    denominator: U256,
}

impl PriceRatio {
    /// `reserve_quote / reserve_base`, with each side scaled to whole-token units.
    ///
    /// Returns `None` for an empty base reserve or if scaling overflows U256.
    pub fn from_reserves(
        reserve_base: U256,
        base_decimals: u8,
        reserve_quote: U256,
        quote_decimals: u8,
    ) -> Option<Self> {
        if reserve_base.is_zero() {
            return None;
        }
        // (rq / 10^qd) / (rb / 10^bd) = rq * 10^bd / (rb * 10^qd)
        let numerator = reserve_quote.checked_mul(pow10(base_decimals))?;
        let denominator = reserve_base.checked_mul(pow10(quote_decimals))?;
        Some(Self {
            numerator,
            denominator,
        })
    }

    /// Base units per quote unit
    pub fn inverse(&self) -> Option<Self> {
        if self.numerator.is_zero() {
            return None;
        }
        Some(Self {
            numerator: self.denominator,
            denominator: self.numerator,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    /// floor(ratio * 10^decimals)
    pub fn scaled(&self, decimals: u8) -> U256 {
        let wide = U512::from(self.numerator) * U512::from(pow10(decimals)) / U512::from(self.denominator);
        U256::saturating_from(wide)
    }

    /// Ratio as a `Decimal` with `dp` fractional digits, if it fits.
    pub fn to_decimal(&self, dp: u8) -> Option<Decimal> {
        let scaled = u128::try_from(self.scaled(dp)).ok()?;
        let scaled = i128::try_from(scaled).ok()?;
        Decimal::try_from_i128_with_scale(scaled, dp as u32).ok()
    }

    /// Ratio rounded to whole units, as shown in reports
    pub fn rounded(&self) -> String {
        match self.to_decimal(6) {
            Some(d) => d.round().to_string(),
            None => self.scaled(0).to_string(),
        }
    }

    /// Lossy conversion for log output only
    pub fn as_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl PartialEq for PriceRatio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriceRatio {}

impl PartialOrd for PriceRatio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceRatio {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = U512::from(self.numerator) * U512::from(other.denominator);
        let rhs = U512::from(other.numerator) * U512::from(self.denominator);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for PriceRatio {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", from_smallest_unit(self.scaled(DISPLAY_DECIMALS), DISPLAY_DECIMALS))
    }
}

impl Serialize for PriceRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Reads pair reserves and derives `PriceRatio`s
#[derive(Debug, Clone, Copy, Default)]
pub struct PairPriceOracle;

impl PairPriceOracle {
    pub fn new() -> Self {
        Self
    }

    /// Fresh reserves of `pair`, oriented base → `token_a`, quote → `token_b`
    pub async fn read_pair<P: Provider>(&self, pair: &PairHandle<P>) -> Result<TokenPair> {
        let contract = pair.contract();

        let token0 = contract
            .token0()
            .call()
            .await
            .map_err(|e| HarnessError::contract("token0()", e))?;
        let token1 = contract
            .token1()
            .call()
            .await
            .map_err(|e| HarnessError::contract("token1()", e))?;
        let reserves = contract
            .getReserves()
            .call()
            .await
            .map_err(|e| HarnessError::contract("getReserves()", e))?;

        TokenPair::from_canonical(
            pair.address,
            (token0, token1),
            (U256::from(reserves.reserve0), U256::from(reserves.reserve1)),
            pair.base.address,
            pair.quote.address,
        )
    }

    /// Current quote-per-base price of `pair`
    pub async fn price<P: Provider>(&self, pair: &PairHandle<P>) -> Result<PriceRatio> {
        let reserves = self.read_pair(pair).await?;
        let price = Self::ratio(&reserves, pair.base.decimals, pair.quote.decimals)?;

        debug!(
            "Pair {:?}: {} {} / {} {} → {} {} per {}",
            pair.address,
            reserves.reserve_a,
            pair.base.symbol,
            reserves.reserve_b,
            pair.quote.symbol,
            price,
            pair.quote.symbol,
            pair.base.symbol
        );

        Ok(price)
    }

    /// Price of already-read reserves
    pub fn ratio(reserves: &TokenPair, base_decimals: u8, quote_decimals: u8) -> Result<PriceRatio> {
        PriceRatio::from_reserves(reserves.reserve_a, base_decimals, reserves.reserve_b, quote_decimals)
            .ok_or_else(|| HarnessError::InsufficientLiquidity {
                path: vec![reserves.token_a, reserves.token_b],
                reason: format!(
                    "cannot price reserves ({}, {})",
                    reserves.reserve_a, reserves.reserve_b
                ),
            })
    }
}
