//! Token amount conversion
//!
//! Human-readable decimal strings ("3000000000000", "0.001") to and from
//! smallest-unit integers. Conversion is exact: an amount with more fractional
//! digits than the token supports is rejected instead of truncated.

use crate::error::{HarnessError, Result};
use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

/// Convert a decimal string to the token's smallest unit.
pub fn to_smallest_unit(amount: &str, decimals: u8) -> Result<U256> {
    let invalid = |reason: &str| HarnessError::InvalidAmount {
        amount: amount.to_string(),
        decimals,
        reason: reason.to_string(),
    };

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty amount"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("only unsigned base-10 digits and one '.' are accepted"));
    }

    // Trailing zeros carry no precision; anything else past `decimals` would be lost
    let significant = fraction.trim_end_matches('0');
    if significant.len() > decimals as usize {
        return Err(invalid("more fractional digits than the token supports"));
    }

    let normalized = match (whole.is_empty(), significant.is_empty()) {
        (true, true) => "0".to_string(),
        (true, false) => format!("0.{}", significant),
        (false, true) => whole.to_string(),
        (false, false) => format!("{}.{}", whole, significant),
    };

    let parsed = parse_units(&normalized, decimals).map_err(|e| invalid(&e.to_string()))?;
    Ok(parsed.get_absolute())
}

/// Format a smallest-unit amount as a decimal string.
pub fn from_smallest_unit(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_amount_in_wei() {
        // 3,000,000,000,000 tokens with 18 decimals = 3e30 base units
        let units = to_smallest_unit("3000000000000", 18).unwrap();
        let expected = U256::from(3_000_000_000_000u128) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(units, expected);
    }

    #[test]
    fn test_fractional_amounts() {
        assert_eq!(to_smallest_unit("0.001", 18).unwrap(), U256::from(1_000_000_000_000_000u64));
        assert_eq!(to_smallest_unit("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(to_smallest_unit(".25", 2).unwrap(), U256::from(25u64));
        assert_eq!(to_smallest_unit("7.", 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn test_trailing_zeros_beyond_precision_are_accepted() {
        assert_eq!(to_smallest_unit("1.500000000", 6).unwrap(), U256::from(1_500_000u64));
    }

    #[test]
    fn test_excess_precision_rejected() {
        let err = to_smallest_unit("0.0000001", 6).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidAmount { decimals: 6, .. }));
    }

    #[test]
    fn test_malformed_amounts_rejected() {
        for bad in ["", " ", ".", "-1", "1e18", "abc", "1.2.3", "0x10"] {
            assert!(to_smallest_unit(bad, 18).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_overflow_rejected() {
        // 2^256 is 78 digits; 80 nines cannot fit
        let huge = "9".repeat(80);
        assert!(to_smallest_unit(&huge, 0).is_err());
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(from_smallest_unit(U256::from(1_500_000_000_000_000_000u64), 18), "1.500000000000000000");
        assert_eq!(from_smallest_unit(U256::from(25u64), 2), "0.25");
    }
}
