//! Conversions between wei and human-readable ether amounts

use alloy_primitives::utils::{
    format_ether as format_units_ether, parse_ether as parse_units_ether,
};
use alloy_primitives::U256;

use crate::error::PoolError;

/// Number of wei in one ether
pub const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

const ETHER_DECIMALS: usize = 18;

/// Render a wei amount as a decimal ether string
///
/// Always keeps at least one fractional digit (`1.0`, `0.5`, `12.345`).
pub fn format_ether(wei: U256) -> String {
    let full = format_units_ether(wei);
    let trimmed = full.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parse a decimal ether string into wei
///
/// Only plain unsigned decimals are accepted; signs, exponents and more than
/// 18 fractional digits are refused before conversion.
pub fn parse_ether(input: &str) -> Result<U256, PoolError> {
    let value = input.trim();
    let invalid = || PoolError::InvalidAmount(input.to_string());

    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > ETHER_DECIMALS {
        return Err(PoolError::InvalidAmount(format!(
            "{} (more than {} decimals)",
            input, ETHER_DECIMALS
        )));
    }

    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );
    parse_units_ether(&normalized).map_err(|_| invalid())
}

/// Decimal form of a hex chain id (`0x89` -> 137)
pub fn chain_id_decimal(chain_id: &str) -> Option<u64> {
    let digits = chain_id
        .strip_prefix("0x")
        .or_else(|| chain_id.strip_prefix("0X"))
        .unwrap_or(chain_id);
    u64::from_str_radix(digits, 16).ok()
}
