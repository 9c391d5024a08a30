//! Account and contract addresses
//!
//! Addresses are alloy's 20-byte `Address`, so equality is case-insensitive
//! by construction. Parsing follows EIP-55: all-lowercase and all-uppercase
//! hex are accepted as-is, mixed case must match the checksum.

pub use alloy_primitives::Address;

use crate::error::PoolError;

/// Parse and validate an address string
///
/// Accepts an optional `0x` prefix followed by exactly 40 hex digits.
pub fn parse(input: &str) -> Result<Address, PoolError> {
    let hex_part = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PoolError::invalid_address(input));
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{}", hex_part), None)
            .map_err(|_| PoolError::InvalidAddress(format!("{} (bad checksum)", input)));
    }

    hex_part
        .parse::<Address>()
        .map_err(|_| PoolError::invalid_address(input))
}

/// Format + checksum check without keeping the parsed value
pub fn is_valid(input: &str) -> bool {
    parse(input).is_ok()
}

/// Abbreviated form for headers and cards, e.g. `0x5aAe...eAed`
pub fn short(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Serialize as the EIP-55 checksummed string
pub(crate) fn serialize_checksummed<S: serde::Serializer>(
    address: &Address,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}
