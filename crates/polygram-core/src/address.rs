//! Wallet address validation.
//!
//! Polymarket wallets are EVM addresses: `0x` followed by 40 hex digits.
//! Letter case is irrelevant to validity; stored addresses are lowercase.

use crate::error::{CoreError, CoreResult};

/// Human-readable description of the accepted address format.
pub const ADDRESS_FORMAT: &str = "0x followed by 40 hexadecimal characters";

const ADDRESS_HEX_LEN: usize = 40;

/// Check `s` against `^0x[0-9a-fA-F]{40}$`.
pub fn is_valid_address(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(hex) => hex.len() == ADDRESS_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Validate and lowercase an address.
pub fn normalize_address(s: &str) -> CoreResult<String> {
    if !is_valid_address(s) {
        return Err(CoreError::InvalidAddress(s.to_string()));
    }
    Ok(s.to_ascii_lowercase())
}

/// Abbreviate an address for display, e.g. `0x742d...6c87`.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
