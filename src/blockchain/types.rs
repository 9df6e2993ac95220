// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ChainError;

/// Native token decimals on EVM chains.
pub const NATIVE_DECIMALS: u8 = 18;

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Native token symbol
    pub native_symbol: String,
    /// Asset registry contract; chain asset lookups are empty when unset
    pub asset_registry: Option<String>,
}

impl NetworkConfig {
    /// Avalanche Fuji Testnet defaults.
    pub fn fuji() -> Self {
        Self {
            name: "Avalanche Fuji Testnet".to_string(),
            chain_id: 43113,
            rpc_url: "https://api.avax-test.network/ext/bc/C/rpc".to_string(),
            native_symbol: "AVAX".to_string(),
            asset_registry: None,
        }
    }
}

/// Token balance information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenBalance {
    /// Token symbol (e.g., "AVAX")
    pub symbol: String,
    /// Balance in smallest unit (wei)
    pub balance_raw: String,
    /// Balance formatted with decimals
    pub balance_formatted: String,
    /// Number of decimals
    pub decimals: u8,
}

impl TokenBalance {
    pub fn native(raw: U256, symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            balance_raw: raw.to_string(),
            balance_formatted: format_amount(raw, NATIVE_DECIMALS),
            decimals: NATIVE_DECIMALS,
        }
    }
}

/// On-chain asset record (one NFT of the asset registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Asset {
    pub did: String,
    pub usn: String,
    /// Lowercase `0x` address of the current owner
    pub owner: String,
    pub uri: String,
    pub uri_hash: String,
}

/// Message submitted by [`super::ChainService::send_signed_tx`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainMsg {
    /// Native token transfer; `amount` is human-readable (e.g. "1.5").
    Send { to: String, amount: String },
    Mint {
        did: String,
        usn: String,
        uri: String,
        uri_hash: String,
    },
    Transfer { did: String, to: String },
    UpdateUriHash { did: String, uri_hash: String },
}

/// Transaction send result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TxOutcome {
    pub tx_hash: String,
}

/// Parse a human-readable amount to the smallest unit.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for native tokens)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ChainError> {
    let parts: Vec<&str> = amount.trim().split('.').collect();

    if parts.len() > 2 || parts[0].is_empty() {
        return Err(ChainError::InvalidAmount(amount.to_string()));
    }

    let whole = parts[0]
        .parse::<u128>()
        .map_err(|_| ChainError::InvalidAmount(amount.to_string()))?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.len() > decimals as usize {
            return Err(ChainError::InvalidAmount(format!(
                "too many decimal places (max {decimals})"
            )));
        }
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| ChainError::InvalidAmount(amount.to_string()))?
    } else {
        0u128
    };

    let multiplier = 10u128.pow(decimals as u32);
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| ChainError::InvalidAmount("amount overflow".to_string()))?;

    Ok(U256::from(total))
}

/// Format the smallest unit to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{trimmed}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_whole_and_decimal() {
        assert_eq!(
            parse_amount("1", 18).unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_amount("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_amount("0.001", 18).unwrap(),
            U256::from(1_000_000_000_000_000u64)
        );
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        assert!(matches!(parse_amount("1.2.3", 18), Err(ChainError::InvalidAmount(_))));
        assert!(matches!(parse_amount("abc", 18), Err(ChainError::InvalidAmount(_))));
        assert!(matches!(parse_amount(".5", 18), Err(ChainError::InvalidAmount(_))));
        assert!(matches!(parse_amount("0.1234567", 6), Err(ChainError::InvalidAmount(_))));
    }

    #[test]
    fn format_amount_trims_trailing_zeros() {
        assert_eq!(format_amount(U256::ZERO, 18), "0");
        assert_eq!(format_amount(U256::from(1_000_000_000_000_000_000u64), 18), "1");
        assert_eq!(format_amount(U256::from(1_500_000_000_000_000_000u64), 18), "1.5");
    }

    #[test]
    fn native_balance_reports_zero() {
        let zero = TokenBalance::native(U256::ZERO, "AVAX");
        assert!(zero.is_zero());
        assert_eq!(zero.balance_formatted, "0");

        let some = TokenBalance::native(U256::from(5u64), "AVAX");
        assert!(!some.is_zero());
    }
}
