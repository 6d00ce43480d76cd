//! Linked Web3 wallet types and address rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ChallengeId, UserId, WalletId};

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Bsc,
    Polygon,
    Arbitrum,
    /// Native chain: Ed25519 public keys as addresses
    Thal,
}

impl Chain {
    pub fn is_evm(&self) -> bool {
        !matches!(self, Chain::Thal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Thal => "thal",
        }
    }

    /// Canonical (lowercase) address if `address` is well-formed for this chain
    pub fn normalize_address(&self, address: &str) -> Option<String> {
        let lower = address.trim().to_ascii_lowercase();
        let ok = if self.is_evm() {
            is_evm_address(&lower)
        } else {
            lower.len() == 64 && lower.chars().all(|c| c.is_ascii_hexdigit())
        };
        ok.then_some(lower)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `0x` followed by 40 hex characters (case-insensitive)
pub fn is_evm_address(address: &str) -> bool {
    address.len() == 42
        && (address.starts_with("0x") || address.starts_with("0X"))
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: WalletId,
    pub user_id: UserId,
    pub chain: Chain,
    pub address: String,
    pub label: Option<String>,
    /// Ownership proven by a signed challenge
    pub verified: bool,
    pub primary: bool,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletChallenge {
    pub challenge_id: ChallengeId,
    pub user_id: UserId,
    pub chain: Chain,
    pub address: String,
    /// Canonical message the wallet must sign
    pub message: String,
    /// Hex SHA-256 of `message`; this is what gets signed
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_address_rules() {
        assert!(is_evm_address("0x52908400098527886E0F7030069857D2E4169EE7"));
        assert!(!is_evm_address("52908400098527886E0F7030069857D2E4169EE7"));
        assert!(!is_evm_address("0x52908400098527886E0F7030069857D2E4169EE"));
        assert!(!is_evm_address("0xZZ908400098527886E0F7030069857D2E4169EE7"));
    }

    #[test]
    fn test_normalize_address() {
        let evm = Chain::Ethereum
            .normalize_address("0x52908400098527886E0F7030069857D2E4169EE7")
            .unwrap();
        assert_eq!(evm, "0x52908400098527886e0f7030069857d2e4169ee7");
        assert!(Chain::Thal.normalize_address(&"ab".repeat(32)).is_some());
        assert!(Chain::Thal.normalize_address(&evm).is_none());
    }
}
