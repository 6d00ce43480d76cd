use serde::Deserialize;
use types::ids::ChallengeId;
use types::wallet::Chain;

use crate::validation::{Validate, ValidationResult, non_empty};

fn address_shape(chain: Chain, address: &str) -> ValidationResult {
    if chain.normalize_address(address).is_some() {
        Ok(())
    } else if chain.is_evm() {
        Err("address must be a 0x-prefixed 40 character hex address".to_string())
    } else {
        Err("address must be a 64 character hex public key".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeRequest {
    pub chain: Chain,
    pub address: String,
}

impl Validate for ChallengeRequest {
    fn validate(&self) -> ValidationResult {
        address_shape(self.chain, &self.address)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkWalletRequest {
    pub chain: Chain,
    pub address: String,
    pub label: Option<String>,
    pub challenge_id: Option<ChallengeId>,
    pub signature: Option<String>,
}

impl Validate for LinkWalletRequest {
    fn validate(&self) -> ValidationResult {
        address_shape(self.chain, &self.address)?;
        if let Some(label) = &self.label {
            non_empty("label", label, 64)?;
        }
        if self.chain == Chain::Thal && (self.challenge_id.is_none() || self.signature.is_none()) {
            return Err("thal wallets require challenge_id and signature".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thal_link_needs_proof() {
        let key = "ab".repeat(32);
        let bare: LinkWalletRequest =
            serde_json::from_value(serde_json::json!({ "chain": "thal", "address": key })).unwrap();
        assert_eq!(bare.validate().unwrap_err(), "thal wallets require challenge_id and signature");

        let evm: LinkWalletRequest = serde_json::from_value(serde_json::json!({
            "chain": "polygon",
            "address": "0x52908400098527886E0F7030069857D2E4169EE7",
            "label": "cold"
        }))
        .unwrap();
        assert!(evm.validate().is_ok());
    }

    #[test]
    fn test_challenge_address_per_chain() {
        let wrong: ChallengeRequest = serde_json::from_value(serde_json::json!({
            "chain": "thal",
            "address": "0x52908400098527886E0F7030069857D2E4169EE7"
        }))
        .unwrap();
        assert!(wrong.validate().is_err());
        assert!(serde_json::from_str::<ChallengeRequest>(r#"{"chain":"solana","address":"x"}"#).is_err());
    }
}
