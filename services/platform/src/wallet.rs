//! Linked Web3 wallets
//!
//! EVM addresses link as unverified watch wallets. Native `thal` wallets
//! prove key ownership: the server issues a challenge whose canonical JSON
//! is hashed with SHA-256, and the client returns an Ed25519 signature over
//! the 32-byte digest. Challenges are single-use and expire after
//! [`CHALLENGE_TTL_SECS`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use types::ids::{ChallengeId, UserId, WalletId};
use types::wallet::{Chain, Wallet, WalletChallenge};

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

pub const CHALLENGE_TTL_SECS: i64 = 300;
pub const CHALLENGE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq)]
pub struct LinkWallet {
    pub user_id: UserId,
    pub chain: Chain,
    pub address: String,
    pub label: Option<String>,
    /// Required for `thal`
    pub challenge_id: Option<ChallengeId>,
    /// Hex Ed25519 signature over the challenge digest
    pub signature: Option<String>,
}

#[async_trait]
pub trait WalletService: Send + Sync {
    async fn create_challenge(&self, user: &UserId, chain: Chain, address: &str) -> PlatformResult<WalletChallenge>;

    async fn link(&self, request: LinkWallet) -> PlatformResult<Wallet>;

    /// Oldest first
    async fn wallets(&self, user: &UserId) -> Vec<Wallet>;

    async fn get(&self, wallet_id: &WalletId) -> PlatformResult<Wallet>;

    async fn set_primary(&self, wallet_id: &WalletId) -> PlatformResult<Wallet>;

    /// Returns the removed wallet
    async fn unlink(&self, wallet_id: &WalletId) -> PlatformResult<Wallet>;
}

/// Signed payload of a link challenge. Field order is the canonical order.
#[derive(Debug, Serialize)]
struct ChallengeMessage<'a> {
    version: &'static str,
    action: &'static str,
    payload: BTreeMap<&'static str, String>,
    expires_at: &'a DateTime<Utc>,
}

pub(crate) fn challenge_message(
    challenge_id: &ChallengeId,
    user: &UserId,
    chain: Chain,
    address: &str,
    expires_at: &DateTime<Utc>,
) -> PlatformResult<String> {
    let mut payload = BTreeMap::new();
    payload.insert("address", address.to_string());
    payload.insert("chain", chain.as_str().to_string());
    payload.insert("challenge_id", challenge_id.to_string());
    payload.insert("user_id", user.to_string());
    let message = ChallengeMessage {
        version: CHALLENGE_VERSION,
        action: "LinkWallet",
        payload,
        expires_at,
    };
    serde_json::to_string(&message).map_err(|e| PlatformError::Internal(format!("challenge encoding: {e}")))
}

pub fn digest(message: &str) -> [u8; 32] {
    Sha256::digest(message.as_bytes()).into()
}

fn invalid_signature(reason: &str) -> PlatformError {
    PlatformError::unprocessable("INVALID_SIGNATURE", reason.to_string())
}

/// Verifies `signature_hex` over the raw digest bytes with the public key
/// encoded in `address`
pub(crate) fn verify_ownership(address: &str, digest_hex: &str, signature_hex: &str) -> PlatformResult<()> {
    let key_bytes: [u8; 32] = hex::decode(address)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid_signature("address is not an Ed25519 public key"))?;
    let sig_bytes: [u8; 64] = hex::decode(signature_hex)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid_signature("signature must be 64 hex-encoded bytes"))?;
    let digest = hex::decode(digest_hex).map_err(|_| PlatformError::Internal("corrupt challenge digest".into()))?;

    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| invalid_signature("address is not an Ed25519 public key"))?;
    key.verify(&digest, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| invalid_signature("signature does not match challenge"))
}

#[derive(Default)]
struct WalletState {
    wallets: BTreeMap<WalletId, Wallet>,
    challenges: HashMap<ChallengeId, WalletChallenge>,
}

impl WalletState {
    fn promote_oldest(&mut self, user: &UserId) {
        if let Some(w) = self.wallets.values_mut().find(|w| &w.user_id == user) {
            w.primary = true;
        }
    }
}

pub struct InMemoryWallets {
    state: Mutex<WalletState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryWallets {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(WalletState::default()),
            clock,
        }
    }
}

fn normalize(chain: Chain, address: &str) -> PlatformResult<String> {
    chain.normalize_address(address).ok_or_else(|| {
        PlatformError::validation(if chain.is_evm() {
            "address: expected 0x followed by 40 hex characters"
        } else {
            "address: expected a 64 hex character Ed25519 public key"
        })
    })
}

#[async_trait]
impl WalletService for InMemoryWallets {
    async fn create_challenge(&self, user: &UserId, chain: Chain, address: &str) -> PlatformResult<WalletChallenge> {
        if chain.is_evm() {
            return Err(PlatformError::validation(
                "chain: challenges are only issued for thal wallets",
            ));
        }
        let address = normalize(chain, address)?;
        let now = self.clock.now();
        let challenge_id = ChallengeId::new();
        let expires_at = now + Duration::seconds(CHALLENGE_TTL_SECS);
        let message = challenge_message(&challenge_id, user, chain, &address, &expires_at)?;
        let challenge = WalletChallenge {
            challenge_id,
            user_id: *user,
            chain,
            address,
            digest: hex::encode(digest(&message)),
            message,
            expires_at,
        };

        let mut state = self.state.lock();
        state.challenges.retain(|_, c| c.expires_at > now);
        state.challenges.insert(challenge_id, challenge.clone());
        Ok(challenge)
    }

    async fn link(&self, request: LinkWallet) -> PlatformResult<Wallet> {
        let address = normalize(request.chain, &request.address)?;
        let now = self.clock.now();
        let mut state = self.state.lock();

        if state
            .wallets
            .values()
            .any(|w| w.user_id == request.user_id && w.chain == request.chain && w.address == address)
        {
            return Err(PlatformError::conflict(
                "WALLET_EXISTS",
                format!("{} wallet {address} already linked", request.chain),
            ));
        }

        let verified = if request.chain.is_evm() {
            false
        } else {
            let challenge_id = request
                .challenge_id
                .ok_or_else(|| PlatformError::validation("challenge_id: required for thal wallets"))?;
            let signature = request
                .signature
                .as_deref()
                .ok_or_else(|| PlatformError::validation("signature: required for thal wallets"))?;
            let challenge = match state.challenges.get(&challenge_id) {
                Some(c) if c.user_id == request.user_id => c.clone(),
                _ => return Err(PlatformError::not_found(format!("challenge {challenge_id}"))),
            };
            // single-use, whatever the outcome
            state.challenges.remove(&challenge_id);
            if challenge.expires_at <= now {
                return Err(PlatformError::unprocessable("CHALLENGE_EXPIRED", "challenge has expired"));
            }
            if challenge.address != address || challenge.chain != request.chain {
                return Err(PlatformError::unprocessable(
                    "CHALLENGE_MISMATCH",
                    "challenge was issued for a different wallet",
                ));
            }
            if let Err(err) = verify_ownership(&address, &challenge.digest, signature) {
                warn!(user_id = %request.user_id, "wallet signature rejected");
                return Err(err);
            }
            true
        };

        let primary = !state.wallets.values().any(|w| w.user_id == request.user_id);
        let wallet = Wallet {
            wallet_id: WalletId::new(),
            user_id: request.user_id,
            chain: request.chain,
            address,
            label: request.label,
            verified,
            primary,
            linked_at: now,
        };
        info!(
            wallet_id = %wallet.wallet_id,
            user_id = %wallet.user_id,
            chain = %wallet.chain,
            verified,
            "wallet linked"
        );
        state.wallets.insert(wallet.wallet_id, wallet.clone());
        Ok(wallet)
    }

    async fn wallets(&self, user: &UserId) -> Vec<Wallet> {
        self.state
            .lock()
            .wallets
            .values()
            .filter(|w| &w.user_id == user)
            .cloned()
            .collect()
    }

    async fn get(&self, wallet_id: &WalletId) -> PlatformResult<Wallet> {
        self.state
            .lock()
            .wallets
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("wallet {wallet_id}")))
    }

    async fn set_primary(&self, wallet_id: &WalletId) -> PlatformResult<Wallet> {
        let mut state = self.state.lock();
        let owner = state
            .wallets
            .get(wallet_id)
            .map(|w| w.user_id)
            .ok_or_else(|| PlatformError::not_found(format!("wallet {wallet_id}")))?;
        let mut selected = None;
        for wallet in state.wallets.values_mut().filter(|w| w.user_id == owner) {
            wallet.primary = &wallet.wallet_id == wallet_id;
            if wallet.primary {
                selected = Some(wallet.clone());
            }
        }
        selected.ok_or_else(|| PlatformError::not_found(format!("wallet {wallet_id}")))
    }

    async fn unlink(&self, wallet_id: &WalletId) -> PlatformResult<Wallet> {
        let mut state = self.state.lock();
        let removed = state
            .wallets
            .remove(wallet_id)
            .ok_or_else(|| PlatformError::not_found(format!("wallet {wallet_id}")))?;
        if removed.primary {
            state.promote_oldest(&removed.user_id);
        }
        info!(wallet_id = %wallet_id, user_id = %removed.user_id, "wallet unlinked");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    const EVM: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    fn service() -> (Arc<ManualClock>, InMemoryWallets) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (clock.clone(), InMemoryWallets::new(clock))
    }

    fn evm_link(user: UserId, address: &str) -> LinkWallet {
        LinkWallet {
            user_id: user,
            chain: Chain::Ethereum,
            address: address.into(),
            label: None,
            challenge_id: None,
            signature: None,
        }
    }

    async fn thal_link(
        svc: &InMemoryWallets,
        user: UserId,
        key: &SigningKey,
    ) -> (WalletChallenge, LinkWallet) {
        let address = hex::encode(key.verifying_key().to_bytes());
        let challenge = svc.create_challenge(&user, Chain::Thal, &address).await.unwrap();
        let digest = hex::decode(&challenge.digest).unwrap();
        let signature = hex::encode(key.sign(&digest).to_bytes());
        let request = LinkWallet {
            user_id: user,
            chain: Chain::Thal,
            address,
            label: Some("hot".into()),
            challenge_id: Some(challenge.challenge_id),
            signature: Some(signature),
        };
        (challenge, request)
    }

    #[tokio::test]
    async fn test_evm_wallet_is_unverified_and_primary() {
        let (_, svc) = service();
        let user = UserId::new();
        let wallet = svc.link(evm_link(user, EVM)).await.unwrap();
        assert!(!wallet.verified);
        assert!(wallet.primary);
        assert_eq!(wallet.address, EVM.to_ascii_lowercase());

        let err = svc.link(evm_link(user, &EVM.to_ascii_lowercase())).await.unwrap_err();
        assert_eq!(err.code(), "WALLET_EXISTS");
    }

    #[tokio::test]
    async fn test_challenge_digest_matches_message() {
        let (_, svc) = service();
        let key = SigningKey::generate(&mut OsRng);
        let (challenge, _) = thal_link(&svc, UserId::new(), &key).await;
        assert_eq!(challenge.digest, hex::encode(digest(&challenge.message)));
        let parsed: serde_json::Value = serde_json::from_str(&challenge.message).unwrap();
        assert_eq!(parsed["action"], "LinkWallet");
        assert_eq!(parsed["payload"]["chain"], "thal");
    }

    #[tokio::test]
    async fn test_thal_link_with_signed_challenge() {
        let (_, svc) = service();
        let user = UserId::new();
        let key = SigningKey::generate(&mut OsRng);
        let (_, request) = thal_link(&svc, user, &key).await;

        let wallet = svc.link(request.clone()).await.unwrap();
        assert!(wallet.verified);

        // the challenge was consumed
        svc.unlink(&wallet.wallet_id).await.unwrap();
        let err = svc.link(request).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_thal_link_rejects_foreign_signature() {
        let (_, svc) = service();
        let user = UserId::new();
        let key = SigningKey::generate(&mut OsRng);
        let impostor = SigningKey::generate(&mut OsRng);
        let (challenge, mut request) = thal_link(&svc, user, &key).await;
        let digest = hex::decode(&challenge.digest).unwrap();
        request.signature = Some(hex::encode(impostor.sign(&digest).to_bytes()));

        let err = svc.link(request).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_SIGNATURE");
    }

    #[tokio::test]
    async fn test_expired_challenge() {
        let (clock, svc) = service();
        let user = UserId::new();
        let key = SigningKey::generate(&mut OsRng);
        let (_, request) = thal_link(&svc, user, &key).await;
        clock.advance(Duration::seconds(CHALLENGE_TTL_SECS + 1));

        let err = svc.link(request).await.unwrap_err();
        assert_eq!(err.code(), "CHALLENGE_EXPIRED");
    }

    #[tokio::test]
    async fn test_unlink_primary_promotes_oldest() {
        let (_, svc) = service();
        let user = UserId::new();
        let first = svc.link(evm_link(user, EVM)).await.unwrap();
        let second = svc
            .link(evm_link(user, "0x00000000000000000000000000000000000000aa"))
            .await
            .unwrap();
        let third = svc
            .link(evm_link(user, "0x00000000000000000000000000000000000000bb"))
            .await
            .unwrap();
        assert!(!second.primary);

        let promoted = svc.set_primary(&third.wallet_id).await.unwrap();
        assert!(promoted.primary);
        svc.unlink(&third.wallet_id).await.unwrap();

        let wallets = svc.wallets(&user).await;
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets.iter().find(|w| w.primary).unwrap().wallet_id, first.wallet_id);
    }
}
