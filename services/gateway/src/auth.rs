use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Method, header::AUTHORIZATION, request::Parts},
};
use dashmap::DashMap;
use hmac::{Hmac, Mac, digest::InvalidLength};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use types::auth::{KycLevel, Role};
use types::ids::{TenantId, UserId};

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const SIGNATURE_HEADER: &str = "x-signature";
pub const NONCE_HEADER: &str = "x-nonce";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
    #[serde(default)]
    pub kyc_level: u8,
    pub exp: usize,
}

impl Claims {
    /// HS256 token for these claims
    pub fn sign(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::new(Algorithm::HS256),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }
}

/// Store for API nonces to prevent replay attacks
pub struct NonceStore {
    // Maps API key id to the last seen nonce
    last_nonces: DashMap<String, u64>,
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceStore {
    pub fn new() -> Self {
        Self {
            last_nonces: DashMap::new(),
        }
    }

    pub fn validate_and_update(&self, key_id: &str, nonce: u64) -> Result<(), AppError> {
        let mut entry = self.last_nonces.entry(key_id.to_string()).or_insert(0);
        if nonce <= *entry {
            return Err(AppError::unauthorized("Invalid or reused nonce"));
        }
        *entry = nonce;
        Ok(())
    }
}

/// Hex HMAC-SHA256 of `"{nonce}{METHOD}{path}"`
pub fn sign_request(secret: &str, nonce: u64, method: &Method, path: &str) -> Result<String, InvalidLength> {
    let mac = request_mac(secret, nonce, method, path)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn request_mac(secret: &str, nonce: u64, method: &Method, path: &str) -> Result<HmacSha256, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(format!("{nonce}{}{path}", method.as_str()).as_bytes());
    Ok(mac)
}

fn verify_signature(secret: &str, nonce: u64, method: &Method, path: &str, signature: &str) -> bool {
    let (Ok(bytes), Ok(mac)) = (hex::decode(signature), request_mac(secret, nonce, method, path)) else {
        return false;
    };
    mac.verify_slice(&bytes).is_ok()
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
    /// KYC level asserted by the token; the KYC service's record wins
    pub kyc_claim: KycLevel,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = if let Some(auth_header) = parts.headers.get(AUTHORIZATION) {
            let auth_str = auth_header
                .to_str()
                .map_err(|_| AppError::unauthorized("Invalid authorization header"))?;
            let token = auth_str
                .strip_prefix("Bearer ")
                .ok_or_else(|| AppError::unauthorized("Expected a Bearer token"))?;
            from_jwt(token, &state.config.jwt_secret)?
        } else if parts.headers.contains_key(API_KEY_HEADER) {
            from_api_key(parts, state)?
        } else {
            return Err(AppError::unauthorized("Missing authentication credentials"));
        };

        // A migrated user's old tokens still name the previous tenant
        let current = state.platform.tenants.resolve(&user.user_id, &user.tenant_id);
        if current != user.tenant_id {
            tracing::warn!(user_id = %user.user_id, claimed = %user.tenant_id, current = %current, "stale tenant claim");
            return Err(AppError::Unauthorized {
                code: "STALE_TENANT",
                message: "Tenant membership changed, please re-authenticate".to_string(),
            });
        }
        Ok(user)
    }
}

fn from_jwt(token: &str, secret: &str) -> Result<AuthenticatedUser, AppError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "jwt rejected");
        AppError::unauthorized("Invalid or expired token")
    })?;
    let claims = token_data.claims;
    let kyc_claim = KycLevel::new(claims.kyc_level).ok_or_else(|| AppError::unauthorized("Invalid KYC claim"))?;
    Ok(AuthenticatedUser {
        user_id: claims.sub,
        tenant_id: claims.tenant_id,
        role: claims.role,
        kyc_claim,
    })
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::unauthorized(format!("Missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::unauthorized(format!("Invalid {name} header")))
}

fn from_api_key(parts: &Parts, state: &AppState) -> Result<AuthenticatedUser, AppError> {
    let key_id = header(parts, API_KEY_HEADER)?;
    let signature = header(parts, SIGNATURE_HEADER)?;
    let nonce: u64 = header(parts, NONCE_HEADER)?
        .parse()
        .map_err(|_| AppError::unauthorized("Nonce must be an integer"))?;

    let key = state
        .config
        .api_keys
        .get(key_id)
        .ok_or_else(|| AppError::unauthorized("Unknown API key"))?;

    // Nested routers strip their prefix from `parts.uri`
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    if !verify_signature(&key.secret, nonce, &parts.method, &path, signature) {
        return Err(AppError::unauthorized("Invalid signature"));
    }
    // Only a correctly signed request may advance the nonce
    state.nonces.validate_and_update(&key.key_id, nonce)?;

    Ok(AuthenticatedUser {
        user_id: key.user_id,
        tenant_id: key.tenant_id.clone(),
        role: key.role,
        kyc_claim: KycLevel::NONE,
    })
}

impl AuthenticatedUser {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role == Role::SuperAdmin || roles.contains(&self.role)
    }

    pub fn require_any_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if self.has_any_role(roles) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("Role {} may not perform this action", self.role)))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_platform_admin()
    }

    /// `None` lets platform admins see every tenant
    pub fn tenant_scope(&self) -> Option<&TenantId> {
        if self.is_admin() { None } else { Some(&self.tenant_id) }
    }

    /// Whether the caller may act on data owned by `owner`
    pub fn may_act_for(&self, state: &AppState, owner: &UserId) -> bool {
        if *owner == self.user_id || self.is_admin() {
            return true;
        }
        self.role == Role::Broker && state.platform.tenants.tenant_of(owner).as_ref() == Some(&self.tenant_id)
    }

    /// Resolves the user a request acts for (defaults to the caller)
    pub fn subject(&self, state: &AppState, requested: Option<UserId>) -> Result<UserId, AppError> {
        let target = requested.unwrap_or(self.user_id);
        if self.may_act_for(state, &target) {
            Ok(target)
        } else {
            Err(AppError::forbidden("Cannot act on behalf of this user"))
        }
    }

    pub fn authorize_owner(&self, state: &AppState, owner: &UserId) -> Result<(), AppError> {
        if self.may_act_for(state, owner) {
            Ok(())
        } else {
            Err(AppError::forbidden("Resource belongs to another user"))
        }
    }

    /// Owner or platform admin only (no broker delegation)
    pub fn authorize_owner_or_admin(&self, owner: &UserId) -> Result<(), AppError> {
        if *owner == self.user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Resource belongs to another user"))
        }
    }

    /// Tenant-scoped resources are visible to their tenant and to admins
    pub fn authorize_tenant(&self, tenant: &TenantId) -> Result<(), AppError> {
        match self.tenant_scope() {
            Some(scope) if scope != tenant => Err(AppError::forbidden("Resource belongs to another tenant")),
            _ => Ok(()),
        }
    }
}

/// Fails with 403 KYC_REQUIRED below `level`
pub async fn require_kyc(state: &AppState, user: &AuthenticatedUser, level: KycLevel) -> Result<(), AppError> {
    let effective = state.platform.kyc.level(&user.user_id).await.unwrap_or(user.kyc_claim);
    if effective >= level {
        Ok(())
    } else {
        Err(AppError::Forbidden {
            code: "KYC_REQUIRED",
            message: format!("KYC level {} required, current level {}", level.value(), effective.value()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_must_increase() {
        let store = NonceStore::new();
        assert!(store.validate_and_update("k1", 5).is_ok());
        assert!(store.validate_and_update("k1", 5).is_err());
        assert!(store.validate_and_update("k1", 4).is_err());
        assert!(store.validate_and_update("k1", 6).is_ok());
        assert!(store.validate_and_update("k2", 1).is_ok());
    }

    #[test]
    fn test_signature_round_trip() {
        let sig = sign_request("s3cr3t", 7, &Method::POST, "/api/v1/exchange/orders").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify_signature("s3cr3t", 7, &Method::POST, "/api/v1/exchange/orders", &sig));
        assert!(!verify_signature("s3cr3t", 8, &Method::POST, "/api/v1/exchange/orders", &sig));
        assert!(!verify_signature("other", 7, &Method::POST, "/api/v1/exchange/orders", &sig));
        assert!(!verify_signature("s3cr3t", 7, &Method::GET, "/api/v1/exchange/orders", &sig));
        assert!(!verify_signature("s3cr3t", 7, &Method::POST, "/api/v1/exchange/orders", "zz"));
    }

    #[test]
    fn test_jwt_round_trip_and_expiry() {
        let user = UserId::new();
        let mut claims = Claims {
            sub: user,
            tenant_id: TenantId::try_new("acme").unwrap(),
            role: Role::Broker,
            kyc_level: 2,
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        let token = claims.sign("secret").unwrap();
        let authed = from_jwt(&token, "secret").unwrap();
        assert_eq!(authed.user_id, user);
        assert_eq!(authed.role, Role::Broker);
        assert_eq!(authed.kyc_claim, KycLevel::VERIFIED);

        assert!(from_jwt(&token, "wrong").is_err());

        claims.exp = (chrono::Utc::now().timestamp() - 3600) as usize;
        let expired = claims.sign("secret").unwrap();
        assert!(from_jwt(&expired, "secret").is_err());
    }

    #[test]
    fn test_role_checks() {
        let mut user = AuthenticatedUser {
            user_id: UserId::new(),
            tenant_id: TenantId::try_new("acme").unwrap(),
            role: Role::Compliance,
            kyc_claim: KycLevel::NONE,
        };
        assert!(user.require_any_role(&[Role::Compliance, Role::Admin]).is_ok());
        assert!(user.require_any_role(&[Role::Admin]).is_err());
        assert!(user.tenant_scope().is_some());

        user.role = Role::SuperAdmin;
        assert!(user.require_any_role(&[Role::Security]).is_ok());
        assert!(user.tenant_scope().is_none());
    }
}
