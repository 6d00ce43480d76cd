//! Roles and KYC levels carried in authentication claims

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    /// Acts on behalf of users inside its own tenant
    Broker,
    Compliance,
    Security,
    Admin,
    /// Passes every role check
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Broker => "broker",
            Role::Compliance => "compliance",
            Role::Security => "security",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "broker" => Some(Role::Broker),
            "compliance" => Some(Role::Compliance),
            "security" => Some(Role::Security),
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    /// Admins see across tenants
    pub fn is_platform_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// KYC verification level (0 = unverified, 3 = enhanced due diligence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct KycLevel(u8);

impl KycLevel {
    pub const NONE: KycLevel = KycLevel(0);
    pub const BASIC: KycLevel = KycLevel(1);
    pub const VERIFIED: KycLevel = KycLevel(2);
    pub const ENHANCED: KycLevel = KycLevel(3);

    pub fn new(level: u8) -> Option<Self> {
        (level <= 3).then_some(Self(level))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for KycLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("KYC level must be 0..=3, got {value}"))
    }
}

impl From<KycLevel> for u8 {
    fn from(value: KycLevel) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::User,
            Role::Broker,
            Role::Compliance,
            Role::Security,
            Role::Admin,
            Role::SuperAdmin,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn test_kyc_level_bounds() {
        assert!(KycLevel::new(3).is_some());
        assert!(KycLevel::new(4).is_none());
        assert!(KycLevel::VERIFIED > KycLevel::BASIC);
        assert!(serde_json::from_str::<KycLevel>("7").is_err());
    }
}
