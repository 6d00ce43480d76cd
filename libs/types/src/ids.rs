//! Unique identifier types for platform entities
//!
//! Entity IDs use UUID v7 so they sort by creation time, which keeps
//! listings chronological without a separate sequence column.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::IdError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new id with the current timestamp
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| IdError::InvalidUuid(s.to_string()))
            }
        }
    };
}

uuid_id!(
    /// Platform user (JWT `sub`)
    UserId
);
uuid_id!(OrderId);
uuid_id!(TradeId);
uuid_id!(PositionId);
uuid_id!(PoolId);
uuid_id!(SwapId);
uuid_id!(LiquidityPositionId);
uuid_id!(WalletId);
uuid_id!(
    /// Single-use wallet ownership challenge
    ChallengeId
);
uuid_id!(KycSubmissionId);
uuid_id!(PhaseId);
uuid_id!(InvestmentId);
uuid_id!(EventId);
uuid_id!(IncidentId);
uuid_id!(AssessmentId);
uuid_id!(MigrationId);

const MAX_TENANT_LEN: usize = 64;

/// Tenant (broker) isolation boundary
///
/// Lowercase slug: `[a-z0-9_-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn try_new(slug: impl Into<String>) -> Result<Self, IdError> {
        let s = slug.into();
        let valid = !s.is_empty()
            && s.len() <= MAX_TENANT_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if valid {
            Ok(Self(s))
        } else {
            Err(IdError::InvalidTenant(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Market identifier (trading pair)
///
/// Format: "BASE/QUOTE" (e.g., "BTC/USDT"). URL paths carry the
/// dash form "BTC-USDT", accepted by [`MarketId::from_path`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    /// Try to create a MarketId from "BASE/QUOTE"
    pub fn try_new(symbol: impl Into<String>) -> Result<Self, IdError> {
        let s = symbol.into().to_ascii_uppercase();
        match s.split_once('/') {
            Some((base, quote)) if is_asset(base) && is_asset(quote) && base != quote => Ok(Self(s)),
            _ => Err(IdError::InvalidMarket(s)),
        }
    }

    /// Parse the dash form used in URL paths ("BTC-USDT")
    pub fn from_path(segment: &str) -> Result<Self, IdError> {
        Self::try_new(segment.replacen('-', "/", 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into base and quote assets
    pub fn split(&self) -> (&str, &str) {
        // try_new guarantees exactly one separator
        self.0.split_once('/').unwrap_or((self.0.as_str(), ""))
    }

    pub fn base(&self) -> &str {
        self.split().0
    }

    pub fn quote(&self) -> &str {
        self.split().1
    }
}

fn is_asset(s: &str) -> bool {
    (2..=10).contains(&s.len()) && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

impl TryFrom<String> for MarketId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<MarketId> for String {
    fn from(value: MarketId) -> Self {
        value.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
