//! Types library for the platform
//!
//! Shared type definitions used by the gateway and every backing service,
//! so that request bodies, service results and engine state agree on one
//! vocabulary.
//!
//! # Modules
//! - `ids`: Unique identifiers (UUID v7 newtypes, TenantId, MarketId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `auth`: Roles and KYC levels
//! - `order` / `trade` / `market`: Spot exchange types
//! - `margin`: Margin accounts and leveraged positions
//! - `dex`: AMM pools, swaps, liquidity positions
//! - `kyc`: Identity verification submissions
//! - `token_sale`: Presale phases, investments, vesting
//! - `security`: Security events, incidents, risk assessments
//! - `wallet`: Linked Web3 wallets and ownership challenges
//! - `fee`: Native CEX fee tiers and THAL accounts
//! - `migration`: Tenant migration runs
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod auth;
pub mod order;
pub mod trade;
pub mod market;
pub mod margin;
pub mod dex;
pub mod kyc;
pub mod token_sale;
pub mod security;
pub mod wallet;
pub mod fee;
pub mod migration;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::*;
    pub use crate::dex::*;
    pub use crate::errors::*;
    pub use crate::fee::*;
    pub use crate::ids::*;
    pub use crate::kyc::*;
    pub use crate::margin::*;
    pub use crate::market::*;
    pub use crate::migration::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::security::*;
    pub use crate::token_sale::*;
    pub use crate::trade::*;
    pub use crate::wallet::*;
}
