//! Platform services behind the gateway routers
//!
//! Each domain is an `async_trait` service with an in-memory
//! implementation. [`Platform`] bundles them as trait objects so the
//! gateway can hold one value in its state and tests can swap pieces.

pub mod clock;
pub mod dex;
pub mod error;
pub mod exchange;
pub mod graphsense;
pub mod idempotency;
pub mod kyc;
pub mod margin;
pub mod migration;
pub mod native_cex;
pub mod security;
pub mod tenancy;
pub mod token_sale;
pub mod wallet;

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, PlatformError, PlatformResult};

use dex::{DexService, InMemoryDex};
use exchange::{ExchangeService, InMemoryExchange};
use graphsense::{GraphSenseConfig, GraphSenseService, HttpGraphSense, InMemoryGraphSense};
use idempotency::{IdempotencyService, InMemoryIdempotency};
use kyc::{InMemoryKyc, KycService};
use margin::{InMemoryMargin, MarginService};
use migration::{InMemoryMigrations, MigrationService};
use native_cex::{InMemoryNativeCex, NativeCexService};
use security::{InMemorySecurityOversight, SecurityOversightService};
use tenancy::TenantDirectory;
use token_sale::{InMemoryTokenSale, TokenSaleService};
use wallet::{InMemoryWallets, WalletService};

#[derive(Debug, Clone)]
pub struct PlatformOptions {
    /// Quote (USDT) per THAL
    pub thal_reference_price: Decimal,
    pub idempotency_ttl: Duration,
    /// Uses the HTTP client when set, the in-memory tag set otherwise
    pub graphsense: Option<GraphSenseConfig>,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        Self {
            thal_reference_price: dec!(0.05),
            idempotency_ttl: Duration::hours(24),
            graphsense: None,
        }
    }
}

#[derive(Clone)]
pub struct Platform {
    pub exchange: Arc<dyn ExchangeService>,
    pub margin: Arc<dyn MarginService>,
    pub dex: Arc<dyn DexService>,
    pub kyc: Arc<dyn KycService>,
    pub token_sale: Arc<dyn TokenSaleService>,
    pub security: Arc<dyn SecurityOversightService>,
    pub wallets: Arc<dyn WalletService>,
    pub cex: Arc<dyn NativeCexService>,
    pub graphsense: Arc<dyn GraphSenseService>,
    pub tenants: Arc<TenantDirectory>,
    pub migrations: Arc<dyn MigrationService>,
    pub idempotency: Arc<dyn IdempotencyService>,
    pub clock: Arc<dyn Clock>,
}

impl Platform {
    pub fn in_memory(options: PlatformOptions, clock: Arc<dyn Clock>) -> PlatformResult<Self> {
        let exchange: Arc<dyn ExchangeService> = Arc::new(InMemoryExchange::with_default_markets(clock.clone()));
        let tenants = Arc::new(TenantDirectory::new());

        let graphsense: Arc<dyn GraphSenseService> = match options.graphsense {
            Some(config) => {
                info!(base_url = %config.base_url, "graphsense upstream enabled");
                Arc::new(HttpGraphSense::new(config, clock.clone())?)
            }
            None => Arc::new(InMemoryGraphSense::new(clock.clone())),
        };

        Ok(Self {
            margin: Arc::new(InMemoryMargin::new(clock.clone())),
            dex: Arc::new(InMemoryDex::new(clock.clone())),
            kyc: Arc::new(InMemoryKyc::new(clock.clone())),
            token_sale: Arc::new(InMemoryTokenSale::new(clock.clone())),
            security: Arc::new(InMemorySecurityOversight::new(clock.clone())),
            wallets: Arc::new(InMemoryWallets::new(clock.clone())),
            cex: Arc::new(InMemoryNativeCex::new(
                exchange.clone(),
                options.thal_reference_price,
                clock.clone(),
            )?),
            graphsense,
            migrations: Arc::new(InMemoryMigrations::new(tenants.clone(), clock.clone())),
            idempotency: Arc::new(InMemoryIdempotency::new(options.idempotency_ttl, clock.clone())),
            exchange,
            tenants,
            clock,
        })
    }
}
