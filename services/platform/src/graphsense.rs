//! Address intelligence and risk screening backed by GraphSense
//!
//! [`HttpGraphSense`] talks to a GraphSense REST deployment.
//! [`InMemoryGraphSense`] answers from a locally seeded tag set.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::security::RiskLevel;

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const EXTRA_TAG_POINTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTag {
    pub label: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub abuse: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    #[serde(default)]
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStats {
    #[serde(default)]
    pub balance: Value,
    #[serde(default)]
    pub total_received: Value,
    #[serde(default)]
    pub total_spent: Value,
    #[serde(default)]
    pub no_incoming_txs: u64,
    #[serde(default)]
    pub no_outgoing_txs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub currency: String,
    pub address: String,
    /// False when the upstream has never seen the address
    pub known: bool,
    pub stats: Option<AddressStats>,
    pub tags: Vec<AddressTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningResult {
    pub currency: String,
    pub address: String,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub categories: Vec<String>,
    pub tags: Vec<AddressTag>,
    pub screened_at: DateTime<Utc>,
}

#[async_trait]
pub trait GraphSenseService: Send + Sync {
    async fn address(&self, currency: &str, address: &str) -> PlatformResult<AddressInfo>;

    async fn screen(&self, currency: &str, address: &str) -> PlatformResult<ScreeningResult>;
}

pub fn category_weight(category: &str) -> u32 {
    match category {
        "sanctioned" | "sanctions" => 100,
        "darknet" | "darkweb" | "ransomware" => 80,
        "mixer" | "mixing_service" | "coinjoin" => 60,
        "gambling" => 20,
        _ => 0,
    }
}

/// Highest category weight plus [`EXTRA_TAG_POINTS`] per further risky tag
pub fn score_tags(tags: &[AddressTag]) -> (u8, Vec<String>) {
    let mut categories: Vec<String> = Vec::new();
    let mut weights: Vec<u32> = Vec::new();
    for tag in tags {
        let tag_weight = [tag.category.as_deref(), tag.abuse.as_deref()]
            .into_iter()
            .flatten()
            .map(|c| {
                let c = c.trim().to_ascii_lowercase();
                let w = category_weight(&c);
                if !categories.contains(&c) {
                    categories.push(c);
                }
                w
            })
            .max()
            .unwrap_or(0);
        if tag_weight > 0 {
            weights.push(tag_weight);
        }
    }
    let Some(max) = weights.iter().copied().max() else {
        return (0, categories);
    };
    let extra = (weights.len() as u32 - 1) * EXTRA_TAG_POINTS;
    ((max + extra).min(100) as u8, categories)
}

fn validate_lookup(currency: &str, address: &str) -> PlatformResult<String> {
    let currency = currency.trim().to_ascii_lowercase();
    if !(2..=10).contains(&currency.len()) || !currency.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PlatformError::validation("currency: expected 2-10 alphanumeric characters"));
    }
    if address.is_empty() || address.len() > 128 || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PlatformError::validation("address: expected up to 128 alphanumeric characters"));
    }
    Ok(currency)
}

fn screening(info: AddressInfo, now: DateTime<Utc>) -> ScreeningResult {
    let (risk_score, categories) = score_tags(&info.tags);
    ScreeningResult {
        currency: info.currency,
        address: info.address,
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        categories,
        tags: info.tags,
        screened_at: now,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSenseConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    address_tags: Vec<AddressTag>,
}

pub struct HttpGraphSense {
    client: Client,
    config: GraphSenseConfig,
    clock: Arc<dyn Clock>,
}

impl HttpGraphSense {
    pub fn new(config: GraphSenseConfig, clock: Arc<dyn Clock>) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PlatformError::Internal(format!("graphsense client: {e}")))?;
        Ok(Self {
            client,
            config: GraphSenseConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key,
            },
            clock,
        })
    }

    /// `Ok(None)` on 404
    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> PlatformResult<Option<T>> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(%url, "graphsense request");
        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "graphsense unreachable");
                PlatformError::Unavailable(format!("graphsense request failed: {e}"))
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| PlatformError::Unavailable(format!("graphsense response: {e}"))),
            status => {
                warn!(%status, "graphsense error status");
                Err(PlatformError::Unavailable(format!("graphsense returned {status}")))
            }
        }
    }
}

#[async_trait]
impl GraphSenseService for HttpGraphSense {
    async fn address(&self, currency: &str, address: &str) -> PlatformResult<AddressInfo> {
        let currency = validate_lookup(currency, address)?;
        let path = format!("/{currency}/addresses/{address}");
        let stats: Option<AddressStats> = self.get(&path).await?;
        let tags = match stats {
            Some(_) => self
                .get::<TagPage>(&format!("{path}/tags"))
                .await?
                .map(|p| p.address_tags)
                .unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(AddressInfo {
            currency,
            address: address.to_string(),
            known: stats.is_some(),
            stats,
            tags,
        })
    }

    async fn screen(&self, currency: &str, address: &str) -> PlatformResult<ScreeningResult> {
        let info = self.address(currency, address).await?;
        Ok(screening(info, self.clock.now()))
    }
}

/// Tag set keyed by `(currency, address)`
pub struct InMemoryGraphSense {
    tags: DashMap<(String, String), Vec<AddressTag>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryGraphSense {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tags: DashMap::new(),
            clock,
        }
    }

    pub fn insert(&self, currency: &str, address: &str, tag: AddressTag) {
        self.tags
            .entry((currency.to_ascii_lowercase(), address.to_string()))
            .or_default()
            .push(tag);
    }
}

#[async_trait]
impl GraphSenseService for InMemoryGraphSense {
    async fn address(&self, currency: &str, address: &str) -> PlatformResult<AddressInfo> {
        let currency = validate_lookup(currency, address)?;
        let tags = self
            .tags
            .get(&(currency.clone(), address.to_string()))
            .map(|t| t.value().clone());
        Ok(AddressInfo {
            currency,
            address: address.to_string(),
            known: tags.is_some(),
            stats: None,
            tags: tags.unwrap_or_default(),
        })
    }

    async fn screen(&self, currency: &str, address: &str) -> PlatformResult<ScreeningResult> {
        let info = self.address(currency, address).await?;
        Ok(screening(info, self.clock.now()))
    }
}
