use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ScrapeResult;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record {0} not found")]
    RecordNotFound(Uuid),
}

/// A scrape result and when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedScrape {
    pub result: ScrapeResult,
    pub captured_at: DateTime<Utc>,
}

impl CachedScrape {
    pub fn new(result: ScrapeResult, captured_at: DateTime<Utc>) -> Self {
        CachedScrape {
            result,
            captured_at,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        now.signed_duration_since(self.captured_at) < validity
    }
}

/// Latest scrape per domain. Freshness is the caller's call.
#[async_trait]
pub trait DomainCache: Send + Sync {
    async fn get(&self, domain: &str) -> Result<Option<CachedScrape>, StoreError>;
    async fn put(&self, domain: &str, entry: CachedScrape) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryDomainCache {
    entries: RwLock<HashMap<String, CachedScrape>>,
}

impl InMemoryDomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl DomainCache for InMemoryDomainCache {
    async fn get(&self, domain: &str) -> Result<Option<CachedScrape>, StoreError> {
        Ok(self.entries.read().await.get(&domain.to_lowercase()).cloned())
    }

    async fn put(&self, domain: &str, entry: CachedScrape) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(domain.to_lowercase(), entry);
        Ok(())
    }
}
