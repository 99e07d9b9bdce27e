use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    dal::{CachedScrape, DomainCache, RecordStore, StoreError},
    domain::{extract_domain, website_key, ScrapeFailure, ScrapeRequest, ScrapeResult},
};

use super::SiteScraper;

/// `email_source` written on records updated from a scrape.
pub const RECORD_SOURCE: &str = "impressum_crawler";

/// Serves a cached result younger than `validity` without touching the network,
/// otherwise scrapes and refreshes the cache. Transport failures are not cached.
pub async fn scrape_with_cache<S>(
    cache: &dyn DomainCache,
    scraper: &S,
    url: &str,
    now: DateTime<Utc>,
    validity: Duration,
) -> ScrapeResult
where
    S: SiteScraper + ?Sized,
{
    let domain = extract_domain(url);

    match cache.get(&domain).await {
        Ok(Some(entry)) if entry.is_fresh(now, validity) => {
            log::info!(
                "Using cached result for {} from {}",
                domain,
                entry.captured_at
            );
            return entry.result;
        }
        Ok(Some(entry)) => log::info!(
            "Cached result for {} from {} expired",
            domain,
            entry.captured_at
        ),
        Ok(None) => {}
        Err(e) => log::warn!("Domain cache lookup for {} failed: {}", domain, e),
    }

    let result = scraper.scrape_website(url).await;

    if is_cacheable(&result) {
        if let Err(e) = cache
            .put(&domain, CachedScrape::new(result.clone(), now))
            .await
        {
            log::warn!("Could not cache result for {}: {}", domain, e);
        }
    }
    result
}

/// A [`SiteScraper`] that goes through the domain cache first, so repeated domains
/// in a batch (or a long lived process) are scraped once per validity window.
pub struct CachedScraper<S: ?Sized> {
    inner: Arc<S>,
    cache: Arc<dyn DomainCache>,
    validity: Duration,
}

impl<S: SiteScraper + ?Sized> CachedScraper<S> {
    pub fn new(inner: Arc<S>, cache: Arc<dyn DomainCache>, validity: Duration) -> Self {
        CachedScraper {
            inner,
            cache,
            validity,
        }
    }
}

#[async_trait]
impl<S: SiteScraper + ?Sized> SiteScraper for CachedScraper<S> {
    async fn scrape_website(&self, url: &str) -> ScrapeResult {
        scrape_with_cache(
            self.cache.as_ref(),
            self.inner.as_ref(),
            url,
            Utc::now(),
            self.validity,
        )
        .await
    }
}

/// Successes and "nothing to find" outcomes are worth remembering; timeouts and
/// request errors are not.
fn is_cacheable(result: &ScrapeResult) -> bool {
    result.success
        || [ScrapeFailure::NoEmailsFound, ScrapeFailure::NoValidEmails]
            .iter()
            .any(|failure| result.error.as_deref() == Some(failure.to_string().as_str()))
}

/// Writes a found email to the request's record, or to every record of the same
/// website when the request carries no id. Returns how many records were updated.
pub async fn apply_to_records(
    store: &dyn RecordStore,
    request: &ScrapeRequest,
    result: &ScrapeResult,
) -> Result<usize, StoreError> {
    let Some(email) = result.email.as_deref().filter(|_| result.success) else {
        return Ok(0);
    };

    let record_ids = match request.record_id {
        Some(record_id) => vec![record_id],
        None => store.records_for_website(&website_key(&request.url)).await?,
    };

    for record_id in &record_ids {
        store
            .update_email(*record_id, email, RECORD_SOURCE, result.verified)
            .await?;
    }

    log::info!(
        "Updated {} record(s) with {} for {}",
        record_ids.len(),
        email,
        request.url
    );
    Ok(record_ids.len())
}
