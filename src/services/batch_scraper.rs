use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::{stream, FutureExt, StreamExt};
use tokio::task::JoinError;

use crate::domain::{ScrapeFailure, ScrapeRequest, ScrapeResult};

use super::SiteScraper;

/// Scrapes `urls` on at most `max_concurrency` workers. Exactly one result per
/// input comes back, in completion order; a panicking scrape turns into a failure
/// result instead of taking the batch down.
pub async fn scrape_batch<S>(
    scraper: Arc<S>,
    urls: &[String],
    max_concurrency: usize,
) -> Vec<ScrapeResult>
where
    S: SiteScraper + ?Sized + 'static,
{
    let max_concurrency = max_concurrency.max(1);
    log::info!(
        "Starting batch of {} urls with concurrency {}",
        urls.len(),
        max_concurrency
    );

    let results: Vec<ScrapeResult> = stream::iter(urls.iter().cloned())
        .map(|url| {
            let scraper = scraper.clone();
            async move {
                let task_url = url.clone();
                let task = tokio::spawn(async move { scraper.scrape_website(&task_url).await });
                match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        let reason = describe_join_error(e);
                        log::error!("Scrape of {} aborted: {}", url, reason);
                        unexpected_failure(&url, reason)
                    }
                }
            }
        })
        .buffer_unordered(max_concurrency)
        .collect()
        .await;

    log::info!(
        "Batch finished: {}/{} succeeded",
        results.iter().filter(|result| result.success).count(),
        results.len()
    );
    results
}

/// One URL at a time with `delay` between consecutive scrapes. Results keep the
/// input order.
pub async fn scrape_serial<S>(scraper: &S, urls: &[String], delay: Duration) -> Vec<ScrapeResult>
where
    S: SiteScraper + ?Sized,
{
    let mut results = Vec::with_capacity(urls.len());

    for (index, url) in urls.iter().enumerate() {
        log::info!("[{}/{}] Scraping {}", index + 1, urls.len(), url);

        let result = match AssertUnwindSafe(scraper.scrape_website(url))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::error!("Scrape of {} panicked: {}", url, reason);
                unexpected_failure(url, reason)
            }
        };
        results.push(result);

        if index + 1 < urls.len() {
            tokio::time::sleep(delay).await;
        }
    }

    results
}

fn unexpected_failure(url: &str, reason: String) -> ScrapeResult {
    let request = ScrapeRequest::new(url, None);
    ScrapeResult::failure(&request.url, ScrapeFailure::Unexpected(reason))
}

fn describe_join_error(e: JoinError) -> String {
    match e.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(e) => e.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "task panicked".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::BusinessMetadata;

    #[derive(Default)]
    struct FlakyScraper {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SiteScraper for FlakyScraper {
        async fn scrape_website(&self, url: &str) -> ScrapeResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("broken") {
                panic!("unparseable markup on {}", url);
            }
            ScrapeResult::found(
                url,
                format!("info@{}", url),
                vec![format!("info@{}", url)],
                true,
                false,
                url.to_string(),
                BusinessMetadata::default(),
            )
        }
    }

    fn urls() -> Vec<String> {
        (0..10)
            .map(|i| match i % 3 {
                1 => format!("broken-{}.de", i),
                _ => format!("firm-{}.de", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn every_url_gets_exactly_one_result() {
        let urls = urls();
        let results = scrape_batch(Arc::new(FlakyScraper::default()), &urls, 4).await;

        assert_eq!(results.len(), 10);
        let failures: Vec<&ScrapeResult> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failures.len(), 3);
        for failure in failures {
            let error = failure.error.as_deref().unwrap();
            assert!(error.starts_with("Unexpected error: "), "{}", error);
            assert!(error.contains("unparseable markup"));
            assert!(failure.domain.starts_with("broken-"));
        }
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let scraper = Arc::new(FlakyScraper::default());
        let urls: Vec<String> = (0..12).map(|i| format!("firm-{}.de", i)).collect();

        let results = scrape_batch(scraper.clone(), &urls, 3).await;

        assert_eq!(results.len(), 12);
        assert!(scraper.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn zero_concurrency_still_runs() {
        let urls = vec!["firm.de".to_string()];
        let results = scrape_batch(Arc::new(FlakyScraper::default()), &urls, 0).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
    }

    #[tokio::test]
    async fn serial_keeps_order_and_isolates_panics() {
        let urls = urls();
        let results =
            scrape_serial(&FlakyScraper::default(), &urls, Duration::from_millis(1)).await;

        assert_eq!(results.len(), 10);
        for (url, result) in urls.iter().zip(&results) {
            assert_eq!(result.success, !url.contains("broken"));
            assert!(result.domain.starts_with(url.trim_end_matches(".de")));
        }
    }
}
