#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use impressum_scout::{
    configuration::FetcherSettings,
    services::{EmailVerifier, IdentityPool, MailRouting, PageFetcher, Renderer, Scraper},
};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Same policy as production with pauses short enough for tests.
pub fn fast_settings() -> FetcherSettings {
    FetcherSettings {
        request_timeout_secs: 2,
        probe_timeout_secs: 1,
        max_block_retries: 3,
        backoff_base_millis: 10,
    }
}

pub fn test_identities() -> IdentityPool {
    IdentityPool::from_agents(
        (1..=4)
            .map(|i| format!("Mozilla/5.0 (impressum-scout test agent {})", i))
            .collect(),
    )
}

pub fn fetcher_with(settings: FetcherSettings) -> Arc<PageFetcher> {
    Arc::new(PageFetcher::with_identities(settings, test_identities()).unwrap())
}

pub fn fetcher() -> Arc<PageFetcher> {
    fetcher_with(fast_settings())
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Serves `body` for GET requests on `url_path`.
pub async fn mount_page(server: &MockServer, url_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Answers HEAD probes on `url_path` with 200.
pub async fn mount_probe(server: &MockServer, url_path: &str) {
    Mock::given(method("HEAD"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

pub fn base_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).unwrap()
}

/// MX lookups without DNS.
pub struct StaticRouting(pub bool);

#[async_trait]
impl MailRouting for StaticRouting {
    async fn has_mx_records(&self, _email: &str) -> bool {
        self.0
    }
}

/// Render fallback that hands back canned HTML and counts invocations.
pub struct CannedRenderer {
    pub html: Option<String>,
    pub calls: AtomicUsize,
}

impl CannedRenderer {
    pub fn new(html: Option<&str>) -> Arc<Self> {
        Arc::new(CannedRenderer {
            html: html.map(str::to_string),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for CannedRenderer {
    async fn render(&self, _url: &Url) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.html.clone()
    }
}

pub fn scraper(renderer: Option<Arc<dyn Renderer>>, mx_answer: bool) -> Scraper {
    scraper_with(fetcher(), renderer, mx_answer)
}

pub fn scraper_with(
    fetcher: Arc<PageFetcher>,
    renderer: Option<Arc<dyn Renderer>>,
    mx_answer: bool,
) -> Scraper {
    Scraper::new(
        fetcher,
        EmailVerifier::new(Arc::new(StaticRouting(mx_answer))),
        renderer,
        true,
    )
}

pub fn slow_response(delay: Duration) -> ResponseTemplate {
    html("<html><body>too late</body></html>").set_delay(delay)
}
