use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::{
    configuration::Settings,
    domain::{normalize_url, BusinessMetadata, ScrapeFailure, ScrapeRequest, ScrapeResult},
};

use super::{
    extract_emails, extract_metadata, ContactLocator, EmailVerifier, ExtractionMode, FetchError,
    FetchedPage, PageFetcher, RenderFallback, Renderer,
};

/// Everything the pipeline needs to know about one website.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    async fn scrape_website(&self, url: &str) -> ScrapeResult;
}

/// What one page (or pair of pages) yielded before verification.
struct Findings {
    emails: Vec<String>,
    scraped_from: Url,
    metadata: BusinessMetadata,
}

/// Per-URL pipeline: homepage, contact page, extraction, optional rendering,
/// verification of the best candidate.
pub struct Scraper {
    fetcher: Arc<PageFetcher>,
    locator: ContactLocator,
    verifier: EmailVerifier,
    renderer: Option<Arc<dyn Renderer>>,
    check_routing: bool,
}

impl Scraper {
    pub fn new(
        fetcher: Arc<PageFetcher>,
        verifier: EmailVerifier,
        renderer: Option<Arc<dyn Renderer>>,
        check_routing: bool,
    ) -> Self {
        Scraper {
            locator: ContactLocator::new(fetcher.clone()),
            fetcher,
            verifier,
            renderer,
            check_routing,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let fetcher = Arc::new(PageFetcher::new(settings.fetcher.clone())?);
        let renderer = RenderFallback::from_settings(&settings.browser)
            .map(|renderer| Arc::new(renderer) as Arc<dyn Renderer>);

        match renderer {
            Some(_) => log::info!("Render fallback enabled"),
            None => log::info!("No WebDriver configured, render fallback disabled"),
        }

        Ok(Scraper::new(
            fetcher,
            EmailVerifier::default(),
            renderer,
            settings.scraper.check_routing,
        ))
    }

    async fn render(&self, url: &Url) -> Option<String> {
        match &self.renderer {
            Some(renderer) => renderer.render(url).await,
            None => None,
        }
    }

    /// Homepage could not be fetched at all. Rendering is the last resort before
    /// reporting the fetch failure.
    async fn scrape_unfetchable(
        &self,
        request: &ScrapeRequest,
        base_url: &Url,
        error: FetchError,
    ) -> ScrapeResult {
        let failure = match error {
            FetchError::Timeout => ScrapeFailure::Timeout,
            other => ScrapeFailure::Request(other.to_string()),
        };

        let Some(html) = self.render(base_url).await else {
            log::warn!("Giving up on {}: {}", base_url, failure);
            return ScrapeResult::failure(&request.url, failure);
        };

        let findings = Findings {
            emails: extract_emails(&html, ExtractionMode::Rendered),
            scraped_from: base_url.clone(),
            metadata: extract_metadata(&html),
        };
        self.verify_best(request, findings).await
    }

    /// Mines the contact page when there is one, the homepage otherwise. A contact
    /// page without addresses gives the homepage a second chance.
    fn mine_static(
        &self,
        homepage: &FetchedPage,
        contact_page: Option<&FetchedPage>,
    ) -> Findings {
        let home_metadata = extract_metadata(&homepage.html);

        let Some(contact_page) = contact_page else {
            return Findings {
                emails: extract_emails(&homepage.html, ExtractionMode::Static),
                scraped_from: homepage.url.clone(),
                metadata: home_metadata,
            };
        };

        let metadata =
            BusinessMetadata::merge([extract_metadata(&contact_page.html), home_metadata]);
        let emails = extract_emails(&contact_page.html, ExtractionMode::Static);
        if !emails.is_empty() {
            return Findings {
                emails,
                scraped_from: contact_page.url.clone(),
                metadata,
            };
        }

        log::info!(
            "No emails on {}, trying homepage {}",
            contact_page.url,
            homepage.url
        );
        Findings {
            emails: extract_emails(&homepage.html, ExtractionMode::Static),
            scraped_from: homepage.url.clone(),
            metadata,
        }
    }

    async fn verify_best(&self, request: &ScrapeRequest, findings: Findings) -> ScrapeResult {
        let Findings {
            emails,
            scraped_from,
            metadata,
        } = findings;
        let scraped_from = scraped_from.to_string();

        if emails.is_empty() {
            log::info!("No emails found on {}", scraped_from);
            return ScrapeResult::failure_with_findings(
                &request.url,
                ScrapeFailure::NoEmailsFound,
                emails,
                Some(scraped_from),
                metadata,
            );
        }
        log::info!("Found {} email(s) on {}: {:?}", emails.len(), scraped_from, emails);

        let Some(best) = self.verifier.best_of(&emails) else {
            log::info!("All emails from {} failed verification", scraped_from);
            return ScrapeResult::failure_with_findings(
                &request.url,
                ScrapeFailure::NoValidEmails,
                emails,
                Some(scraped_from),
                metadata,
            );
        };

        let verification = self.verifier.verify(&best, self.check_routing).await;
        if !verification.valid {
            log::info!(
                "Best email {} rejected: {}",
                best,
                verification
                    .reason
                    .map(|reason| reason.to_string())
                    .unwrap_or_default()
            );
            return ScrapeResult::failure_with_findings(
                &request.url,
                ScrapeFailure::NoValidEmails,
                emails,
                Some(scraped_from),
                metadata,
            );
        }

        log::info!(
            "Best email for {}: {} (mx verified: {:?})",
            request.url,
            best,
            verification.mx_verified
        );
        ScrapeResult::found(
            &request.url,
            best,
            emails,
            verification.mx_verified.unwrap_or(false),
            verification.is_personal,
            scraped_from,
            metadata,
        )
    }
}

#[async_trait]
impl SiteScraper for Scraper {
    async fn scrape_website(&self, url: &str) -> ScrapeResult {
        let request = ScrapeRequest::new(url, None);
        let base_url = match normalize_url(&request.url) {
            Ok(base_url) => base_url,
            Err(e) => {
                log::warn!("Skipping invalid url {:?}: {}", url, e);
                return ScrapeResult::failure(
                    &request.url,
                    ScrapeFailure::Request(FetchError::InvalidUrl(e.to_string()).to_string()),
                );
            }
        };
        log::info!("Scraping {}", base_url);

        let homepage = match self.fetcher.fetch_url(&base_url).await {
            Ok(homepage) => homepage,
            Err(e) => {
                log::warn!("Fetching homepage {} failed: {}", base_url, e);
                return self.scrape_unfetchable(&request, &base_url, e).await;
            }
        };

        let contact_url = self.locator.locate(&homepage.url, &homepage.html).await;
        let contact_page = match contact_url {
            Some(contact_url) if contact_url != homepage.url => {
                match self.fetcher.fetch_url(&contact_url).await {
                    Ok(page) => Some(page),
                    Err(e) => {
                        log::warn!("Fetching contact page {} failed: {}", contact_url, e);
                        None
                    }
                }
            }
            _ => None,
        };

        let mut findings = self.mine_static(&homepage, contact_page.as_ref());

        if findings.emails.is_empty() {
            let target = contact_page
                .as_ref()
                .map_or(&homepage.url, |page| &page.url)
                .clone();
            if let Some(html) = self.render(&target).await {
                let emails = extract_emails(&html, ExtractionMode::Rendered);
                log::info!("Render of {} yielded {} email(s)", target, emails.len());
                let metadata =
                    BusinessMetadata::merge([findings.metadata, extract_metadata(&html)]);
                findings = Findings {
                    scraped_from: match emails.is_empty() {
                        true => findings.scraped_from,
                        false => target,
                    },
                    emails,
                    metadata,
                };
            }
        }

        self.verify_best(&request, findings).await
    }
}
