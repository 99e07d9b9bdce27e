use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metadata::BusinessMetadata;
use super::website::{extract_domain, normalize_url};

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRequest {
    pub url: String,
    pub record_id: Option<Uuid>,
}

impl ScrapeRequest {
    /// Always carries a scheme; falls back to the trimmed input when it does not
    /// parse so the failure is reported against what the caller sent.
    pub fn new(url: &str, record_id: Option<Uuid>) -> Self {
        let url = normalize_url(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.trim().to_string());

        ScrapeRequest { url, record_id }
    }
}

/// Terminal failure classes carried in [`ScrapeResult::error`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScrapeFailure {
    #[error("No emails found")]
    NoEmailsFound,
    #[error("No valid emails found")]
    NoValidEmails,
    #[error("Timeout")]
    Timeout,
    #[error("Request error: {0}")]
    Request(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    pub url: String,
    pub domain: String,
    pub email: Option<String>,
    pub all_emails: Vec<String>,
    pub verified: bool,
    pub is_personal: bool,
    pub scraped_from: Option<String>,
    pub metadata: BusinessMetadata,
    pub error: Option<String>,
}

impl ScrapeResult {
    pub fn found(
        url: &str,
        email: String,
        all_emails: Vec<String>,
        verified: bool,
        is_personal: bool,
        scraped_from: String,
        metadata: BusinessMetadata,
    ) -> Self {
        ScrapeResult {
            success: true,
            url: url.to_string(),
            domain: extract_domain(url),
            email: Some(email),
            all_emails,
            verified,
            is_personal,
            scraped_from: Some(scraped_from),
            metadata,
            error: None,
        }
    }

    pub fn failure(url: &str, failure: ScrapeFailure) -> Self {
        ScrapeResult {
            success: false,
            url: url.to_string(),
            domain: extract_domain(url),
            email: None,
            all_emails: vec![],
            verified: false,
            is_personal: false,
            scraped_from: None,
            metadata: BusinessMetadata::default(),
            error: Some(failure.to_string()),
        }
    }

    /// Failure that still reports what was mined, e.g. candidates that all failed
    /// verification.
    pub fn failure_with_findings(
        url: &str,
        failure: ScrapeFailure,
        all_emails: Vec<String>,
        scraped_from: Option<String>,
        metadata: BusinessMetadata,
    ) -> Self {
        ScrapeResult {
            all_emails,
            scraped_from,
            metadata,
            ..ScrapeResult::failure(url, failure)
        }
    }
}
