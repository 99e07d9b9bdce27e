use std::error::Error as StdError;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client, StatusCode,
};
use url::Url;

use crate::{
    configuration::FetcherSettings,
    domain::{downgrade_to_http, normalize_url},
};

use super::IdentityPool;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("TLS failure: {0}")]
    Tls(String),
    #[error("blocked with HTTP {status} after {attempts} attempts")]
    Blocked { status: u16, attempts: u32 },
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("{0}")]
    Request(String),
}

impl FetchError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, FetchError::Blocked { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: Url,
    pub html: String,
}

pub struct PageFetcher {
    client: Client,
    identities: IdentityPool,
    settings: FetcherSettings,
}

impl PageFetcher {
    pub fn new(settings: FetcherSettings) -> Result<Self, FetchError> {
        PageFetcher::with_identities(settings, IdentityPool::new())
    }

    pub fn with_identities(
        settings: FetcherSettings,
        identities: IdentityPool,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(PageFetcher {
            client,
            identities,
            settings,
        })
    }

    /// GETs a page. Missing schemes become `https`; a certificate failure is retried
    /// once over plain `http`.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let url = normalize_url(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        self.fetch_url(&url).await
    }

    pub async fn fetch_url(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        match self.fetch_with_backoff(url).await {
            Err(FetchError::Tls(reason)) => match downgrade_to_http(url) {
                Some(http_url) => {
                    log::warn!("TLS failure on {} ({}), retrying over http", url, reason);
                    self.fetch_with_backoff(&http_url).await
                }
                None => Err(FetchError::Tls(reason)),
            },
            other => other,
        }
    }

    /// 403/429 answers are retried with a fresh identity after an exponential pause.
    /// Any other error status, and timeouts, end the fetch at once.
    async fn fetch_with_backoff(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut retry = 0;

        loop {
            let response = self
                .client
                .get(url.clone())
                .header(USER_AGENT, self.identities.next())
                .timeout(self.settings.request_timeout())
                .send()
                .await
                .map_err(classify_error)?;

            let status = response.status();
            if is_block_signal(status) {
                if retry >= self.settings.max_block_retries {
                    log::warn!("Giving up on {} after {} blocked attempts", url, retry + 1);
                    return Err(FetchError::Blocked {
                        status: status.as_u16(),
                        attempts: retry + 1,
                    });
                }

                let pause = self.settings.backoff(retry);
                log::info!(
                    "{} answered {} (attempt {}), retrying in {:?} with a new identity",
                    url,
                    status,
                    retry + 1,
                    pause
                );
                tokio::time::sleep(pause).await;
                retry += 1;
                continue;
            }

            if !status.is_success() {
                log::debug!("{} answered {}", url, status);
                return Err(FetchError::Status(status.as_u16()));
            }

            let final_url = response.url().clone();
            let html = response.text().await.map_err(classify_error)?;

            return Ok(FetchedPage {
                url: final_url,
                html,
            });
        }
    }

    /// Lightweight existence probe (HEAD, short timeout, no retries).
    pub async fn exists(&self, url: &Url) -> bool {
        match self
            .client
            .head(url.clone())
            .header(USER_AGENT, self.identities.next())
            .timeout(self.settings.probe_timeout())
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("Probe of {} failed: {}", url, e);
                false
            }
        }
    }
}

const TLS_FAILURE_MARKERS: &[&str] = &[
    "certificate",
    "tls",
    "ssl",
    "handshake",
    "wrong version number",
    "corrupt message",
];

fn is_block_signal(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.source().is_some_and(is_tls_failure) {
        FetchError::Tls(e.to_string())
    } else {
        FetchError::Request(e.to_string())
    }
}

/// Walks an error chain looking for certificate/handshake failures. Start below
/// the reqwest error itself, whose message embeds the URL.
fn is_tls_failure(e: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = current {
        let message = err.to_string().to_lowercase();
        if TLS_FAILURE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapped(&'static str, Option<Box<Wrapped>>);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.1.as_deref().map(|e| e as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn tls_failure_found_anywhere_in_source_chain() {
        let err = Wrapped(
            "error sending request",
            Some(Box::new(Wrapped(
                "client error (Connect)",
                Some(Box::new(Wrapped("invalid peer certificate: Expired", None))),
            ))),
        );
        assert!(is_tls_failure(&err));

        let err = Wrapped(
            "client error (Connect)",
            Some(Box::new(Wrapped(
                "received corrupt message of type InvalidContentType",
                None,
            ))),
        );
        assert!(is_tls_failure(&err));

        let err = Wrapped("connection refused", None);
        assert!(!is_tls_failure(&err));
    }

    #[test]
    fn block_signals() {
        assert!(is_block_signal(StatusCode::FORBIDDEN));
        assert!(is_block_signal(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_block_signal(StatusCode::NOT_FOUND));
        assert!(!is_block_signal(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
