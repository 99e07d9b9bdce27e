use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::FutureExt;
use thirtyfour::{ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};
use url::Url;

use crate::configuration::BrowserSettings;

use super::IdentityPool;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("could not start browser session: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("could not capture rendered document: {0}")]
    Capture(String),
}

/// Produces script-rendered HTML for a URL. `None` means nothing usable came back.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url) -> Option<String>;
}

/// One isolated browser instance. `close` must be called exactly once.
#[async_trait]
pub trait BrowserSession: Send {
    async fn load(&mut self, url: &Url, settle: Duration) -> Result<String, RenderError>;
    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, RenderError>;
}

/// Starts headless Chrome sessions on a WebDriver server.
pub struct WebDriverLauncher {
    webdriver_url: String,
    viewport: (u32, u32),
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: String, viewport: (u32, u32)) -> Self {
        WebDriverLauncher {
            webdriver_url,
            viewport,
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, RenderError> {
        let mut caps = DesiredCapabilities::chrome();
        let (width, height) = self.viewport;
        for arg in [
            "--headless=new".to_string(),
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--window-size={},{}", width, height),
            format!("--user-agent={}", user_agent),
        ] {
            caps.add_arg(&arg)
                .map_err(|e| RenderError::Launch(e.to_string()))?;
        }

        let driver = WebDriver::new(self.webdriver_url.as_str(), caps)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        Ok(Box::new(WebDriverSession { driver }))
    }
}

struct WebDriverSession {
    driver: WebDriver,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn load(&mut self, url: &Url, settle: Duration) -> Result<String, RenderError> {
        self.driver
            .goto(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        tokio::time::sleep(settle).await;

        self.driver
            .source()
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.driver.quit().await {
            log::warn!("Failed to quit browser session cleanly: {}", e);
        }
    }
}

/// Fresh browser per call, torn down on every exit path including a panicking
/// load. Sessions are never shared between concurrent renders.
pub struct RenderFallback {
    launcher: Arc<dyn BrowserLauncher>,
    identities: IdentityPool,
    settle: Duration,
}

impl RenderFallback {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        identities: IdentityPool,
        settle: Duration,
    ) -> Self {
        RenderFallback {
            launcher,
            identities,
            settle,
        }
    }

    /// `None` when no WebDriver endpoint is configured.
    pub fn from_settings(settings: &BrowserSettings) -> Option<Self> {
        let webdriver_url = settings.webdriver_url.clone()?;
        let launcher = WebDriverLauncher::new(
            webdriver_url,
            (settings.viewport_width, settings.viewport_height),
        );

        Some(RenderFallback::new(
            Arc::new(launcher),
            IdentityPool::new(),
            settings.settle(),
        ))
    }
}

#[async_trait]
impl Renderer for RenderFallback {
    async fn render(&self, url: &Url) -> Option<String> {
        log::info!("Rendering {} in headless browser", url);

        let mut session = match self.launcher.launch(self.identities.next()).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Render fallback unavailable for {}: {}", url, e);
                return None;
            }
        };

        let outcome = AssertUnwindSafe(session.load(url, self.settle))
            .catch_unwind()
            .await;
        session.close().await;

        match outcome {
            Ok(Ok(html)) => Some(html),
            Ok(Err(e)) => {
                log::warn!("Render of {} failed: {}", url, e);
                None
            }
            Err(_) => {
                log::error!("Render of {} panicked", url);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        live: AtomicUsize,
    }

    struct FakeLauncher {
        counters: Arc<Counters>,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        sequence: usize,
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self, _user_agent: &str) -> Result<Box<dyn BrowserSession>, RenderError> {
            let sequence = self.counters.launched.fetch_add(1, Ordering::SeqCst);
            if sequence % 7 == 6 {
                return Err(RenderError::Launch("chromedriver not reachable".to_string()));
            }
            self.counters.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                counters: self.counters.clone(),
                sequence,
            }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn load(&mut self, url: &Url, _settle: Duration) -> Result<String, RenderError> {
            match self.sequence % 4 {
                0 => Ok(format!("<html><body>{}</body></html>", url)),
                1 => Err(RenderError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string())),
                2 => Err(RenderError::Capture("session deleted".to_string())),
                _ if self.sequence % 10 == 3 => panic!("browser crashed"),
                _ => Ok(String::new()),
            }
        }

        async fn close(self: Box<Self>) {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn fallback(counters: Arc<Counters>) -> RenderFallback {
        RenderFallback::new(
            Arc::new(FakeLauncher { counters }),
            IdentityPool::from_agents(vec!["test-agent".to_string()]),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn no_session_outlives_a_render() {
        let counters = Arc::new(Counters::default());
        let fallback = fallback(counters.clone());
        let url = Url::parse("https://pizzeria-roma.de/").unwrap();

        let mut rendered = 0;
        for _ in 0..100 {
            if fallback.render(&url).await.is_some() {
                rendered += 1;
            }
            assert_eq!(counters.live.load(Ordering::SeqCst), 0);
        }

        assert_eq!(counters.launched.load(Ordering::SeqCst), 100);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
        assert!(rendered > 0);
    }

    #[tokio::test]
    async fn successful_render_returns_document() {
        let counters = Arc::new(Counters::default());
        let fallback = fallback(counters);
        let url = Url::parse("https://pizzeria-roma.de/").unwrap();

        let html = fallback.render(&url).await.unwrap();
        assert!(html.contains("pizzeria-roma.de"));
    }

    #[test]
    fn unavailable_without_webdriver_url() {
        assert!(RenderFallback::from_settings(&BrowserSettings::default()).is_none());
    }
}
