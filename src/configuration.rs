use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub scraper: ScraperSettings,
    #[serde(default)]
    pub fetcher: FetcherSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Options a caller hands to the batch runner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_concurrency: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub delay_seconds: f64,
    pub check_routing: bool,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            delay_seconds: 0.5,
            check_routing: true,
        }
    }
}

impl ScraperSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_seconds.max(0.0))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub request_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub probe_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_block_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub backoff_base_millis: u64,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            probe_timeout_secs: 5,
            max_block_retries: 3,
            backoff_base_millis: 1_000,
        }
    }
}

impl FetcherSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Pause before retry number `retry` (0-based): base, 2*base, 4*base, ...
    pub fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_base_millis.saturating_mul(1 << retry.min(16)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    // http://localhost:9515 for a local chromedriver
    pub webdriver_url: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub settle_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub viewport_width: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub viewport_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            settle_millis: 3_000,
            viewport_width: 1366,
            viewport_height: 768,
        }
    }
}

impl BrowserSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub validity_days: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { validity_days: 90 }
    }
}

impl CacheSettings {
    pub fn validity(&self) -> chrono::Duration {
        chrono::Duration::days(self.validity_days)
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(false))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename)).required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
