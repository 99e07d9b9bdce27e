pub mod batch_scraper;
pub mod cached_scrape;
pub mod contact_locator;
pub mod email_extractor;
pub mod email_verifier;
pub mod identity_pool;
pub mod metadata_extractor;
pub mod page_fetcher;
pub mod render_fallback;
pub mod site_scraper;

pub use batch_scraper::*;
pub use cached_scrape::*;
pub use contact_locator::*;
pub use email_extractor::*;
pub use email_verifier::*;
pub use identity_pool::*;
pub use metadata_extractor::*;
pub use page_fetcher::*;
pub use render_fallback::*;
pub use site_scraper::*;
