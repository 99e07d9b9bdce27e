pub mod domain_cache_db;
pub mod record_db;

pub use domain_cache_db::*;
pub use record_db::*;
