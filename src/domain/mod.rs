pub mod email;
pub mod heuristics;
pub mod metadata;
pub mod scrape_result;
pub mod verification;
pub mod website;

pub use email::*;
pub use metadata::*;
pub use scrape_result::*;
pub use verification::*;
pub use website::*;
