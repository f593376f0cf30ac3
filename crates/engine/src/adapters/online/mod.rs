// Online pinning adapter: trust server fetch, cache, envelope and manifest checks.

mod constants;
mod fetch;
#[cfg(feature = "http-fetch")]
mod runtime;
mod store;
mod url_validation;

pub use constants::{CACHE_FILE_EXTENSION, CONNECT_TIMEOUT_SECS};
#[cfg(feature = "http-fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{default_fetcher, ManifestFetcher};
#[cfg(feature = "http-fetch")]
pub use runtime::run_on_current_thread;
pub use store::*;
pub use url_validation::*;
