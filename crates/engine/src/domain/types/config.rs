use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::online::ManifestFetcher;

/// Centralized defaults for the TrustPin engine.
/// All opinionated defaults should be defined here for consistency.
pub struct EngineDefaults;

impl EngineDefaults {
    // Security defaults
    pub const VALIDATE_HOST_NAME: bool = true; // Chain must be issued for the host
    pub const PIN_ONLY: bool = false; // Pins narrow standard validation, never replace it
    pub const ALLOW_INSECURE_HTTP: bool = false; // Secure default: HTTPS only
    pub const USE_SYSTEM_ROOTS: bool = true; // Platform trust anchors

    // Online pinning
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MANIFEST_MAX_SKEW_SECS: u64 = 600; // Freshness window at acquisition time
    pub const CACHE_DIR_ENV: &'static str = "TRUSTPIN_CACHE_DIR";
    pub const CACHE_DIR_NAME: &'static str = "trustpin";

    /// `$TRUSTPIN_CACHE_DIR`, or a `trustpin` folder in the system temp dir.
    pub fn cache_dir() -> PathBuf {
        std::env::var_os(Self::CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(Self::CACHE_DIR_NAME))
    }
}

/// Parameters of the online pinning directives.
#[derive(Clone)]
pub struct OnlineDirectiveConfig {
    /// Where the signed manifest is downloaded from.
    pub trust_server_url: String,
    /// Certificate (DER or PEM) whose key signed the manifest.
    pub trust_server_certificate: Vec<u8>,
    /// Identity the manifest must declare.
    pub customer: String,
    /// Directory holding the cached envelope. `None` uses `EngineDefaults::cache_dir()`.
    pub cache_dir: Option<PathBuf>,
    pub fetch_timeout: Duration,
    /// Replaces the built-in HTTP fetcher (tests, host provided networking).
    pub fetcher: Option<Arc<dyn ManifestFetcher>>,
    /// Opt-in: allow a plain HTTP trust server (requires feature `http_urls`).
    pub allow_insecure_http: bool,
}

impl OnlineDirectiveConfig {
    pub fn new(
        trust_server_url: impl Into<String>,
        trust_server_certificate: impl Into<Vec<u8>>,
        customer: impl Into<String>,
    ) -> Self {
        Self {
            trust_server_url: trust_server_url.into(),
            trust_server_certificate: trust_server_certificate.into(),
            customer: customer.into(),
            cache_dir: None,
            fetch_timeout: EngineDefaults::FETCH_TIMEOUT,
            fetcher: None,
            allow_insecure_http: EngineDefaults::ALLOW_INSECURE_HTTP,
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ManifestFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }
}

impl fmt::Debug for OnlineDirectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnlineDirectiveConfig")
            .field("trust_server_url", &self.trust_server_url)
            .field("customer", &self.customer)
            .field("cache_dir", &self.cache_dir)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("custom_fetcher", &self.fetcher.is_some())
            .field("allow_insecure_http", &self.allow_insecure_http)
            .finish_non_exhaustive()
    }
}
