// adapters/online/store.rs

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use url::Url;

use crate::crypto::envelope::EnvelopeVerifier;
use crate::crypto::evaluation::{self, PublicKey};
use crate::domain::error::{TrustError, TrustResult};
use crate::domain::types::{CertificateChain, EngineDefaults, OnlineDirectiveConfig, RemotePinningManifest};

use super::constants::{cache_lock, CACHE_FILE_EXTENSION};
use super::fetch::{default_fetcher, ManifestFetcher};
use super::url_validation::validate_trust_server_url;

/// What an online directive pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
  Certificate,
  PublicKey,
}

impl PinKind {
  fn label(self) -> &'static str {
    match self {
      PinKind::Certificate => "cert",
      PinKind::PublicKey => "key",
    }
  }
}

/// Pins resolved from the manifest for one host.
#[derive(Debug, Clone, PartialEq)]
pub enum RemotePins {
  /// Lower-case hex SHA-256 certificate fingerprints.
  Fingerprints(Vec<String>),
  PublicKeys(Vec<PublicKey>),
}

impl RemotePins {
  /// True if any certificate of `chain` matches any pin.
  pub fn matches(&self, chain: &CertificateChain) -> bool {
    match self {
      RemotePins::Fingerprints(f) => evaluation::fingerprint_pins_match(f, chain),
      RemotePins::PublicKeys(k) => evaluation::public_key_pins_match(k, chain),
    }
  }
}

/// Fetches, caches, verifies and parses the signed pinning manifest of one
/// online directive.
///
/// The cache file holds the last downloaded envelope verbatim. Any integrity
/// failure (envelope, schema, freshness, customer) deletes it so the next load
/// starts from a fresh download.
pub struct OnlineTrustStore {
  url: Url,
  verifier: EnvelopeVerifier,
  customer: String,
  kind: PinKind,
  cache_path: PathBuf,
  fetch_timeout: Duration,
  fetcher: Arc<dyn ManifestFetcher>,
}

impl OnlineTrustStore {
  /// Rejects missing or invalid server parameters up front.
  pub fn new(config: &OnlineDirectiveConfig, host_name: &str, kind: PinKind) -> TrustResult<Self> {
    let url = validate_trust_server_url(&config.trust_server_url, config.allow_insecure_http)?;
    let verifier = EnvelopeVerifier::from_certificate_bytes(&config.trust_server_certificate)?;
    if config.customer.trim().is_empty() {
      return Err(TrustError::Config("customer is missing".into()));
    }
    let fetcher = match &config.fetcher {
      Some(f) => f.clone(),
      None => default_fetcher()?,
    };
    let dir = config.cache_dir.clone().unwrap_or_else(EngineDefaults::cache_dir);
    let signer_der = verifier.signer().to_der()?;
    let cache_path = dir.join(cache_file_name(&config.customer, kind, &url, host_name, &signer_der));

    Ok(Self {
      url,
      verifier,
      customer: config.customer.clone(),
      kind,
      cache_path,
      fetch_timeout: config.fetch_timeout,
      fetcher,
    })
  }

  pub fn kind(&self) -> PinKind {
    self.kind
  }

  pub fn cache_path(&self) -> &Path {
    &self.cache_path
  }

  /// Load the manifest, downloading it first when nothing is cached.
  ///
  /// A freshly downloaded manifest must be signed within
  /// `EngineDefaults::MANIFEST_MAX_SKEW_SECS` of now; an already cached one is
  /// not re-checked for freshness.
  pub fn load_manifest(&self) -> TrustResult<RemotePinningManifest> {
    let lock = cache_lock(&self.cache_path);
    let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

    let freshly_obtained = !self.cache_path.is_file();
    if freshly_obtained {
      self.download();
    }
    if !self.cache_path.is_file() {
      return Err(TrustError::ManifestUnavailable);
    }

    match self.read_verified(freshly_obtained) {
      Ok(manifest) => Ok(manifest),
      Err(e) => {
        warn!(url = %self.url, "discarding cached manifest: {e}");
        self.delete_cache_file();
        Err(e)
      }
    }
  }

  /// Pins listed for `host_name`. A host missing from an otherwise valid
  /// manifest leaves the cache in place.
  pub fn load_pins(&self, host_name: &str) -> TrustResult<RemotePins> {
    let manifest = self.load_manifest()?;
    let entry = manifest
      .entry_for(host_name)
      .ok_or_else(|| TrustError::HostNotPinned(host_name.to_string()))?;

    let pins = match self.kind {
      PinKind::Certificate => RemotePins::Fingerprints(
        entry.fingerprints.iter().map(|f| normalize_fingerprint(f)).collect(),
      ),
      PinKind::PublicKey => {
        let keys: Vec<PublicKey> = entry
          .public_keys_b64
          .iter()
          .filter_map(|k| PublicKey::from_base64(k))
          .collect();
        if keys.len() != entry.public_keys_b64.len() {
          debug!(
            host = host_name,
            dropped = entry.public_keys_b64.len() - keys.len(),
            "dropping undecodable manifest keys"
          );
        }
        RemotePins::PublicKeys(keys)
      }
    };
    Ok(pins)
  }

  /// Delete the cached manifest. Safe to call when nothing is cached.
  pub fn remove_trust_store(&self) {
    let lock = cache_lock(&self.cache_path);
    let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
    self.delete_cache_file();
  }

  fn download(&self) {
    let bytes = match self.fetcher.fetch(&self.url, self.fetch_timeout) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(url = %self.url, "manifest download failed: {e}");
        return;
      }
    };
    match self.persist(&bytes) {
      Ok(()) => info!(path = %self.cache_path.display(), "manifest cached"),
      Err(e) => warn!(path = %self.cache_path.display(), "failed to cache manifest: {e}"),
    }
  }

  // Write to a temp file in the same directory, then rename over the target,
  // so readers never see a partially written envelope.
  fn persist(&self, bytes: &[u8]) -> TrustResult<()> {
    let dir = self
      .cache_path
      .parent()
      .ok_or_else(|| TrustError::Config("cache path has no parent directory".into()))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(&self.cache_path).map_err(|e| TrustError::Io(e.error))?;
    Ok(())
  }

  fn read_verified(&self, freshly_obtained: bool) -> TrustResult<RemotePinningManifest> {
    let envelope = std::fs::read(&self.cache_path)?;
    let payload = self.verifier.open(&envelope)?;
    let manifest = RemotePinningManifest::from_json(&payload)?;

    if freshly_obtained {
      check_freshness(manifest.timestamp_epoch_seconds, unix_now())?;
    }
    if manifest.customer != self.customer {
      return Err(TrustError::CustomerMismatch {
        expected: self.customer.clone(),
        found: manifest.customer,
      });
    }
    Ok(manifest)
  }

  fn delete_cache_file(&self) {
    match std::fs::remove_file(&self.cache_path) {
      Ok(()) => debug!(path = %self.cache_path.display(), "cached manifest removed"),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => warn!(path = %self.cache_path.display(), "failed to remove cached manifest: {e}"),
    }
  }
}

impl std::fmt::Debug for OnlineTrustStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OnlineTrustStore")
      .field("url", &self.url.as_str())
      .field("customer", &self.customer)
      .field("kind", &self.kind)
      .field("cache_path", &self.cache_path)
      .field("fetch_timeout", &self.fetch_timeout)
      .finish_non_exhaustive()
  }
}

/// A timestamp passes when it is non-negative and within the allowed skew of `now`.
pub fn check_freshness(timestamp: f64, now: u64) -> TrustResult<()> {
  let max_skew = EngineDefaults::MANIFEST_MAX_SKEW_SECS as f64;
  let fresh = timestamp.is_finite() && timestamp >= 0.0 && (now as f64 - timestamp).abs() <= max_skew;
  if fresh {
    Ok(())
  } else {
    Err(TrustError::StaleManifest { timestamp, now })
  }
}

fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}

fn normalize_fingerprint(fp: &str) -> String {
  fp.trim().replace(':', "").to_ascii_lowercase()
}

// The readable prefix is lossy; the digest covers the raw customer so that
// names which sanitise alike still get their own file.
fn cache_file_name(customer: &str, kind: PinKind, url: &Url, host_name: &str, signer_der: &[u8]) -> String {
  let safe_customer: String = customer
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .collect();
  let signer = evaluation::sha256_hex(signer_der);
  let digest = evaluation::sha256_hex(format!("{customer}|{url}|{host_name}|{signer}").as_bytes());
  format!("{safe_customer}-{}-{}.{CACHE_FILE_EXTENSION}", kind.label(), &digest[..16])
}
