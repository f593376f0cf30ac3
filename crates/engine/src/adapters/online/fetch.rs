// adapters/online/fetch.rs

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::domain::error::{TrustError, TrustResult};

/// Downloads the signed manifest from the trust server.
///
/// Implementations block until the bytes arrive or `timeout` elapses.
pub trait ManifestFetcher: Send + Sync {
  fn fetch(&self, url: &Url, timeout: Duration) -> TrustResult<Vec<u8>>;
}

/// Built-in fetcher: `reqwest` awaited through the blocking runtime bridge,
/// with a hard `tokio::time::timeout` around the whole request.
#[cfg(feature = "http-fetch")]
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher;

#[cfg(feature = "http-fetch")]
impl HttpFetcher {
  async fn get(url: Url, timeout: Duration) -> TrustResult<Vec<u8>> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .connect_timeout(timeout.min(Duration::from_secs(super::constants::CONNECT_TIMEOUT_SECS)))
      .user_agent(format!("TrustPin/{}", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| TrustError::Network { message: format!("Failed to create HTTP client: {e}") })?;

    let response = client
      .get(url)
      .send()
      .await
      .map_err(|e| TrustError::Network { message: format!("Request failed: {e}") })?;

    let status = response.status();
    if !status.is_success() {
      return Err(TrustError::Network { message: format!("HTTP error: {status}") });
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| TrustError::Network { message: format!("Failed to read body: {e}") })?;
    Ok(body.to_vec())
  }
}

#[cfg(feature = "http-fetch")]
impl ManifestFetcher for HttpFetcher {
  fn fetch(&self, url: &Url, timeout: Duration) -> TrustResult<Vec<u8>> {
    tracing::info!(%url, "fetching pinning manifest");
    let url = url.clone();
    super::runtime::run_on_current_thread(async move {
      tokio::time::timeout(timeout, Self::get(url, timeout))
        .await
        .map_err(|_| TrustError::Timeout(timeout))?
    })
  }
}

/// The fetcher used when the configuration does not supply one.
pub fn default_fetcher() -> TrustResult<Arc<dyn ManifestFetcher>> {
  #[cfg(feature = "http-fetch")]
  {
    Ok(Arc::new(HttpFetcher))
  }
  #[cfg(not(feature = "http-fetch"))]
  {
    Err(TrustError::Feature("http-fetch"))
  }
}

#[cfg(all(test, feature = "http-fetch"))]
mod tests {
  use super::*;

  #[test]
  fn unreachable_server_is_a_network_error() {
    // Port 9 on localhost: nothing listens there in a test environment.
    let url = Url::parse("https://127.0.0.1:9/manifest").unwrap();
    let err = HttpFetcher.fetch(&url, Duration::from_secs(5)).unwrap_err();
    assert!(matches!(err, TrustError::Network { .. } | TrustError::Timeout(_)), "{err}");
  }

  #[test]
  fn silent_server_is_cut_off_at_the_timeout() {
    // Accepts connections and never answers, not even the TLS handshake.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
      let mut held = Vec::new();
      for stream in listener.incoming() {
        held.push(stream);
      }
    });

    let url = Url::parse(&format!("https://127.0.0.1:{port}/manifest")).unwrap();
    let started = std::time::Instant::now();
    let err = HttpFetcher.fetch(&url, Duration::from_secs(2)).unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, TrustError::Network { .. } | TrustError::Timeout(_)), "{err}");
    assert!(elapsed >= Duration::from_millis(1500), "gave up too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "timeout not enforced: {elapsed:?}");
  }
}
