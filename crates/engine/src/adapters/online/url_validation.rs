use url::Url;

use crate::domain::error::{TrustError, TrustResult};

/// Validate the trust server URL at construction time.
/// HTTPS only, unless both the `http_urls` feature and the caller opt in.
pub fn validate_trust_server_url(url_str: &str, allow_http: bool) -> TrustResult<Url> {
  if url_str.trim().is_empty() {
    return Err(TrustError::Config("trust server URL is missing".into()));
  }
  let url = Url::parse(url_str)
    .map_err(|e| TrustError::Config(format!("invalid trust server URL: {e}")))?;
  match url.scheme() {
    "https" => {}
    "http" => {
      #[cfg(not(feature = "http_urls"))]
      {
        if !allow_http { return Err(TrustError::Config("HTTP URLs are not allowed".into())); }
        return Err(TrustError::Feature("http_urls"));
      }
      #[cfg(feature = "http_urls")]
      {
        if !allow_http { return Err(TrustError::Config("HTTP URLs are not allowed".into())); }
      }
    }
    _ => return Err(TrustError::Config("unsupported URL scheme".into())),
  }
  if url.host().is_none() {
    return Err(TrustError::Config("URL missing host".into()));
  }
  if !url.username().is_empty() || url.password().is_some() {
    return Err(TrustError::Config("credentials in trust server URL are not allowed".into()));
  }
  Ok(url)
}
