//! Trust evaluation primitives shared by every directive.
//! Pure functions: nothing here panics or propagates errors, failures narrow
//! to "not valid" or to an empty extraction.

use std::fmt;

use base64::Engine;
use openssl::pkey::{PKey, Public};
use openssl::rsa::Rsa;
use openssl::x509::{X509Ref, X509};

use crate::domain::types::CertificateChain;

use super::source::CertificateSource;

/// A public key compared by key material, not by identity.
#[derive(Clone)]
pub struct PublicKey(PKey<Public>);

impl PublicKey {
    pub fn from_certificate(cert: &X509Ref) -> Option<Self> {
        cert.public_key().ok().map(PublicKey)
    }

    /// Decode a DER key: SubjectPublicKeyInfo first, then a bare PKCS#1
    /// `RSAPublicKey`.
    pub fn from_der(der: &[u8]) -> Option<Self> {
        if let Ok(key) = PKey::public_key_from_der(der) {
            return Some(PublicKey(key));
        }
        Rsa::public_key_from_der_pkcs1(der)
            .ok()
            .and_then(|rsa| PKey::from_rsa(rsa).ok())
            .map(PublicKey)
    }

    pub fn from_base64(b64: &str) -> Option<Self> {
        let der = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .ok()?;
        Self::from_der(&der)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.public_eq(&*other.0)
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.0.id()).finish()
    }
}

/// Standard X.509 evaluation of `chain` through `source`. Only an explicitly
/// or implicitly trusted outcome counts; anything else, including an
/// evaluation that could not run, is invalid.
pub fn chain_is_valid(
    source: &dyn CertificateSource,
    chain: &CertificateChain,
    host_name: Option<&str>,
) -> bool {
    // A leaf that does not parse cannot be evaluated; never fall back to the
    // next certificate in line.
    let leaf_parses = chain
        .der()
        .first()
        .map_or(false, |der| X509::from_der(der).is_ok());
    if !leaf_parses {
        return false;
    }
    let parsed = chain.parsed();
    let outcome = source.evaluate(&parsed, host_name);
    tracing::debug!(?host_name, ?outcome, "standard chain evaluation");
    outcome.is_trusted()
}

/// Raw bytes of every parseable certificate in the chain, in order, exactly
/// as the peer sent them.
pub fn certificate_bytes(chain: &CertificateChain) -> Vec<Vec<u8>> {
    chain
        .der()
        .iter()
        .filter(|der| X509::from_der(der).is_ok())
        .cloned()
        .collect()
}

/// Public keys of every parseable certificate in the chain, in order.
pub fn public_keys(chain: &CertificateChain) -> Vec<PublicKey> {
    chain
        .parsed()
        .iter()
        .filter_map(|c| PublicKey::from_certificate(c))
        .collect()
}

/// Lower-case hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(openssl::sha::sha256(bytes))
}

// Pin matching succeeds on the first pinned x remote match; pinned set outer.

/// Exact byte match of any pinned certificate against the chain.
pub fn certificate_pins_match(pinned: &[Vec<u8>], chain: &CertificateChain) -> bool {
    let remote = certificate_bytes(chain);
    pinned.iter().any(|p| remote.iter().any(|r| r == p))
}

/// Structural match of any pinned key against the chain's keys.
pub fn public_key_pins_match(pinned: &[PublicKey], chain: &CertificateChain) -> bool {
    let remote = public_keys(chain);
    pinned.iter().any(|p| remote.iter().any(|r| r == p))
}

/// Match of any pinned SHA-256 fingerprint (lower-case hex) against the chain.
pub fn fingerprint_pins_match(pinned: &[String], chain: &CertificateChain) -> bool {
    let remote: Vec<String> = certificate_bytes(chain).iter().map(|c| sha256_hex(c)).collect();
    pinned.iter().any(|p| remote.iter().any(|r| r == p))
}
