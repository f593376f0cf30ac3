// crates/engine/src/lib.rs

//! Public facade for the TrustPin engine.
//! Per-host TLS trust directives: disabled, standard, custom, certificate or
//! public key pinning from a bundle, and pinning from a signed manifest served
//! by a trust server. Re-exports the types consumers (apps, FFI) need.

pub mod adapters;
pub mod crypto;
pub mod domain;

use std::sync::Arc;

/// Build the policy described by `compose` and register it in `manager`.
/// Returns the registered policy.
pub fn register_policy(
    manager: &mut TrustManager,
    compose: &ComposePolicy,
) -> TrustResult<Arc<dyn TrustPolicy>> {
    let policy = compose.create()?;
    manager.add(policy.clone());
    Ok(policy)
}

/// Validate `chain` with the policy registered for `host_name`.
/// Hosts without a policy are not trusted.
pub fn validate_host(manager: &TrustManager, host_name: &str, chain: &CertificateChain) -> bool {
    match manager.policy(host_name) {
        Some(policy) => policy.validate(chain),
        None => {
            tracing::warn!(host = host_name, "no trust policy registered");
            false
        }
    }
}

// Re-exports for convenience
pub use adapters::online::{ManifestFetcher, OnlineTrustStore, PinKind, RemotePins};
#[cfg(feature = "http-fetch")]
pub use adapters::online::HttpFetcher;
pub use crypto::envelope::EnvelopeVerifier;
pub use crypto::evaluation::PublicKey;
pub use crypto::source::{CertificateSource, ChainEvaluation, OpenSslSource};
pub use domain::compose::ComposePolicy;
pub use domain::directive::TrustDirective;
pub use domain::error::{TrustError, TrustResult};
pub use domain::manager::TrustManager;
pub use domain::policy::TrustPolicy;
pub use domain::types::{
    CertificateChain, CustomValidation, EngineDefaults, HostPinEntry, OnlineDirectiveConfig,
    RemotePinningManifest, ValidationSettings, ValidationType,
};
