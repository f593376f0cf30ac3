use crate::domain::types::CertificateChain;

/// A per-host trust rule applied to the chain presented during a TLS handshake.
///
/// `validate` never fails loudly: every problem narrows to `false`. It may
/// block on a bounded network fetch for the online pinning modes.
pub trait TrustPolicy: Send + Sync {
    /// The host this policy applies to.
    fn host_name(&self) -> &str;

    fn validate(&self, chain: &CertificateChain) -> bool;
}
