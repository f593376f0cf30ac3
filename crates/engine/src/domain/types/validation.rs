use std::fmt;
use std::sync::Arc;

use crate::crypto::source::{CertificateSource, OpenSslSource};

use super::chain::CertificateChain;
use super::config::EngineDefaults;

/// The kind of trust evaluation a policy performs for its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationType {
    /// Accept every chain. Expired, self-signed and revoked chains included.
    Disabled,
    /// Standard X.509 chain evaluation, optionally bound to the host name.
    Standard,
    /// Delegate the decision to a caller supplied function.
    Custom,
    /// Require a bundled certificate to appear in the chain.
    PinCertificate,
    /// Require a bundled public key to appear in the chain.
    PinPublicKey,
    /// Like `PinCertificate`, with fingerprints from a signed online manifest.
    PinCertificateOnline,
    /// Like `PinPublicKey`, with keys from a signed online manifest.
    PinPublicKeyOnline,
}

/// Caller supplied validation for `ValidationType::Custom`.
pub type CustomValidation = Arc<dyn Fn(&CertificateChain) -> bool + Send + Sync>;

/// Settings shared by every directive.
#[derive(Clone)]
pub struct ValidationSettings {
    /// Bind standard chain evaluation to the directive's host name.
    pub host_name_check_enabled: bool,
    /// Where bundled pins and trust anchors come from.
    pub certificate_source: Arc<dyn CertificateSource>,
    /// Skip standard chain evaluation and rely on the pin match alone.
    pub pin_only: bool,
    pub custom_validation: Option<CustomValidation>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            host_name_check_enabled: EngineDefaults::VALIDATE_HOST_NAME,
            certificate_source: Arc::new(OpenSslSource::system()),
            pin_only: EngineDefaults::PIN_ONLY,
            custom_validation: None,
        }
    }
}

impl fmt::Debug for ValidationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSettings")
            .field("host_name_check_enabled", &self.host_name_check_enabled)
            .field("pin_only", &self.pin_only)
            .field("custom_validation", &self.custom_validation.is_some())
            .finish_non_exhaustive()
    }
}
