use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use trustpin_engine::domain::error::TrustError;
use trustpin_engine::{
    CertificateChain, ComposePolicy, EngineDefaults, OpenSslSource, TrustManager, TrustPolicy,
    ValidationType,
};

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("{message}")]
    Generic { message: String },
}

impl From<TrustError> for FfiError {
    fn from(e: TrustError) -> Self {
        FfiError::Generic {
            message: e.to_string(),
        }
    }
}

// ===== FFI types mirroring the public Rust API (FFI-friendly) =====

#[derive(uniffi::Enum, Debug, Clone, Copy)]
pub enum FfiValidationType { Disabled, Standard, Custom, PinCertificate, PinPublicKey, PinCertificateOnline, PinPublicKeyOnline }

impl From<FfiValidationType> for ValidationType {
    fn from(v: FfiValidationType) -> Self {
        match v {
            FfiValidationType::Disabled => ValidationType::Disabled,
            FfiValidationType::Standard => ValidationType::Standard,
            FfiValidationType::Custom => ValidationType::Custom,
            FfiValidationType::PinCertificate => ValidationType::PinCertificate,
            FfiValidationType::PinPublicKey => ValidationType::PinPublicKey,
            FfiValidationType::PinCertificateOnline => ValidationType::PinCertificateOnline,
            FfiValidationType::PinPublicKeyOnline => ValidationType::PinPublicKeyOnline,
        }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiPolicyConfig {
    pub validation_type: FfiValidationType,
    pub host_name: String,
    pub validate_host_name: Option<bool>,
    pub pin_only: Option<bool>,
    pub use_system_roots: Option<bool>,
    pub anchors_pem: Option<Vec<u8>>,         // extra trust anchors (PEM bundle)
    pub pinned_certificates: Option<Vec<u8>>, // bundled pins (PEM bundle or single DER)
    pub bundle_dir: Option<String>,           // directory of .cer/.der/.crt/.pem pins
    pub trust_server: Option<String>,
    pub trust_server_certificate: Option<Vec<u8>>,
    pub customer: Option<String>,
    pub cache_dir: Option<String>,
    pub allow_insecure_http: Option<bool>,
}

impl TryFrom<FfiPolicyConfig> for ComposePolicy {
    type Error = FfiError;
    fn try_from(v: FfiPolicyConfig) -> Result<Self, Self::Error> {
        let mut source = OpenSslSource::empty()
            .with_system_roots(v.use_system_roots.unwrap_or(EngineDefaults::USE_SYSTEM_ROOTS));
        if let Some(pem) = &v.anchors_pem {
            source = source.with_anchors_pem(pem).map_err(|e| FfiError::Generic { message: format!("Invalid trust anchors: {e}") })?;
        }
        if let Some(pins) = &v.pinned_certificates {
            source = match pem_text(pins) { Some(pem) => source.with_bundled_pem(pem), None => source.with_bundled_der(pins) };
        }
        if let Some(dir) = v.bundle_dir {
            source = source.with_bundle_dir(dir);
        }

        let mut compose = ComposePolicy::new(v.validation_type.into(), v.host_name);
        compose.validate_host_name = v.validate_host_name.unwrap_or(EngineDefaults::VALIDATE_HOST_NAME);
        compose.pin_only = v.pin_only.unwrap_or(EngineDefaults::PIN_ONLY);
        compose.certificate_source = Arc::new(source);
        compose.trust_server = v.trust_server;
        compose.trust_server_certificate = v.trust_server_certificate;
        compose.customer = v.customer;
        compose.cache_dir = v.cache_dir.map(PathBuf::from);
        compose.allow_insecure_http = v.allow_insecure_http.unwrap_or(EngineDefaults::ALLOW_INSECURE_HTTP);
        Ok(compose)
    }
}

// PEM as exported by most tools may start with a UTF-8 BOM or blank lines.
fn pem_text(bytes: &[u8]) -> Option<&[u8]> {
    let text = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = text.iter().position(|b| !b.is_ascii_whitespace())?;
    let text = &text[start..];
    text.starts_with(b"-----").then_some(text)
}

/// Implemented by the host application for `FfiValidationType::Custom`.
#[uniffi::export(with_foreign)]
pub trait FfiCustomValidator: Send + Sync {
    fn validate(&self, host_name: String, chain_der: Vec<Vec<u8>>) -> bool;
}

// ===== Registry object =====

#[derive(uniffi::Object, Default)]
pub struct FfiTrustManager {
    inner: RwLock<TrustManager>,
}

impl FfiTrustManager {
    fn register(&self, policy: Arc<dyn TrustPolicy>) {
        let mut manager = self.inner.write().unwrap_or_else(|p| p.into_inner());
        manager.add(policy);
    }
}

#[uniffi::export]
impl FfiTrustManager {
    #[uniffi::constructor]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_policy(&self, cfg: FfiPolicyConfig) -> Result<(), FfiError> {
        let compose: ComposePolicy = cfg.try_into()?;
        let policy = compose.create().map_err(FfiError::from)?;
        self.register(policy);
        Ok(())
    }

    pub fn add_custom_policy(&self, host_name: String, validator: Arc<dyn FfiCustomValidator>) -> Result<(), FfiError> {
        let host = host_name.clone();
        let mut compose = ComposePolicy::new(ValidationType::Custom, host_name);
        compose.custom_validation = Some(Arc::new(move |chain: &CertificateChain| {
            validator.validate(host.clone(), chain.der().to_vec())
        }));
        let policy = compose.create().map_err(FfiError::from)?;
        self.register(policy);
        Ok(())
    }

    pub fn remove_policy(&self, host_name: String) -> bool {
        let mut manager = self.inner.write().unwrap_or_else(|p| p.into_inner());
        manager.remove(&host_name).is_some()
    }

    pub fn host_names(&self) -> Vec<String> {
        let manager = self.inner.read().unwrap_or_else(|p| p.into_inner());
        let mut hosts = manager.all_host_names();
        hosts.sort();
        hosts
    }

    /// Validate a leaf-first DER chain for `host_name`. Hosts without a
    /// policy are not trusted.
    pub fn validate(&self, host_name: String, chain_der: Vec<Vec<u8>>) -> bool {
        let policy = {
            let manager = self.inner.read().unwrap_or_else(|p| p.into_inner());
            manager.policy(&host_name)
        };
        match policy {
            Some(p) => p.validate(&CertificateChain::from_der(chain_der)),
            None => false,
        }
    }
}

// ===== Stateless helpers =====

/// One-shot validation without a registry.
#[uniffi::export]
pub fn validate_chain_ffi(cfg: FfiPolicyConfig, chain_der: Vec<Vec<u8>>) -> Result<bool, FfiError> {
    let compose: ComposePolicy = cfg.try_into()?;
    let policy = compose.create().map_err(FfiError::from)?;
    Ok(policy.validate(&CertificateChain::from_der(chain_der)))
}

/// Parse one or more PEM certificates into leaf-first DER blobs.
#[uniffi::export]
pub fn chain_from_pem_ffi(pem: Vec<u8>) -> Result<Vec<Vec<u8>>, FfiError> {
    let chain = CertificateChain::from_pem(&pem).map_err(FfiError::from)?;
    Ok(chain.der().to_vec())
}

uniffi::setup_scaffolding!();
