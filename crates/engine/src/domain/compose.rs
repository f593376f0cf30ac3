// crates/engine/src/domain/compose.rs

use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::online::ManifestFetcher;
use crate::crypto::source::{CertificateSource, OpenSslSource};
use crate::domain::directive::TrustDirective;
use crate::domain::error::{TrustError, TrustResult};
use crate::domain::policy::TrustPolicy;
use crate::domain::types::{
    CustomValidation, EngineDefaults, OnlineDirectiveConfig, ValidationSettings, ValidationType,
};

/// Collects the configuration for one host and builds its `TrustPolicy`.
///
/// Fields only matter to the validation types that use them:
/// - `validate_host_name`: every type running standard chain validation
/// - `pin_only`: the pinning types
/// - `certificate_source`: standard and pinning types
/// - `custom_validation`: `Custom`
/// - `trust_server`, `trust_server_certificate`, `customer`, `cache_dir`,
///   `fetcher`: the online pinning types
pub struct ComposePolicy {
    pub validation_type: ValidationType,
    pub host_name: String,
    pub validate_host_name: bool,
    pub pin_only: bool,
    pub certificate_source: Arc<dyn CertificateSource>,
    pub custom_validation: Option<CustomValidation>,
    pub trust_server: Option<String>,
    /// DER or PEM certificate of the manifest signer.
    pub trust_server_certificate: Option<Vec<u8>>,
    pub customer: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub fetcher: Option<Arc<dyn ManifestFetcher>>,
    /// Opt-in: allow a plain HTTP trust server (requires feature `http_urls`).
    pub allow_insecure_http: bool,
}

impl ComposePolicy {
    pub fn new(validation_type: ValidationType, host_name: impl Into<String>) -> Self {
        Self {
            validation_type,
            host_name: host_name.into(),
            validate_host_name: EngineDefaults::VALIDATE_HOST_NAME,
            pin_only: EngineDefaults::PIN_ONLY,
            certificate_source: Arc::new(OpenSslSource::system()),
            custom_validation: None,
            trust_server: None,
            trust_server_certificate: None,
            customer: None,
            cache_dir: None,
            fetcher: None,
            allow_insecure_http: EngineDefaults::ALLOW_INSECURE_HTTP,
        }
    }

    /// Build the directive. Online types without a trust server URL, signer
    /// certificate or customer are rejected here rather than at validation time.
    pub fn create(&self) -> TrustResult<Arc<dyn TrustPolicy>> {
        Ok(Arc::new(self.create_directive()?))
    }

    pub fn create_directive(&self) -> TrustResult<TrustDirective> {
        let host = self.host_name.clone();
        let settings = self.settings();

        let directive = match self.validation_type {
            ValidationType::Disabled => TrustDirective::disabled(host),
            ValidationType::Standard => TrustDirective::standard(
                host,
                ValidationSettings { pin_only: false, ..settings },
            ),
            ValidationType::Custom => TrustDirective::custom(host, settings),
            ValidationType::PinCertificate => TrustDirective::pin_certificate(host, settings),
            ValidationType::PinPublicKey => TrustDirective::pin_public_key(host, settings),
            ValidationType::PinCertificateOnline => {
                TrustDirective::pin_certificate_online(host, settings, &self.online_config()?)?
            }
            ValidationType::PinPublicKeyOnline => {
                TrustDirective::pin_public_key_online(host, settings, &self.online_config()?)?
            }
        };
        Ok(directive)
    }

    fn settings(&self) -> ValidationSettings {
        ValidationSettings {
            host_name_check_enabled: self.validate_host_name,
            certificate_source: self.certificate_source.clone(),
            pin_only: self.pin_only,
            custom_validation: self.custom_validation.clone(),
        }
    }

    fn online_config(&self) -> TrustResult<OnlineDirectiveConfig> {
        let missing = |what: &str| TrustError::Config(format!("{what} is required for {:?}", self.validation_type));

        let url = self.trust_server.clone().ok_or_else(|| missing("trust server URL"))?;
        let cert = self
            .trust_server_certificate
            .clone()
            .ok_or_else(|| missing("trust server certificate"))?;
        let customer = self.customer.clone().ok_or_else(|| missing("customer"))?;

        let mut config = OnlineDirectiveConfig::new(url, cert, customer)
            .allow_insecure_http(self.allow_insecure_http);
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir.clone());
        }
        if let Some(fetcher) = &self.fetcher {
            config = config.with_fetcher(fetcher.clone());
        }
        Ok(config)
    }
}
