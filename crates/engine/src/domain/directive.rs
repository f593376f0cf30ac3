// crates/engine/src/domain/directive.rs

use tracing::{debug, info, warn};

use crate::adapters::online::{OnlineTrustStore, PinKind};
use crate::crypto::evaluation::{self, PublicKey};
use crate::domain::error::TrustResult;
use crate::domain::policy::TrustPolicy;
use crate::domain::types::{
    CertificateChain, CustomValidation, OnlineDirectiveConfig, ValidationSettings, ValidationType,
};

/// Mode specific state of a directive. Pin material is loaded once at
/// construction and only read afterwards.
enum Mode {
    Disabled,
    Standard,
    Custom(Option<CustomValidation>),
    PinCertificate(Vec<Vec<u8>>),
    PinPublicKey(Vec<PublicKey>),
    PinCertificateOnline(OnlineTrustStore),
    PinPublicKeyOnline(OnlineTrustStore),
}

/// The concrete `TrustPolicy`: one validation algorithm per `ValidationType`.
pub struct TrustDirective {
    host_name: String,
    settings: ValidationSettings,
    mode: Mode,
}

impl TrustDirective {
    /// Accepts every chain, including expired, self-signed and revoked ones.
    pub fn disabled(host_name: impl Into<String>) -> Self {
        Self::with_mode(host_name, ValidationSettings::default(), Mode::Disabled)
    }

    pub fn standard(host_name: impl Into<String>, settings: ValidationSettings) -> Self {
        Self::with_mode(host_name, settings, Mode::Standard)
    }

    /// Without `settings.custom_validation` every chain is rejected.
    pub fn custom(host_name: impl Into<String>, settings: ValidationSettings) -> Self {
        let f = settings.custom_validation.clone();
        Self::with_mode(host_name, settings, Mode::Custom(f))
    }

    pub fn pin_certificate(host_name: impl Into<String>, settings: ValidationSettings) -> Self {
        let pins: Vec<Vec<u8>> = settings
            .certificate_source
            .load_bundled_certificates()
            .iter()
            .filter_map(|c| c.to_der().ok())
            .collect();
        let host_name = host_name.into();
        debug!(host = %host_name, pins = pins.len(), "certificate pins loaded");
        Self::with_mode(host_name, settings, Mode::PinCertificate(pins))
    }

    pub fn pin_public_key(host_name: impl Into<String>, settings: ValidationSettings) -> Self {
        let keys: Vec<PublicKey> = settings
            .certificate_source
            .load_bundled_certificates()
            .iter()
            .filter_map(|c| PublicKey::from_certificate(c))
            .collect();
        let host_name = host_name.into();
        debug!(host = %host_name, pins = keys.len(), "public key pins loaded");
        Self::with_mode(host_name, settings, Mode::PinPublicKey(keys))
    }

    pub fn pin_certificate_online(
        host_name: impl Into<String>,
        settings: ValidationSettings,
        online: &OnlineDirectiveConfig,
    ) -> TrustResult<Self> {
        let host_name = host_name.into();
        let store = OnlineTrustStore::new(online, &host_name, PinKind::Certificate)?;
        Ok(Self::with_mode(host_name, settings, Mode::PinCertificateOnline(store)))
    }

    pub fn pin_public_key_online(
        host_name: impl Into<String>,
        settings: ValidationSettings,
        online: &OnlineDirectiveConfig,
    ) -> TrustResult<Self> {
        let host_name = host_name.into();
        let store = OnlineTrustStore::new(online, &host_name, PinKind::PublicKey)?;
        Ok(Self::with_mode(host_name, settings, Mode::PinPublicKeyOnline(store)))
    }

    fn with_mode(host_name: impl Into<String>, settings: ValidationSettings, mode: Mode) -> Self {
        Self { host_name: host_name.into(), settings, mode }
    }

    pub fn validation_type(&self) -> ValidationType {
        match self.mode {
            Mode::Disabled => ValidationType::Disabled,
            Mode::Standard => ValidationType::Standard,
            Mode::Custom(_) => ValidationType::Custom,
            Mode::PinCertificate(_) => ValidationType::PinCertificate,
            Mode::PinPublicKey(_) => ValidationType::PinPublicKey,
            Mode::PinCertificateOnline(_) => ValidationType::PinCertificateOnline,
            Mode::PinPublicKeyOnline(_) => ValidationType::PinPublicKeyOnline,
        }
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// The manifest store backing an online directive.
    pub fn online_store(&self) -> Option<&OnlineTrustStore> {
        match &self.mode {
            Mode::PinCertificateOnline(store) | Mode::PinPublicKeyOnline(store) => Some(store),
            _ => None,
        }
    }

    fn standard_validation(&self, chain: &CertificateChain) -> bool {
        let host = self
            .settings
            .host_name_check_enabled
            .then_some(self.host_name.as_str());
        evaluation::chain_is_valid(self.settings.certificate_source.as_ref(), chain, host)
    }

    /// Standard validation first (unless `pin_only`), then the pin match. A
    /// valid chain without a matching pin fails.
    fn standard_then_pin(&self, chain: &CertificateChain, pin_match: impl FnOnce() -> bool) -> bool {
        if !self.settings.pin_only && !self.standard_validation(chain) {
            return false;
        }
        pin_match()
    }

    /// One online attempt, followed by at most one forced refresh of the
    /// manifest when the pins do not match.
    fn validate_online(&self, store: &OnlineTrustStore, chain: &CertificateChain, force_reload: bool) -> bool {
        if force_reload {
            store.remove_trust_store();
        }
        // A bad chain is not a pinning-data problem: no retry.
        if !self.settings.pin_only && !self.standard_validation(chain) {
            return false;
        }

        let matched = match store.load_pins(&self.host_name) {
            Ok(pins) => pins.matches(chain),
            Err(e) => {
                warn!(host = %self.host_name, "no usable pins from trust server: {e}");
                false
            }
        };
        if matched {
            return true;
        }
        if !force_reload {
            info!(host = %self.host_name, "pin mismatch, refreshing manifest once");
            return self.validate_online(store, chain, true);
        }
        warn!(host = %self.host_name, "pin mismatch after manifest refresh");
        false
    }
}

impl TrustPolicy for TrustDirective {
    fn host_name(&self) -> &str {
        &self.host_name
    }

    fn validate(&self, chain: &CertificateChain) -> bool {
        match &self.mode {
            Mode::Disabled => true,
            Mode::Standard => self.standard_validation(chain),
            Mode::Custom(Some(f)) => f(chain),
            Mode::Custom(None) => {
                warn!(host = %self.host_name, "custom directive without validation function");
                false
            }
            Mode::PinCertificate(pins) => {
                self.standard_then_pin(chain, || evaluation::certificate_pins_match(pins, chain))
            }
            Mode::PinPublicKey(keys) => {
                self.standard_then_pin(chain, || evaluation::public_key_pins_match(keys, chain))
            }
            Mode::PinCertificateOnline(store) | Mode::PinPublicKeyOnline(store) => {
                self.validate_online(store, chain, false)
            }
        }
    }
}

impl std::fmt::Debug for TrustDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustDirective")
            .field("host_name", &self.host_name)
            .field("validation_type", &self.validation_type())
            .field("settings", &self.settings)
            .field("online_store", &self.online_store())
            .finish()
    }
}
