#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use once_cell::sync::Lazy;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;
use rcgen::{BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa};
use url::Url;

use trustpin_engine::crypto::evaluation::sha256_hex;
use trustpin_engine::{
    CertificateChain, ManifestFetcher, OnlineDirectiveConfig, OpenSslSource, TrustError,
    TrustResult, ValidationSettings,
};

pub const HOST: &str = "api.example.com";
pub const CUSTOMER: &str = "acme";
pub const TRUST_SERVER: &str = "https://trust.example.com/pins/acme.p7";

/// A small PKI: root -> intermediate -> leaves. Every certificate is
/// serialized exactly once (ECDSA signatures differ per serialization).
pub struct Pki {
    pub root: Vec<u8>,
    pub intermediate: Vec<u8>,
    /// Same subject and key as `intermediate`, different signature bytes.
    pub intermediate_reissued: Vec<u8>,
    /// Issued for `HOST` and `example.com`.
    pub leaf: Vec<u8>,
    /// Issued for `other.example.org`.
    pub other_leaf: Vec<u8>,
    pub expired_leaf: Vec<u8>,
    /// Self-signed, issued for `HOST`, unrelated to the root.
    pub self_signed: Vec<u8>,
}

fn params(common_name: &str, sans: &[&str], ca: bool) -> CertificateParams {
    let mut params = CertificateParams::new(sans.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    params.distinguished_name = dn;
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params.not_after = rcgen::date_time_ymd(2099, 1, 1);
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    }
    params
}

fn build_pki() -> Pki {
    let root = Certificate::from_params(params("TrustPin Test Root", &[], true)).expect("root");
    let intermediate =
        Certificate::from_params(params("TrustPin Test Intermediate", &[], true)).expect("intermediate");
    let leaf = Certificate::from_params(params(HOST, &[HOST, "example.com"], false)).expect("leaf");
    let other_leaf =
        Certificate::from_params(params("other.example.org", &["other.example.org"], false)).expect("other");
    let mut expired_params = params(HOST, &[HOST], false);
    expired_params.not_after = rcgen::date_time_ymd(2021, 1, 1);
    let expired_leaf = Certificate::from_params(expired_params).expect("expired");
    let self_signed = Certificate::from_params(params("Self Signed", &[HOST], false)).expect("self signed");

    Pki {
        root: root.serialize_der().expect("root der"),
        intermediate: intermediate.serialize_der_with_signer(&root).expect("intermediate der"),
        intermediate_reissued: intermediate.serialize_der_with_signer(&root).expect("reissued der"),
        leaf: leaf.serialize_der_with_signer(&intermediate).expect("leaf der"),
        other_leaf: other_leaf.serialize_der_with_signer(&intermediate).expect("other der"),
        expired_leaf: expired_leaf.serialize_der_with_signer(&intermediate).expect("expired der"),
        self_signed: self_signed.serialize_der().expect("self signed der"),
    }
}

pub static PKI: Lazy<Pki> = Lazy::new(build_pki);

impl Pki {
    /// `leaf`, `intermediate`: valid for `HOST` under `source()`.
    pub fn chain(&self) -> CertificateChain {
        CertificateChain::from_der(vec![self.leaf.clone(), self.intermediate.clone()])
    }

    pub fn other_chain(&self) -> CertificateChain {
        CertificateChain::from_der(vec![self.other_leaf.clone(), self.intermediate.clone()])
    }

    pub fn expired_chain(&self) -> CertificateChain {
        CertificateChain::from_der(vec![self.expired_leaf.clone(), self.intermediate.clone()])
    }

    pub fn self_signed_chain(&self) -> CertificateChain {
        CertificateChain::from_der(vec![self.self_signed.clone()])
    }

    /// Trusts only the test root.
    pub fn source(&self) -> OpenSslSource {
        OpenSslSource::empty().with_anchor_der(&self.root).expect("root anchor")
    }

    pub fn settings(&self) -> ValidationSettings {
        settings_with(self.source())
    }
}

pub fn settings_with(source: OpenSslSource) -> ValidationSettings {
    ValidationSettings {
        certificate_source: Arc::new(source),
        ..ValidationSettings::default()
    }
}

pub fn fingerprint(der: &[u8]) -> String {
    sha256_hex(der)
}

pub fn public_key_b64(der: &[u8]) -> String {
    let cert = X509::from_der(der).expect("cert");
    let spki = cert.public_key().expect("key").public_key_to_der().expect("spki");
    base64::engine::general_purpose::STANDARD.encode(spki)
}

/// Key and certificate signing pinning manifests.
pub struct ManifestSigner {
    pub cert_der: Vec<u8>,
    cert: X509,
    key: PKey<Private>,
}

impl ManifestSigner {
    pub fn generate(common_name: &str) -> Self {
        let cert = Certificate::from_params(params(common_name, &[], false)).expect("signer");
        let cert_der = cert.serialize_der().expect("signer der");
        let key = PKey::private_key_from_der(&cert.serialize_private_key_der()).expect("signer key");
        Self { cert: X509::from_der(&cert_der).expect("signer x509"), cert_der, key }
    }

    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let certs = Stack::new().expect("stack");
        Pkcs7::sign(&self.cert, &self.key, &certs, payload, Pkcs7Flags::BINARY)
            .expect("pkcs7 sign")
            .to_der()
            .expect("pkcs7 der")
    }

    /// Envelope around a manifest with the given customer, timestamp and host entries.
    pub fn manifest(&self, customer: &str, timestamp: f64, hashes: serde_json::Value) -> Vec<u8> {
        let payload = serde_json::json!({
            "customer": customer,
            "timestamp": timestamp,
            "hashes": hashes,
        });
        self.sign(payload.to_string().as_bytes())
    }

    /// Fresh manifest for `CUSTOMER`.
    pub fn fresh(&self, hashes: serde_json::Value) -> Vec<u8> {
        self.manifest(CUSTOMER, now(), hashes)
    }
}

pub static SIGNER: Lazy<ManifestSigner> = Lazy::new(|| ManifestSigner::generate("TrustPin Manifest Signer"));
pub static ROGUE_SIGNER: Lazy<ManifestSigner> = Lazy::new(|| ManifestSigner::generate("Rogue Signer"));

pub fn now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("clock").as_secs() as f64
}

pub fn cert_entry(host: &str, fps: &[String]) -> serde_json::Value {
    serde_json::json!([{ "hostname": host, "port": "443", "fp": fps }])
}

pub fn key_entry(host: &str, pks: &[String]) -> serde_json::Value {
    serde_json::json!([{ "hostname": host, "port": "443", "pk": pks }])
}

/// Serves a fixed body and counts calls. No body means the server is down.
#[derive(Default)]
pub struct StubFetcher {
    body: Mutex<Option<Vec<u8>>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn serving(body: Vec<u8>) -> Arc<Self> {
        let stub = Self::default();
        stub.set_body(Some(body));
        Arc::new(stub)
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_body(&self, body: Option<Vec<u8>>) {
        *self.body.lock().expect("body lock") = body;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ManifestFetcher for StubFetcher {
    fn fetch(&self, _url: &Url, _timeout: Duration) -> TrustResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.body
            .lock()
            .expect("body lock")
            .clone()
            .ok_or_else(|| TrustError::Network { message: "connection refused".into() })
    }
}

pub fn online_config(cache_dir: &Path, fetcher: Arc<StubFetcher>) -> OnlineDirectiveConfig {
    OnlineDirectiveConfig::new(TRUST_SERVER, SIGNER.cert_der.clone(), CUSTOMER)
        .with_cache_dir(cache_dir)
        .with_fetcher(fetcher)
}
