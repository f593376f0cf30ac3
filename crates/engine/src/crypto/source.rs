//! Certificate source abstraction.
//! Supplies bundled pin material and runs standard X.509 chain evaluation.

use std::fmt;
use std::path::{Path, PathBuf};

use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::verify::X509VerifyParam;
use openssl::x509::{X509StoreContext, X509VerifyResult, X509};
use tracing::{debug, warn};

use crate::domain::error::TrustResult;
use crate::domain::types::EngineDefaults;

/// Outcome of a standard chain evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvaluation {
    /// The chain terminates in an anchor the user explicitly trusts.
    Proceed,
    /// The chain terminates in an implicitly trusted anchor.
    Unspecified,
    /// Evaluation failed in a way a user could override (expiry, host mismatch).
    RecoverableFailure(String),
    /// Evaluation failed and cannot be overridden.
    FatalFailure(String),
    /// Evaluation could not be carried out.
    Indeterminate(String),
}

impl ChainEvaluation {
    pub fn is_trusted(&self) -> bool {
        matches!(self, ChainEvaluation::Proceed | ChainEvaluation::Unspecified)
    }
}

/// Where bundled certificates and trust anchors come from.
pub trait CertificateSource: Send + Sync {
    /// Certificates bundled with the application, used as pins.
    fn load_bundled_certificates(&self) -> Vec<X509>;

    /// Evaluate `chain` (leaf first). With `host_name` set the leaf must also
    /// be issued for that host.
    fn evaluate(&self, chain: &[X509], host_name: Option<&str>) -> ChainEvaluation;
}

/// OpenSSL backed certificate source.
///
/// Trust anchors are the platform's default verify paths (optional) plus any
/// explicitly added anchors. Bundled pins come from DER/PEM blobs and files in
/// bundle directories.
#[derive(Clone, Default)]
pub struct OpenSslSource {
    use_system_roots: bool,
    anchors: Vec<X509>,
    bundled: Vec<X509>,
    bundle_dirs: Vec<PathBuf>,
}

impl OpenSslSource {
    /// Platform trust anchors, no bundled pins.
    pub fn system() -> Self {
        Self {
            use_system_roots: EngineDefaults::USE_SYSTEM_ROOTS,
            ..Self::default()
        }
    }

    /// No anchors at all; add them with `with_anchor_*`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_system_roots(mut self, enabled: bool) -> Self {
        self.use_system_roots = enabled;
        self
    }

    pub fn with_anchor(mut self, anchor: X509) -> Self {
        self.anchors.push(anchor);
        self
    }

    pub fn with_anchor_der(self, der: &[u8]) -> TrustResult<Self> {
        Ok(self.with_anchor(X509::from_der(der)?))
    }

    pub fn with_anchors_pem(mut self, pem: &[u8]) -> TrustResult<Self> {
        self.anchors.extend(X509::stack_from_pem(pem)?);
        Ok(self)
    }

    /// Bundle a pin certificate. Unparseable input is skipped.
    pub fn with_bundled_der(mut self, der: &[u8]) -> Self {
        match X509::from_der(der) {
            Ok(cert) => self.bundled.push(cert),
            Err(e) => debug!("skipping unparseable bundled certificate: {e}"),
        }
        self
    }

    /// Bundle pin certificates from concatenated PEM. Unparseable input is skipped.
    pub fn with_bundled_pem(mut self, pem: &[u8]) -> Self {
        match X509::stack_from_pem(pem) {
            Ok(certs) => self.bundled.extend(certs),
            Err(e) => debug!("skipping unparseable bundled PEM: {e}"),
        }
        self
    }

    /// Scan `dir` for `.cer`, `.der`, `.crt` and `.pem` files whenever the
    /// bundle is loaded.
    pub fn with_bundle_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundle_dirs.push(dir.into());
        self
    }

    fn trust_store(&self, host_name: Option<&str>) -> TrustResult<X509Store> {
        let mut builder = X509StoreBuilder::new()?;
        if self.use_system_roots {
            builder.set_default_paths()?;
        }
        for anchor in &self.anchors {
            builder.add_cert(anchor.clone())?;
        }
        if let Some(host) = host_name {
            let mut param = X509VerifyParam::new()?;
            param.set_host(host)?;
            builder.set_param(&param)?;
        }
        Ok(builder.build())
    }

    fn verify(&self, chain: &[X509], host_name: Option<&str>) -> TrustResult<(bool, X509VerifyResult)> {
        let store = self.trust_store(host_name)?;
        let mut untrusted = Stack::new()?;
        for cert in chain.iter().skip(1) {
            untrusted.push(cert.clone())?;
        }
        let mut ctx = X509StoreContext::new()?;
        let outcome = ctx.init(&store, &chain[0], &untrusted, |c| {
            let ok = c.verify_cert()?;
            Ok((ok, c.error()))
        })?;
        Ok(outcome)
    }
}

impl CertificateSource for OpenSslSource {
    fn load_bundled_certificates(&self) -> Vec<X509> {
        let mut certs = self.bundled.clone();
        for dir in &self.bundle_dirs {
            certs.extend(read_certificate_dir(dir));
        }
        certs
    }

    fn evaluate(&self, chain: &[X509], host_name: Option<&str>) -> ChainEvaluation {
        if chain.is_empty() {
            return ChainEvaluation::Indeterminate("empty chain".into());
        }
        match self.verify(chain, host_name) {
            Ok((true, _)) => ChainEvaluation::Unspecified,
            Ok((false, err)) => classify_failure(err),
            Err(e) => ChainEvaluation::Indeterminate(e.to_string()),
        }
    }
}

impl fmt::Debug for OpenSslSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSslSource")
            .field("use_system_roots", &self.use_system_roots)
            .field("anchors", &self.anchors.len())
            .field("bundled", &self.bundled.len())
            .field("bundle_dirs", &self.bundle_dirs)
            .finish()
    }
}

// X509_V_ERR_* codes a user could override in an interactive trust prompt.
const RECOVERABLE_CODES: &[i32] = &[
    9,  // CERT_NOT_YET_VALID
    10, // CERT_HAS_EXPIRED
    18, // DEPTH_ZERO_SELF_SIGNED_CERT
    19, // SELF_SIGNED_CERT_IN_CHAIN
    62, // HOSTNAME_MISMATCH
];

fn classify_failure(err: X509VerifyResult) -> ChainEvaluation {
    let reason = err.error_string().to_string();
    if RECOVERABLE_CODES.contains(&err.as_raw()) {
        ChainEvaluation::RecoverableFailure(reason)
    } else {
        ChainEvaluation::FatalFailure(reason)
    }
}

fn is_certificate_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("cer" | "der" | "crt" | "pem")
    )
}

/// Read every certificate file in `dir`, sorted by file name. Files that fail
/// to read or parse are skipped.
fn read_certificate_dir(dir: &Path) -> Vec<X509> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), "certificate bundle directory unreadable: {e}");
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_certificate_file(p))
        .collect();
    paths.sort();

    let mut certs = Vec::new();
    for path in paths {
        let Ok(data) = std::fs::read(&path) else {
            debug!(path = %path.display(), "skipping unreadable certificate file");
            continue;
        };
        if let Ok(cert) = X509::from_der(&data) {
            certs.push(cert);
        } else if let Ok(pem) = X509::stack_from_pem(&data) {
            certs.extend(pem);
        } else {
            debug!(path = %path.display(), "skipping unparseable certificate file");
        }
    }
    certs
}
