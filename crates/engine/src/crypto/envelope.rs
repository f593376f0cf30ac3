//! Signed envelope verification for pinning manifests.
//!
//! The trust server wraps the manifest JSON in a DER PKCS#7 `signedData`
//! structure with the content attached (`openssl smime -sign -nodetach`).

use openssl::nid::Nid;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;

use crate::domain::error::{TrustError, TrustResult};

/// Verifies envelopes against a single configured signer certificate.
#[derive(Clone)]
pub struct EnvelopeVerifier {
    signer: X509,
}

impl EnvelopeVerifier {
    /// Accepts the signer certificate as DER or PEM.
    pub fn from_certificate_bytes(bytes: &[u8]) -> TrustResult<Self> {
        if bytes.is_empty() {
            return Err(TrustError::Config("trust server certificate is empty".into()));
        }
        let signer = X509::from_der(bytes)
            .or_else(|_| X509::from_pem(bytes))
            .map_err(|_| TrustError::Config("trust server certificate does not parse".into()))?;
        Ok(Self { signer })
    }

    pub fn signer(&self) -> &X509 {
        &self.signer
    }

    /// Check structure, content type and signature, then return the signed
    /// payload bytes verbatim.
    pub fn open(&self, envelope: &[u8]) -> TrustResult<Vec<u8>> {
        let pkcs7 = Pkcs7::from_der(envelope)
            .map_err(|e| TrustError::Envelope(format!("not a PKCS#7 structure: {e}")))?;

        let content_type = pkcs7.type_().map(|t| t.nid());
        if content_type != Some(Nid::PKCS7_SIGNED) {
            return Err(TrustError::Envelope(format!(
                "unexpected content type {content_type:?}, expected signedData"
            )));
        }

        // Only the configured certificate may act as signer; certificates
        // embedded in the envelope are ignored.
        let mut certs = Stack::new()?;
        certs.push(self.signer.clone())?;
        let store = X509StoreBuilder::new()?.build();
        let flags = Pkcs7Flags::NOINTERN | Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY;

        let mut payload = Vec::new();
        pkcs7
            .verify(&certs, &store, None, Some(&mut payload), flags)
            .map_err(|e| TrustError::Envelope(format!("signature verification failed: {e}")))?;
        Ok(payload)
    }
}

impl std::fmt::Debug for EnvelopeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeVerifier").finish_non_exhaustive()
    }
}
