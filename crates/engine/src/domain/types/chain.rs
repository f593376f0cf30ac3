use openssl::x509::X509;

use crate::domain::error::TrustResult;

/// A certificate chain as presented by the peer during the handshake,
/// leaf first. Entries are kept as raw DER and parsed on demand, so a
/// garbage entry never prevents the others from being inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Vec<u8>>,
}

impl CertificateChain {
    pub fn from_der(certificates: Vec<Vec<u8>>) -> Self {
        Self { certificates }
    }

    /// Build a chain from one or more concatenated PEM certificates.
    pub fn from_pem(pem: &[u8]) -> TrustResult<Self> {
        let certificates = X509::stack_from_pem(pem)?
            .iter()
            .map(|c| c.to_der())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { certificates })
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Raw DER blobs in presentation order.
    pub fn der(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// Parsed certificates in presentation order; unparseable entries are skipped.
    pub fn parsed(&self) -> Vec<X509> {
        self.certificates
            .iter()
            .filter_map(|der| X509::from_der(der).ok())
            .collect()
    }
}

impl From<Vec<Vec<u8>>> for CertificateChain {
    fn from(certificates: Vec<Vec<u8>>) -> Self {
        Self::from_der(certificates)
    }
}
