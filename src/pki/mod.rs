//! Parsing and comparison of cryptographic artifacts.
//!
//! Everything here is pure: PEM and DER come in, structured facts come out.
//! Policies turn the facts into violations; this module never decides.

mod keypair;
mod spec_match;
mod usages;

pub use keypair::{check_key_pair, KeyPairError};
pub use spec_match::{request_violations, secret_violations};

use thiserror::Error;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Errors from decoding certificates and certificate requests.
///
/// These surface inside policy messages, so their rendering is stable.
#[derive(Debug, Error)]
pub enum PkiError {
    #[error("error decoding certificate PEM block")]
    NoCertificatePem,

    #[error("error decoding certificate request PEM block")]
    NoCsrPem,

    #[error("error parsing certificate: {0}")]
    ParseCertificate(String),

    #[error("error parsing certificate request: {0}")]
    ParseCsr(String),
}

/// Extract the first certificate DER from a PEM bundle.
pub fn certificate_der_from_pem(pem: &[u8]) -> Result<Vec<u8>, PkiError> {
    let mut reader = std::io::Cursor::new(pem);
    for item in rustls_pemfile::read_all(&mut reader) {
        if let Ok(rustls_pemfile::Item::X509Certificate(der)) = item {
            return Ok(der.as_ref().to_vec());
        }
    }
    Err(PkiError::NoCertificatePem)
}

/// Extract the first PKCS#10 request DER from a PEM bundle.
pub fn csr_der_from_pem(pem: &[u8]) -> Result<Vec<u8>, PkiError> {
    let mut reader = std::io::Cursor::new(pem);
    for item in rustls_pemfile::read_all(&mut reader) {
        if let Ok(rustls_pemfile::Item::Csr(der)) = item {
            return Ok(der.as_ref().to_vec());
        }
    }
    Err(PkiError::NoCsrPem)
}

pub(crate) fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>, PkiError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|err| PkiError::ParseCertificate(err.to_string()))?;
    Ok(cert)
}

pub(crate) fn parse_csr(der: &[u8]) -> Result<X509CertificationRequest<'_>, PkiError> {
    let (_, csr) = X509CertificationRequest::from_der(der)
        .map_err(|err| PkiError::ParseCsr(err.to_string()))?;
    Ok(csr)
}

/// Drop leading zero octets from a big-endian integer, keeping at least one.
pub(crate) fn strip_leading_zeros(raw: &[u8]) -> &[u8] {
    let mut first_non_zero = 0;
    while first_non_zero < raw.len().saturating_sub(1) && raw[first_non_zero] == 0 {
        first_non_zero += 1;
    }
    &raw[first_non_zero..]
}
