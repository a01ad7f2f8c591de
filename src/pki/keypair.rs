//! Key-pair validation for stored Secrets.
//!
//! Mirrors the behaviour of the TLS key-pair loader used by the rest of the
//! ecosystem: scan PEM, derive the public key from the private key, and
//! compare it to the certificate's public key. The error strings are part of
//! the policy-message contract and must not be reworded.

use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::SigningKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::ObjectIdentifier;
use thiserror::Error;
use asn1_rs::{oid, Oid};
use x509_parser::oid_registry::OID_SIG_ED25519;
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;
use x509_parser::certificate::X509Certificate;

use crate::api::PrivateKeyAlgorithm;

use super::{certificate_der_from_pem, strip_leading_zeros};

const ALGO_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ALGO_EC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const ALGO_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

const CURVE_P256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const CURVE_P384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const CURVE_P521: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

const X509_CURVE_P256: Oid<'static> = oid!(1.2.840 .10045 .3 .1 .7);
const X509_CURVE_P384: Oid<'static> = oid!(1.3.132 .0 .34);
const X509_CURVE_P521: Oid<'static> = oid!(1.3.132 .0 .35);

/// Reasons a stored key pair fails validation.
///
/// Rendered verbatim into `InvalidKeyPair` policy messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyPairError {
    #[error("tls: failed to find any PEM data in certificate input")]
    NoCertificatePemData,

    #[error("tls: failed to find any PEM data in key input")]
    NoKeyPemData,

    #[error("tls: failed to parse certificate: {0}")]
    MalformedCertificate(String),

    #[error("tls: failed to parse private key")]
    MalformedPrivateKey,

    #[error("tls: unknown public key algorithm")]
    UnknownAlgorithm,

    #[error("tls: private key does not match public key")]
    KeyMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamedCurve {
    P256,
    P384,
    P521,
}

impl NamedCurve {
    pub(crate) fn bits(self) -> u32 {
        match self {
            NamedCurve::P256 => 256,
            NamedCurve::P384 => 384,
            NamedCurve::P521 => 521,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PublicKeyData {
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
    Ec { curve: NamedCurve, point: Vec<u8> },
    Ed25519(Vec<u8>),
}

enum PrivateKeyDer {
    Pkcs8(Vec<u8>),
    Pkcs1(Vec<u8>),
    Sec1(Vec<u8>),
}

/// Validate that the PEM certificate and PEM private key form a usable pair.
pub fn check_key_pair(cert_pem: &[u8], key_pem: &[u8]) -> Result<(), KeyPairError> {
    let cert_der =
        certificate_der_from_pem(cert_pem).map_err(|_| KeyPairError::NoCertificatePemData)?;
    let key_der = private_key_from_pem(key_pem)?;

    let (_, cert) = X509Certificate::from_der(&cert_der)
        .map_err(|err| KeyPairError::MalformedCertificate(err.to_string()))?;
    let certificate_key = public_key_from_spki(cert.public_key())?;
    let derived_key = public_key_from_private(&key_der)?;

    if certificate_key != derived_key {
        return Err(KeyPairError::KeyMismatch);
    }
    Ok(())
}

/// Report the algorithm and bit size of a subject public key, if recognized.
pub(crate) fn describe_spki(spki: &SubjectPublicKeyInfo<'_>) -> Option<(PrivateKeyAlgorithm, u32)> {
    match public_key_from_spki(spki).ok()? {
        PublicKeyData::Rsa { modulus, .. } => Some((PrivateKeyAlgorithm::Rsa, bit_len(&modulus))),
        PublicKeyData::Ec { curve, .. } => Some((PrivateKeyAlgorithm::Ecdsa, curve.bits())),
        PublicKeyData::Ed25519(_) => Some((PrivateKeyAlgorithm::Ed25519, 256)),
    }
}

fn private_key_from_pem(pem: &[u8]) -> Result<PrivateKeyDer, KeyPairError> {
    let mut reader = std::io::Cursor::new(pem);
    for item in rustls_pemfile::read_all(&mut reader) {
        match item {
            Ok(rustls_pemfile::Item::Pkcs8Key(der)) => {
                return Ok(PrivateKeyDer::Pkcs8(der.secret_pkcs8_der().to_vec()));
            }
            Ok(rustls_pemfile::Item::Pkcs1Key(der)) => {
                return Ok(PrivateKeyDer::Pkcs1(der.secret_pkcs1_der().to_vec()));
            }
            Ok(rustls_pemfile::Item::Sec1Key(der)) => {
                return Ok(PrivateKeyDer::Sec1(der.secret_sec1_der().to_vec()));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Err(KeyPairError::NoKeyPemData)
}

fn public_key_from_private(key: &PrivateKeyDer) -> Result<PublicKeyData, KeyPairError> {
    match key {
        PrivateKeyDer::Pkcs1(der) => rsa_components(der),
        PrivateKeyDer::Sec1(der) => {
            let ec = sec1::EcPrivateKey::try_from(der.as_slice())
                .map_err(|_| KeyPairError::MalformedPrivateKey)?;
            let curve = ec
                .parameters
                .as_ref()
                .and_then(|params| params.named_curve())
                .and_then(|oid| curve_from_const_oid(&oid))
                .ok_or(KeyPairError::MalformedPrivateKey)?;
            ec_public(curve, &ec)
        }
        PrivateKeyDer::Pkcs8(der) => {
            let info = pkcs8::PrivateKeyInfo::try_from(der.as_slice())
                .map_err(|_| KeyPairError::MalformedPrivateKey)?;
            if info.algorithm.oid == ALGO_RSA {
                rsa_components(info.private_key)
            } else if info.algorithm.oid == ALGO_EC {
                let curve = info
                    .algorithm
                    .parameters_oid()
                    .ok()
                    .and_then(|oid| curve_from_const_oid(&oid))
                    .ok_or(KeyPairError::MalformedPrivateKey)?;
                let ec = sec1::EcPrivateKey::try_from(info.private_key)
                    .map_err(|_| KeyPairError::MalformedPrivateKey)?;
                ec_public(curve, &ec)
            } else if info.algorithm.oid == ALGO_ED25519 {
                let signing = SigningKey::from_pkcs8_der(der)
                    .map_err(|_| KeyPairError::MalformedPrivateKey)?;
                Ok(PublicKeyData::Ed25519(
                    signing.verifying_key().to_bytes().to_vec(),
                ))
            } else {
                Err(KeyPairError::UnknownAlgorithm)
            }
        }
    }
}

fn rsa_components(der: &[u8]) -> Result<PublicKeyData, KeyPairError> {
    let key =
        pkcs1::RsaPrivateKey::try_from(der).map_err(|_| KeyPairError::MalformedPrivateKey)?;
    Ok(PublicKeyData::Rsa {
        modulus: strip_leading_zeros(key.modulus.as_bytes()).to_vec(),
        exponent: strip_leading_zeros(key.public_exponent.as_bytes()).to_vec(),
    })
}

fn ec_public(curve: NamedCurve, ec: &sec1::EcPrivateKey<'_>) -> Result<PublicKeyData, KeyPairError> {
    if let Some(point) = ec.public_key {
        return Ok(PublicKeyData::Ec {
            curve,
            point: point.to_vec(),
        });
    }
    // Keys serialized without their public half require point derivation.
    match curve {
        NamedCurve::P256 => {
            let secret = p256::SecretKey::from_slice(ec.private_key)
                .map_err(|_| KeyPairError::MalformedPrivateKey)?;
            let point = secret.public_key().to_encoded_point(false);
            Ok(PublicKeyData::Ec {
                curve,
                point: point.as_bytes().to_vec(),
            })
        }
        _ => Err(KeyPairError::MalformedPrivateKey),
    }
}

fn public_key_from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Result<PublicKeyData, KeyPairError> {
    if spki.algorithm.algorithm == OID_SIG_ED25519 {
        return Ok(PublicKeyData::Ed25519(spki.subject_public_key.data.to_vec()));
    }
    match spki.parsed() {
        Ok(PublicKey::RSA(rsa)) => Ok(PublicKeyData::Rsa {
            modulus: strip_leading_zeros(rsa.modulus).to_vec(),
            exponent: strip_leading_zeros(rsa.exponent).to_vec(),
        }),
        Ok(PublicKey::EC(point)) => {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .and_then(|oid| curve_from_x509_oid(&oid))
                .ok_or(KeyPairError::UnknownAlgorithm)?;
            Ok(PublicKeyData::Ec {
                curve,
                point: point.data().to_vec(),
            })
        }
        _ => Err(KeyPairError::UnknownAlgorithm),
    }
}

fn curve_from_const_oid(oid: &ObjectIdentifier) -> Option<NamedCurve> {
    if *oid == CURVE_P256 {
        Some(NamedCurve::P256)
    } else if *oid == CURVE_P384 {
        Some(NamedCurve::P384)
    } else if *oid == CURVE_P521 {
        Some(NamedCurve::P521)
    } else {
        None
    }
}

fn curve_from_x509_oid(oid: &Oid<'_>) -> Option<NamedCurve> {
    if *oid == X509_CURVE_P256 {
        Some(NamedCurve::P256)
    } else if *oid == X509_CURVE_P384 {
        Some(NamedCurve::P384)
    } else if *oid == X509_CURVE_P521 {
        Some(NamedCurve::P521)
    } else {
        None
    }
}

fn bit_len(stripped: &[u8]) -> u32 {
    match stripped {
        [] | [0] => 0,
        _ => stripped.len() as u32 * 8 - stripped[0].leading_zeros(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_certificate_input_reported_first() {
        assert_eq!(
            check_key_pair(b"test", b"test"),
            Err(KeyPairError::NoCertificatePemData)
        );
    }

    #[test]
    fn error_strings_are_canonical() {
        assert_eq!(
            KeyPairError::NoCertificatePemData.to_string(),
            "tls: failed to find any PEM data in certificate input"
        );
        assert_eq!(
            KeyPairError::NoKeyPemData.to_string(),
            "tls: failed to find any PEM data in key input"
        );
        assert_eq!(
            KeyPairError::KeyMismatch.to_string(),
            "tls: private key does not match public key"
        );
    }

    #[test]
    fn modulus_bit_length() {
        assert_eq!(bit_len(&[0x80]), 8);
        assert_eq!(bit_len(&[0x01, 0x00]), 9);
        assert_eq!(bit_len(&[0]), 0);
    }
}
