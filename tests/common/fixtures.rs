//! Deterministic key, certificate and CSR factories for policy tests.
//!
//! Private keys derive from fixed seed bytes so that every run mints the
//! same material; certificates and requests are built from a `Certificate`
//! spec so that artifact-vs-spec comparisons start from a known-matching
//! state.
#![allow(dead_code)]

use std::sync::Arc;

use certkeeper::api::{Certificate, CertificateRequest, CertificateRequestSpec, CertificateSpec};
use certkeeper::FakeClock;
use chrono::{DateTime, TimeZone, Utc};
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::SigningKey;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    FieldsV1, ManagedFieldsEntry, ObjectMeta, Time,
};
use k8s_openapi::ByteString;
use rcgen::{CertificateParams, DnType, KeyPair, SanType, PKCS_ED25519};
use rustls_pki_types::PrivatePkcs8KeyDer;
use time::OffsetDateTime;

/// The instant all fixed clocks in these tests read until advanced.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn fixed_clock() -> Arc<FakeClock> {
    Arc::new(FakeClock::new(fixed_now()))
}

/// Ed25519 signer derived from a fixed seed byte.
pub fn signer(seed: u8) -> KeyPair {
    let signing = SigningKey::from_bytes(&[seed; 32]);
    let document = signing.to_pkcs8_der().expect("encode seed key");
    let der = PrivatePkcs8KeyDer::from(document.as_bytes().to_vec());
    KeyPair::from_pkcs8_der_and_sign_algo(&der, &PKCS_ED25519).expect("load seed key")
}

/// PKCS#8 PEM encoding of [`signer`]'s private key.
pub fn private_key_pem(seed: u8) -> Vec<u8> {
    signer(seed).serialize_pem().into_bytes()
}

/// Self-signed PEM certificate honoring the spec's name material, valid for
/// an hour around [`fixed_now`].
pub fn cert_pem(certificate: &Certificate, key: &KeyPair) -> Vec<u8> {
    cert_pem_with_validity(
        certificate,
        key,
        fixed_now() - chrono::Duration::minutes(30),
        fixed_now() + chrono::Duration::minutes(30),
    )
}

pub fn cert_pem_with_validity(
    certificate: &Certificate,
    key: &KeyPair,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> Vec<u8> {
    let mut params = params_for(&certificate.spec);
    params.not_before = to_offset(not_before);
    params.not_after = to_offset(not_after);
    let cert = params.self_signed(key).expect("self-signed certificate");
    cert.pem().into_bytes()
}

/// PEM PKCS#10 request carrying the spec's name material.
pub fn csr_pem(certificate: &Certificate, key: &KeyPair) -> Vec<u8> {
    let params = params_for(&certificate.spec);
    let csr = params.serialize_request(key).expect("serialize request");
    csr.pem().expect("encode request").into_bytes()
}

fn params_for(spec: &CertificateSpec) -> CertificateParams {
    let mut params = CertificateParams::new(spec.dns_names.clone().unwrap_or_default())
        .expect("certificate params");
    if let Some(common_name) = &spec.common_name {
        params
            .distinguished_name
            .push(DnType::CommonName, common_name.clone());
    }
    for ip in spec.ip_addresses.iter().flatten() {
        params
            .subject_alt_names
            .push(SanType::IpAddress(ip.parse().expect("fixture IP")));
    }
    for uri in spec.uris.iter().flatten() {
        params.subject_alt_names.push(SanType::URI(
            uri.as_str().try_into().expect("fixture URI"),
        ));
    }
    for email in spec.email_addresses.iter().flatten() {
        params.subject_alt_names.push(SanType::Rfc822Name(
            email.as_str().try_into().expect("fixture email"),
        ));
    }
    params
}

fn to_offset(t: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(t.timestamp()).expect("in-range timestamp")
}

/// Certificate with only a target secret name set.
pub fn certificate_for_secret(secret_name: &str) -> Certificate {
    Certificate::new(
        "test-certificate",
        CertificateSpec {
            secret_name: secret_name.into(),
            ..Default::default()
        },
    )
}

pub fn certificate_with_common_name(common_name: &str) -> Certificate {
    Certificate::new(
        "test-certificate",
        CertificateSpec {
            secret_name: "something".into(),
            common_name: Some(common_name.into()),
            ..Default::default()
        },
    )
}

pub fn with_renewal_time(mut certificate: Certificate, at: DateTime<Utc>) -> Certificate {
    let status = certificate.status.get_or_insert_with(Default::default);
    status.renewal_time = Some(Time(at));
    certificate
}

/// Request for the certificate's current revision, with the CSR minted from
/// `csr_source`'s spec (which may deliberately diverge from `certificate`).
pub fn request_for(certificate: &Certificate, csr_source: &Certificate, key: &KeyPair) -> CertificateRequest {
    CertificateRequest::new(
        "test-request",
        CertificateRequestSpec {
            request: ByteString(csr_pem(csr_source, key)),
            issuer_ref: certificate.spec.issuer_ref.clone(),
            ..Default::default()
        },
    )
}

pub fn secret(name: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn with_data(mut secret: Secret, entries: Vec<(&str, Vec<u8>)>) -> Secret {
    let data = secret.data.get_or_insert_with(Default::default);
    for (key, value) in entries {
        data.insert(key.to_string(), ByteString(value));
    }
    secret
}

pub fn with_annotations(mut secret: Secret, entries: Vec<(&str, &str)>) -> Secret {
    let annotations = secret.metadata.annotations.get_or_insert_with(Default::default);
    for (key, value) in entries {
        annotations.insert(key.to_string(), value.to_string());
    }
    secret
}

pub fn with_labels(mut secret: Secret, entries: Vec<(&str, &str)>) -> Secret {
    let labels = secret.metadata.labels.get_or_insert_with(Default::default);
    for (key, value) in entries {
        labels.insert(key.to_string(), value.to_string());
    }
    secret
}

pub fn with_managed_fields(mut secret: Secret, entries: Vec<ManagedFieldsEntry>) -> Secret {
    secret.metadata.managed_fields = Some(entries);
    secret
}

pub fn managed_entry(manager: &str, fields: serde_json::Value) -> ManagedFieldsEntry {
    ManagedFieldsEntry {
        manager: Some(manager.to_string()),
        fields_v1: Some(FieldsV1(fields)),
        ..Default::default()
    }
}
