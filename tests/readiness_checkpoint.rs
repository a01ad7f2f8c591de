#[path = "common/fixtures.rs"]
mod fixtures;

use std::collections::BTreeMap;
use std::sync::Arc;

use certkeeper::api::{
    CertificateSpec, IssuerRef, SecretTemplate, ISSUER_GROUP_ANNOTATION_KEY,
    ISSUER_KIND_ANNOTATION_KEY, ISSUER_NAME_ANNOTATION_KEY, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY,
};
use certkeeper::{Certificate, Input, PolicyChain, Reason};
use k8s_openapi::api::core::v1::Secret;
use serde_json::json;

use fixtures::*;

const FIELD_MANAGER: &str = "certkeeper";

fn readiness_chain() -> PolicyChain {
    PolicyChain::readiness(fixed_clock(), FIELD_MANAGER)
}

/// A certificate with a secret template, plus a fully conformant Secret: a
/// valid matching key pair, correct issuer annotations, template values
/// applied, and managed-field ownership that mirrors the template.
fn conformant_pair() -> (Certificate, Secret) {
    let certificate = Certificate::new(
        "test-certificate",
        CertificateSpec {
            secret_name: "something".into(),
            common_name: Some("example.com".into()),
            issuer_ref: IssuerRef {
                name: "testissuer".into(),
                kind: "IssuerKind".into(),
                group: "group.example.com".into(),
            },
            secret_template: Some(SecretTemplate {
                annotations: Some(BTreeMap::from([("foo1".to_string(), "bar1".to_string())])),
                labels: Some(BTreeMap::from([("abc".to_string(), "123".to_string())])),
            }),
            ..Default::default()
        },
    );

    let key = signer(7);
    let secret = with_managed_fields(
        with_labels(
            with_annotations(
                with_data(
                    secret("something"),
                    vec![
                        (TLS_PRIVATE_KEY_KEY, private_key_pem(7)),
                        (TLS_CERT_KEY, cert_pem(&certificate, &key)),
                    ],
                ),
                vec![
                    (ISSUER_NAME_ANNOTATION_KEY, "testissuer"),
                    (ISSUER_KIND_ANNOTATION_KEY, "IssuerKind"),
                    (ISSUER_GROUP_ANNOTATION_KEY, "group.example.com"),
                    ("foo1", "bar1"),
                ],
            ),
            vec![("abc", "123")],
        ),
        vec![managed_entry(
            FIELD_MANAGER,
            json!({"f:metadata": {
                "f:annotations": {
                    "f:foo1": {},
                    "f:cert-manager.io/certificate-name": {},
                    "f:cert-manager.io/issuer-name": {},
                    "f:cert-manager.io/issuer-kind": {},
                    "f:cert-manager.io/issuer-group": {}
                },
                "f:labels": {"f:abc": {}}
            }}),
        )],
    );

    (certificate, secret)
}

fn evaluate(chain: &PolicyChain, certificate: &Certificate, secret: &Secret) -> Option<Reason> {
    chain
        .evaluate(&Input {
            certificate,
            current_revision_request: None,
            secret: Some(secret),
        })
        .map(|violation| violation.reason)
}

#[test]
fn accepts_a_fresh_conformant_secret() {
    let chain = readiness_chain();
    let (certificate, secret) = conformant_pair();
    for _ in 0..3 {
        assert_eq!(evaluate(&chain, &certificate, &secret), None);
    }
}

#[test]
fn scheduled_renewal_is_not_drift() {
    // The readiness chain carries no renewal policy: a certificate due for
    // renewal is still faithful to its spec.
    let chain = readiness_chain();
    let (certificate, secret) = conformant_pair();
    let certificate =
        with_renewal_time(certificate, fixed_now() - chrono::Duration::minutes(5));
    assert_eq!(evaluate(&chain, &certificate, &secret), None);
}

#[test]
fn reports_template_value_drift_before_ownership_drift() {
    let chain = readiness_chain();
    let (certificate, mut secret) = conformant_pair();
    secret
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert("foo1".to_string(), "changed".to_string());
    let chain_verdict = chain
        .evaluate(&Input {
            certificate: &certificate,
            current_revision_request: None,
            secret: Some(&secret),
        })
        .expect("violation");
    assert_eq!(chain_verdict.reason, Reason::SecretTemplateMismatch);
    assert_eq!(
        chain_verdict.message,
        "Certificate's SecretTemplate Annotations missing or incorrect value on Secret"
    );
}

#[test]
fn reports_lingering_ownership_after_template_removal() {
    let chain = readiness_chain();
    let (mut certificate, mut secret) = conformant_pair();
    certificate.spec.secret_template = None;
    // The previously-templated annotation and label remain owned.
    secret.metadata.annotations = Some(BTreeMap::from([
        (ISSUER_NAME_ANNOTATION_KEY.to_string(), "testissuer".to_string()),
        (ISSUER_KIND_ANNOTATION_KEY.to_string(), "IssuerKind".to_string()),
        (
            ISSUER_GROUP_ANNOTATION_KEY.to_string(),
            "group.example.com".to_string(),
        ),
    ]));
    let chain_verdict = chain
        .evaluate(&Input {
            certificate: &certificate,
            current_revision_request: None,
            secret: Some(&secret),
        })
        .expect("violation");
    assert_eq!(chain_verdict.reason, Reason::SecretTemplateMismatch);
    assert_eq!(
        chain_verdict.message,
        "SecretTemplate is nil, but Secret contains extra managed entries"
    );
}

#[test]
fn reports_expired_certificate_as_drift() {
    let chain = readiness_chain();
    let (certificate, secret) = conformant_pair();
    let key = signer(7);
    let mut secret = secret;
    secret.data.get_or_insert_with(Default::default).insert(
        TLS_CERT_KEY.to_string(),
        k8s_openapi::ByteString(cert_pem_with_validity(
            &certificate,
            &key,
            fixed_now() - chrono::Duration::minutes(30),
            fixed_now() - chrono::Duration::minutes(1),
        )),
    );
    assert_eq!(
        evaluate(&chain, &certificate, &secret),
        Some(Reason::Expired)
    );
}

#[test]
fn chains_evaluate_concurrently() {
    let chain = Arc::new(readiness_chain());
    let (certificate, secret) = conformant_pair();
    let certificate = Arc::new(certificate);
    let secret = Arc::new(secret);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let chain = Arc::clone(&chain);
            let certificate = Arc::clone(&certificate);
            let secret = Arc::clone(&secret);
            std::thread::spawn(move || {
                evaluate(&chain, &certificate, &secret).is_none()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("evaluation thread"));
    }
}
