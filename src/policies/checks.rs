//! Policies shared by the trigger and readiness chains.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use k8s_openapi::ByteString;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::api::{
    issuer_groups_equal, issuer_kinds_equal, ISSUER_GROUP_ANNOTATION_KEY,
    ISSUER_KIND_ANNOTATION_KEY, ISSUER_NAME_ANNOTATION_KEY, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY,
};
use crate::clock::{time_string, Clock};
use crate::pki;

use super::{Input, Reason, Violation};

pub fn secret_does_not_exist(input: &Input<'_>) -> Option<Violation> {
    if input.secret.is_none() {
        return Some(Violation::new(
            Reason::DoesNotExist,
            "Issuing certificate as Secret does not exist",
        ));
    }
    None
}

pub fn secret_is_missing_data(input: &Input<'_>) -> Option<Violation> {
    let secret = input.secret?;
    let empty = secret.data.as_ref().map_or(true, |data| data.is_empty());
    if empty {
        return Some(Violation::new(
            Reason::MissingData,
            "Issuing certificate as Secret does not contain any data",
        ));
    }
    None
}

pub fn secret_is_missing_key_pair(input: &Input<'_>) -> Option<Violation> {
    if secret_data(input, TLS_PRIVATE_KEY_KEY).is_none() {
        return Some(Violation::new(
            Reason::MissingData,
            "Issuing certificate as Secret does not contain a private key",
        ));
    }
    if secret_data(input, TLS_CERT_KEY).is_none() {
        return Some(Violation::new(
            Reason::MissingData,
            "Issuing certificate as Secret does not contain a certificate",
        ));
    }
    None
}

pub fn secret_key_pair_valid(input: &Input<'_>) -> Option<Violation> {
    let key = secret_data(input, TLS_PRIVATE_KEY_KEY)?;
    let cert = secret_data(input, TLS_CERT_KEY)?;
    if let Err(err) = pki::check_key_pair(cert, key) {
        return Some(Violation::new(
            Reason::InvalidKeyPair,
            format!("Issuing certificate as Secret contains an invalid key-pair: {err}"),
        ));
    }
    None
}

pub fn secret_issuer_annotations_match(input: &Input<'_>) -> Option<Violation> {
    let secret = input.secret?;
    let annotations = secret.metadata.annotations.as_ref();
    let annotation = |key: &str| {
        annotations
            .and_then(|map| map.get(key))
            .map(String::as_str)
            .unwrap_or("")
    };
    let name = annotation(ISSUER_NAME_ANNOTATION_KEY);
    let kind = annotation(ISSUER_KIND_ANNOTATION_KEY);
    let group = annotation(ISSUER_GROUP_ANNOTATION_KEY);

    let issuer_ref = &input.certificate.spec.issuer_ref;
    if name != issuer_ref.name
        || !issuer_kinds_equal(kind, &issuer_ref.kind)
        || !issuer_groups_equal(group, &issuer_ref.group)
    {
        // The message reports what the Secret claims, not what the spec wants.
        return Some(Violation::new(
            Reason::IncorrectIssuer,
            format!(
                "Issuing certificate as Secret was previously issued by {}",
                format_issuer(name, kind, group)
            ),
        ));
    }
    None
}

pub fn current_request_valid_for_spec(input: &Input<'_>) -> Option<Violation> {
    let request = input.current_revision_request?;
    match pki::request_violations(input.certificate, request) {
        Err(err) => Some(Violation::new(
            Reason::RequestChanged,
            format!("Failed to decode CSR on CertificateRequest: {err}"),
        )),
        Ok(violations) if !violations.is_empty() => Some(Violation::new(
            Reason::RequestChanged,
            format!(
                "Fields on existing CertificateRequest resource not up to date: [{}]",
                violations.join(" ")
            ),
        )),
        Ok(_) => None,
    }
}

/// Compare the stored certificate to the spec. Only meaningful when no
/// request exists for the current revision; a live request is the
/// authoritative comparison target because the Secret may lag a
/// still-completing issuance.
pub fn current_secret_valid_for_spec(input: &Input<'_>) -> Option<Violation> {
    if input.current_revision_request.is_some() {
        return None;
    }
    let cert = secret_data(input, TLS_CERT_KEY)?;
    match pki::secret_violations(input.certificate, cert) {
        Err(err) => Some(Violation::new(
            Reason::InvalidCertificate,
            format!("Failed to decode stored certificate: {err}"),
        )),
        Ok(violations) if !violations.is_empty() => Some(Violation::new(
            Reason::SecretMismatch,
            format!(
                "Existing issued Secret is not up to date for spec: [{}]",
                violations.join(" ")
            ),
        )),
        Ok(_) => None,
    }
}

/// Trigger renewal once `status.renewalTime` is due. The bound is inclusive:
/// a renewal scheduled for exactly now is due.
pub fn renewal_time_reached(
    clock: Arc<dyn Clock>,
) -> impl Fn(&Input<'_>) -> Option<Violation> + Send + Sync {
    move |input| {
        let status = input.certificate.status.as_ref()?;
        let renewal_time = status.renewal_time.as_ref()?;
        if renewal_time.0 <= clock.now() {
            return Some(Violation::new(
                Reason::Renewing,
                format!(
                    "Renewing certificate as renewal was scheduled at {}",
                    time_string(&renewal_time.0)
                ),
            ));
        }
        None
    }
}

pub fn certificate_expired(
    clock: Arc<dyn Clock>,
) -> impl Fn(&Input<'_>) -> Option<Violation> + Send + Sync {
    move |input| {
        let not_after = stored_not_after(input)?;
        if not_after <= clock.now() {
            return Some(Violation::new(
                Reason::Expired,
                format!("Certificate expired on {}", time_string(&not_after)),
            ));
        }
        None
    }
}

fn stored_not_after(input: &Input<'_>) -> Option<DateTime<Utc>> {
    let pem = secret_data(input, TLS_CERT_KEY)?;
    let der = pki::certificate_der_from_pem(pem).ok()?;
    let (_, cert) = X509Certificate::from_der(&der).ok()?;
    Utc.timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
}

fn secret_data<'a>(input: &Input<'a>, key: &str) -> Option<&'a [u8]> {
    let data = input.secret?.data.as_ref()?;
    match data.get(key) {
        Some(ByteString(bytes)) if !bytes.is_empty() => Some(bytes.as_slice()),
        _ => None,
    }
}

fn format_issuer(name: &str, kind: &str, group: &str) -> String {
    let kind = if kind.is_empty() { "Issuer" } else { kind };
    let group = if group.is_empty() {
        "cert-manager.io"
    } else {
        group
    };
    format!("{kind}.{group}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_formatting_applies_defaults() {
        assert_eq!(
            format_issuer("oldissuer", "", ""),
            "Issuer.cert-manager.io/oldissuer"
        );
        assert_eq!(
            format_issuer("testissuer", "IssuerKind", "new.example.com"),
            "IssuerKind.new.example.com/testissuer"
        );
    }
}
