//! Comparison of issued artifacts against a Certificate spec.
//!
//! Both comparators reduce an artifact (a signed certificate or a PKCS#10
//! request) to a [`ParsedIdentity`] and diff it field by field, returning the
//! dotted spec paths that diverge. The caller renders the sorted list into a
//! policy message, so path spellings are part of the external contract.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use asn1_rs::{oid, Any, Oid, Tag};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::X509Certificate;
use x509_parser::x509::X509Name;

use crate::api::{
    Certificate, CertificateRequest, CertificateSpec, KeyUsage, OtherName, PrivateKeyAlgorithm,
};

use super::keypair::describe_spki;
use super::usages::{eku_strings, usage_profile};
use super::{certificate_der_from_pem, csr_der_from_pem, parse_certificate, parse_csr, PkiError};

const OID_DN_SERIAL_NUMBER: Oid<'static> = oid!(2.5.4 .5);
const OID_DN_STREET_ADDRESS: Oid<'static> = oid!(2.5.4 .9);
const OID_DN_POSTAL_CODE: Oid<'static> = oid!(2.5.4 .17);

/// The spec-relevant facts extracted from one artifact.
#[derive(Debug, Default)]
struct ParsedIdentity {
    common_name: String,
    dns_names: Vec<String>,
    ip_addresses: Vec<String>,
    uris: Vec<String>,
    email_addresses: Vec<String>,
    other_names: Vec<(String, Option<String>)>,
    subject: SubjectAttributes,
    key_usage_bits: u16,
    ext_key_usages: BTreeSet<String>,
    is_ca: bool,
    key: Option<(PrivateKeyAlgorithm, u32)>,
    lifetime_secs: Option<i64>,
}

#[derive(Debug, Default)]
struct SubjectAttributes {
    organizations: Vec<String>,
    countries: Vec<String>,
    organizational_units: Vec<String>,
    localities: Vec<String>,
    provinces: Vec<String>,
    street_addresses: Vec<String>,
    postal_codes: Vec<String>,
    serial_number: String,
}

/// Diff the certificate stored in a Secret against the declared spec.
///
/// Returns the sorted dotted paths of the fields that no longer match; an
/// empty list means the stored certificate is up to date.
pub fn secret_violations(
    certificate: &Certificate,
    cert_pem: &[u8],
) -> Result<Vec<&'static str>, PkiError> {
    let der = certificate_der_from_pem(cert_pem)?;
    let parsed = parse_certificate(&der)?;
    let identity = identity_from_certificate(&parsed)?;

    let spec = &certificate.spec;
    let mut violations = identity_violations(spec, &identity);

    let wanted = usage_profile(spec.usages.as_deref().unwrap_or(&[]));
    if wanted.bits != identity.key_usage_bits || wanted.ekus != identity.ext_key_usages {
        violations.push("spec.usages");
    }
    if spec.is_ca != identity.is_ca {
        violations.push("spec.isCA");
    }
    if let (Some(wanted), Some(actual_secs)) = (&spec.duration, identity.lifetime_secs) {
        let wanted: std::time::Duration = wanted.clone().into();
        if wanted.as_secs() as i64 != actual_secs {
            violations.push("spec.duration");
        }
    }

    violations.sort_unstable();
    violations.dedup();
    Ok(violations)
}

/// Diff an in-flight CertificateRequest against the declared spec.
///
/// Name material comes from the embedded CSR; usages, CA flag, duration and
/// the issuer reference are resource-level fields on the request itself.
pub fn request_violations(
    certificate: &Certificate,
    request: &CertificateRequest,
) -> Result<Vec<&'static str>, PkiError> {
    let der = csr_der_from_pem(&request.spec.request.0)?;
    let parsed = parse_csr(&der)?;
    let identity = identity_from_csr(&parsed)?;

    let spec = &certificate.spec;
    let mut violations = identity_violations(spec, &identity);

    if !request.spec.issuer_ref.matches(&spec.issuer_ref) {
        violations.push("spec.issuerRef");
    }
    if request.spec.is_ca != spec.is_ca {
        violations.push("spec.isCA");
    }
    if usage_set(&request.spec.usages) != usage_set(&spec.usages) {
        violations.push("spec.usages");
    }
    let request_duration = request.spec.duration.clone().map(std::time::Duration::from);
    let spec_duration = spec.duration.clone().map(std::time::Duration::from);
    if request_duration.map(|d| d.as_secs()) != spec_duration.map(|d| d.as_secs()) {
        violations.push("spec.duration");
    }

    violations.sort_unstable();
    violations.dedup();
    Ok(violations)
}

fn identity_violations(spec: &CertificateSpec, identity: &ParsedIdentity) -> Vec<&'static str> {
    let mut violations = Vec::new();

    if spec.common_name.as_deref().unwrap_or("") != identity.common_name {
        violations.push("spec.commonName");
    }
    if declared_set(&spec.dns_names, |s| s.clone()) != actual_set(&identity.dns_names) {
        violations.push("spec.dnsNames");
    }
    if declared_set(&spec.ip_addresses, |s| canonical_ip(s)) != actual_set(&identity.ip_addresses)
    {
        violations.push("spec.ipAddresses");
    }
    if declared_set(&spec.uris, |s| canonical_uri(s)) != actual_set(&identity.uris) {
        violations.push("spec.uris");
    }
    if declared_set(&spec.email_addresses, |s| s.clone()) != actual_set(&identity.email_addresses)
    {
        violations.push("spec.emailAddresses");
    }
    if !other_names_match(&spec.other_names, &identity.other_names) {
        violations.push("spec.otherNames");
    }
    if !subject_matches(spec, &identity.subject) {
        violations.push("spec.subject");
    }
    if let Some(private_key) = &spec.private_key {
        let matches = match identity.key {
            Some((algorithm, bits)) => {
                let wanted_algorithm =
                    private_key.algorithm.unwrap_or(PrivateKeyAlgorithm::Rsa);
                if wanted_algorithm != algorithm {
                    false
                } else if wanted_algorithm == PrivateKeyAlgorithm::Ed25519 {
                    true
                } else {
                    let wanted_bits = private_key.size.unwrap_or(match wanted_algorithm {
                        PrivateKeyAlgorithm::Rsa => 2048,
                        _ => 256,
                    });
                    wanted_bits == bits
                }
            }
            None => false,
        };
        if !matches {
            violations.push("spec.privateKey");
        }
    }

    violations
}

fn identity_from_certificate(cert: &X509Certificate<'_>) -> Result<ParsedIdentity, PkiError> {
    let mut identity = ParsedIdentity {
        common_name: common_name(cert.subject()),
        subject: subject_attributes(cert.subject()),
        key: describe_spki(cert.public_key()),
        ..Default::default()
    };

    if let Some(san) = cert
        .subject_alternative_name()
        .map_err(|err| PkiError::ParseCertificate(err.to_string()))?
    {
        collect_general_names(&san.value.general_names, &mut identity);
    }
    if let Some(ku) = cert
        .key_usage()
        .map_err(|err| PkiError::ParseCertificate(err.to_string()))?
    {
        identity.key_usage_bits = ku.value.flags;
    }
    if let Some(eku) = cert
        .extended_key_usage()
        .map_err(|err| PkiError::ParseCertificate(err.to_string()))?
    {
        identity.ext_key_usages = eku_strings(eku.value);
    }
    if let Some(bc) = cert
        .basic_constraints()
        .map_err(|err| PkiError::ParseCertificate(err.to_string()))?
    {
        identity.is_ca = bc.value.ca;
    }

    let validity = cert.validity();
    identity.lifetime_secs =
        Some(validity.not_after.timestamp() - validity.not_before.timestamp());

    Ok(identity)
}

fn identity_from_csr(csr: &X509CertificationRequest<'_>) -> Result<ParsedIdentity, PkiError> {
    let info = &csr.certification_request_info;
    let mut identity = ParsedIdentity {
        common_name: common_name(&info.subject),
        subject: subject_attributes(&info.subject),
        key: describe_spki(&info.subject_pki),
        ..Default::default()
    };

    if let Some(extensions) = csr.requested_extensions() {
        for extension in extensions {
            match extension {
                ParsedExtension::SubjectAlternativeName(san) => {
                    collect_general_names(&san.general_names, &mut identity);
                }
                ParsedExtension::KeyUsage(ku) => identity.key_usage_bits = ku.flags,
                ParsedExtension::ExtendedKeyUsage(eku) => {
                    identity.ext_key_usages = eku_strings(eku);
                }
                ParsedExtension::BasicConstraints(bc) => identity.is_ca = bc.ca,
                _ => {}
            }
        }
    }

    Ok(identity)
}

fn collect_general_names(names: &[GeneralName<'_>], identity: &mut ParsedIdentity) {
    for name in names {
        match name {
            GeneralName::DNSName(dns) => identity.dns_names.push((*dns).to_string()),
            GeneralName::RFC822Name(email) => identity.email_addresses.push((*email).to_string()),
            GeneralName::URI(uri) => identity.uris.push(canonical_uri(uri)),
            GeneralName::IPAddress(raw) => {
                if let Some(ip) = ip_from_bytes(raw) {
                    identity.ip_addresses.push(ip.to_string());
                }
            }
            GeneralName::OtherName(oid, value) => identity
                .other_names
                .push((oid.to_id_string(), other_name_utf8(value))),
            _ => {}
        }
    }
}

fn common_name(name: &X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .unwrap_or("")
        .to_string()
}

fn subject_attributes(name: &X509Name<'_>) -> SubjectAttributes {
    SubjectAttributes {
        organizations: attr_values(name.iter_organization()),
        countries: attr_values(name.iter_country()),
        organizational_units: attr_values(name.iter_organizational_unit()),
        localities: attr_values(name.iter_locality()),
        provinces: attr_values(name.iter_state_or_province()),
        street_addresses: attr_values(name.iter_by_oid(&OID_DN_STREET_ADDRESS)),
        postal_codes: attr_values(name.iter_by_oid(&OID_DN_POSTAL_CODE)),
        serial_number: name
            .iter_by_oid(&OID_DN_SERIAL_NUMBER)
            .next()
            .and_then(|attr| attr.as_str().ok())
            .unwrap_or("")
            .to_string(),
    }
}

fn attr_values<'a>(
    iter: impl Iterator<Item = &'a x509_parser::x509::AttributeTypeAndValue<'a>>,
) -> Vec<String> {
    iter.filter_map(|attr| attr.as_str().ok())
        .map(str::to_string)
        .collect()
}

fn subject_matches(spec: &CertificateSpec, actual: &SubjectAttributes) -> bool {
    let declared = spec.subject.clone().unwrap_or_default();
    declared_set(&declared.organizations, |s| s.clone()) == actual_set(&actual.organizations)
        && declared_set(&declared.countries, |s| s.clone()) == actual_set(&actual.countries)
        && declared_set(&declared.organizational_units, |s| s.clone())
            == actual_set(&actual.organizational_units)
        && declared_set(&declared.localities, |s| s.clone()) == actual_set(&actual.localities)
        && declared_set(&declared.provinces, |s| s.clone()) == actual_set(&actual.provinces)
        && declared_set(&declared.street_addresses, |s| s.clone())
            == actual_set(&actual.street_addresses)
        && declared_set(&declared.postal_codes, |s| s.clone())
            == actual_set(&actual.postal_codes)
        && declared.serial_number.as_deref().unwrap_or("") == actual.serial_number
}

fn other_names_match(
    declared: &Option<Vec<OtherName>>,
    actual: &[(String, Option<String>)],
) -> bool {
    if actual.iter().any(|(_, value)| value.is_none()) {
        return false;
    }
    let declared: BTreeSet<(String, String)> = declared
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|other| (other.oid.clone(), other.utf8_value.clone()))
        .collect();
    let actual: BTreeSet<(String, String)> = actual
        .iter()
        .filter_map(|(oid, value)| value.as_ref().map(|v| (oid.clone(), v.clone())))
        .collect();
    declared == actual
}

// The otherName value is usually a context-specific [0] EXPLICIT wrapper
// around a string type; some encoders emit the string directly.
fn other_name_utf8(raw: &[u8]) -> Option<String> {
    use asn1_rs::FromDer;
    let (_, outer) = Any::from_der(raw).ok()?;
    if let Some(text) = any_string(&outer) {
        return Some(text);
    }
    let (_, inner) = Any::from_der(outer.data).ok()?;
    any_string(&inner)
}

fn any_string(any: &Any<'_>) -> Option<String> {
    match any.header.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
            std::str::from_utf8(any.data).ok().map(str::to_string)
        }
        _ => None,
    }
}

fn usage_set(usages: &Option<Vec<KeyUsage>>) -> BTreeSet<KeyUsage> {
    usages.as_deref().unwrap_or(&[]).iter().copied().collect()
}

fn declared_set(values: &Option<Vec<String>>, canon: impl Fn(&String) -> String) -> BTreeSet<String> {
    values.as_deref().unwrap_or(&[]).iter().map(canon).collect()
}

fn actual_set(values: &[String]) -> BTreeSet<String> {
    values.iter().cloned().collect()
}

fn canonical_ip(raw: &str) -> String {
    raw.parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn canonical_uri(raw: &str) -> String {
    url::Url::parse(raw)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn ip_from_bytes(raw: &[u8]) -> Option<IpAddr> {
    match raw.len() {
        4 => {
            let octets: [u8; 4] = raw.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = raw.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_canonicalization_normalizes_leading_zeros_and_case() {
        assert_eq!(canonical_ip("2001:DB8::1"), "2001:db8::1");
        assert_eq!(canonical_ip("192.168.1.1"), "192.168.1.1");
        assert_eq!(canonical_ip("not-an-ip"), "not-an-ip");
    }

    #[test]
    fn other_name_utf8_reads_explicitly_tagged_payload() {
        // [0] EXPLICIT { UTF8String "device-1" }
        let raw = [
            0xA0, 0x0A, 0x0C, 0x08, b'd', b'e', b'v', b'i', b'c', b'e', b'-', b'1',
        ];
        assert_eq!(other_name_utf8(&raw), Some("device-1".to_string()));
    }

    #[test]
    fn other_name_mismatch_when_payload_unreadable() {
        let actual = vec![("1.2.3.4".to_string(), None)];
        assert!(!other_names_match(&None, &actual));
    }

    #[test]
    fn declared_and_actual_sets_ignore_order() {
        let declared = Some(vec!["b.example.com".to_string(), "a.example.com".to_string()]);
        let actual = vec!["a.example.com".to_string(), "b.example.com".to_string()];
        assert_eq!(declared_set(&declared, |s| s.clone()), actual_set(&actual));
    }
}
