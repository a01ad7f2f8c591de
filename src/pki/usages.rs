//! Mapping between declared key usages and X.509 extension values.

use std::collections::BTreeSet;

use x509_parser::extensions::ExtendedKeyUsage;

use crate::api::KeyUsage;

pub(crate) const KU_DIGITAL_SIGNATURE: u16 = 1 << 0;
pub(crate) const KU_CONTENT_COMMITMENT: u16 = 1 << 1;
pub(crate) const KU_KEY_ENCIPHERMENT: u16 = 1 << 2;
pub(crate) const KU_DATA_ENCIPHERMENT: u16 = 1 << 3;
pub(crate) const KU_KEY_AGREEMENT: u16 = 1 << 4;
pub(crate) const KU_CERT_SIGN: u16 = 1 << 5;
pub(crate) const KU_CRL_SIGN: u16 = 1 << 6;
pub(crate) const KU_ENCIPHER_ONLY: u16 = 1 << 7;
pub(crate) const KU_DECIPHER_ONLY: u16 = 1 << 8;

const EKU_ANY: &str = "2.5.29.37.0";
const EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
const EKU_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
const EKU_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";
const EKU_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
const EKU_IPSEC_END_SYSTEM: &str = "1.3.6.1.5.5.7.3.5";
const EKU_IPSEC_TUNNEL: &str = "1.3.6.1.5.5.7.3.6";
const EKU_IPSEC_USER: &str = "1.3.6.1.5.5.7.3.7";
const EKU_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
const EKU_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";
const EKU_MICROSOFT_SGC: &str = "1.3.6.1.4.1.311.10.3.3";
const EKU_NETSCAPE_SGC: &str = "2.16.840.1.113730.4.1";

/// The key-usage bits and extended-key-usage OIDs a usage list implies.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct UsageProfile {
    pub bits: u16,
    pub ekus: BTreeSet<String>,
}

pub(crate) fn usage_profile(usages: &[KeyUsage]) -> UsageProfile {
    let mut profile = UsageProfile::default();
    for usage in usages {
        match usage {
            KeyUsage::Signing | KeyUsage::DigitalSignature => {
                profile.bits |= KU_DIGITAL_SIGNATURE;
            }
            KeyUsage::ContentCommitment => profile.bits |= KU_CONTENT_COMMITMENT,
            KeyUsage::KeyEncipherment => profile.bits |= KU_KEY_ENCIPHERMENT,
            KeyUsage::DataEncipherment => profile.bits |= KU_DATA_ENCIPHERMENT,
            KeyUsage::KeyAgreement => profile.bits |= KU_KEY_AGREEMENT,
            KeyUsage::CertSign => profile.bits |= KU_CERT_SIGN,
            KeyUsage::CrlSign => profile.bits |= KU_CRL_SIGN,
            KeyUsage::EncipherOnly => profile.bits |= KU_ENCIPHER_ONLY,
            KeyUsage::DecipherOnly => profile.bits |= KU_DECIPHER_ONLY,
            KeyUsage::Any => insert(&mut profile, EKU_ANY),
            KeyUsage::ServerAuth => insert(&mut profile, EKU_SERVER_AUTH),
            KeyUsage::ClientAuth => insert(&mut profile, EKU_CLIENT_AUTH),
            KeyUsage::CodeSigning => insert(&mut profile, EKU_CODE_SIGNING),
            // S/MIME has no extended key usage of its own; it rides on
            // emailProtection like the issuing subsystem encodes it.
            KeyUsage::EmailProtection | KeyUsage::Smime => {
                insert(&mut profile, EKU_EMAIL_PROTECTION);
            }
            KeyUsage::IpsecEndSystem => insert(&mut profile, EKU_IPSEC_END_SYSTEM),
            KeyUsage::IpsecTunnel => insert(&mut profile, EKU_IPSEC_TUNNEL),
            KeyUsage::IpsecUser => insert(&mut profile, EKU_IPSEC_USER),
            KeyUsage::Timestamping => insert(&mut profile, EKU_TIME_STAMPING),
            KeyUsage::OcspSigning => insert(&mut profile, EKU_OCSP_SIGNING),
            KeyUsage::MicrosoftSgc => insert(&mut profile, EKU_MICROSOFT_SGC),
            KeyUsage::NetscapeSgc => insert(&mut profile, EKU_NETSCAPE_SGC),
        }
    }
    profile
}

fn insert(profile: &mut UsageProfile, oid: &str) {
    profile.ekus.insert(oid.to_string());
}

/// Collect the OIDs asserted by an extended-key-usage extension.
pub(crate) fn eku_strings(eku: &ExtendedKeyUsage<'_>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    if eku.any {
        out.insert(EKU_ANY.to_string());
    }
    if eku.server_auth {
        out.insert(EKU_SERVER_AUTH.to_string());
    }
    if eku.client_auth {
        out.insert(EKU_CLIENT_AUTH.to_string());
    }
    if eku.code_signing {
        out.insert(EKU_CODE_SIGNING.to_string());
    }
    if eku.email_protection {
        out.insert(EKU_EMAIL_PROTECTION.to_string());
    }
    if eku.time_stamping {
        out.insert(EKU_TIME_STAMPING.to_string());
    }
    if eku.ocsp_signing {
        out.insert(EKU_OCSP_SIGNING.to_string());
    }
    for oid in &eku.other {
        out.insert(oid.to_id_string());
    }
    out
}
