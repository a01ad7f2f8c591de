use std::collections::BTreeMap;

use duration_string::DurationString;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_ISSUER_GROUP, DEFAULT_ISSUER_KIND};

/// Declarative description of a desired X.509 certificate.
///
/// The controller keeps the target Secret named by `secret_name` in sync with
/// this spec; every policy in this crate evaluates against it.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "Certificate",
    namespaced,
    derive = "Default",
    status = "CertificateStatus",
    shortname = "cert"
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Name of the Secret the issued key pair is written to.
    pub secret_name: String,

    /// Annotations and labels to reconcile onto the target Secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_template: Option<SecretTemplate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,

    /// Distinguished-name fields other than the common name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<X509Subject>,

    /// Requested certificate lifetime, e.g. `"2160h"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub duration: Option<DurationString>,

    /// How long before expiry the certificate should be renewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub renew_before: Option<DurationString>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_names: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_addresses: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_names: Option<Vec<OtherName>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usages: Option<Vec<KeyUsage>>,

    #[serde(default, rename = "isCA")]
    pub is_ca: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<CertificatePrivateKey>,

    /// Reference to the issuer that signs revisions of this certificate.
    pub issuer_ref: IssuerRef,
}

/// Observed state written back by the controller.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub conditions: Option<Vec<Condition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub not_before: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub not_after: Option<Time>,

    /// When the next renewal is scheduled. Reaching it triggers re-issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub renewal_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_failure_time: Option<Time>,
}

/// Reference to the signing authority, `(name, kind, group)`.
///
/// Kind and group default to `Issuer` and `cert-manager.io` when empty; the
/// equality helpers treat the empty string and the default as the same value
/// so that defaulted and explicit references never read as drift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
}

impl IssuerRef {
    pub fn kind_or_default(&self) -> &str {
        if self.kind.is_empty() {
            DEFAULT_ISSUER_KIND
        } else {
            &self.kind
        }
    }

    pub fn group_or_default(&self) -> &str {
        if self.group.is_empty() {
            DEFAULT_ISSUER_GROUP
        } else {
            &self.group
        }
    }

    pub fn matches(&self, other: &IssuerRef) -> bool {
        self.name == other.name
            && issuer_kinds_equal(&self.kind, &other.kind)
            && issuer_groups_equal(&self.group, &other.group)
    }
}

/// Compare issuer kinds, treating the empty string as the default kind.
pub fn issuer_kinds_equal(a: &str, b: &str) -> bool {
    let a = if a.is_empty() { DEFAULT_ISSUER_KIND } else { a };
    let b = if b.is_empty() { DEFAULT_ISSUER_KIND } else { b };
    a == b
}

/// Compare issuer groups, treating the empty string as the default group.
pub fn issuer_groups_equal(a: &str, b: &str) -> bool {
    let a = if a.is_empty() { DEFAULT_ISSUER_GROUP } else { a };
    let b = if b.is_empty() { DEFAULT_ISSUER_GROUP } else { b };
    a == b
}

/// Annotations and labels the controller applies to the target Secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// X.509 distinguished-name attributes, excluding the common name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct X509Subject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_units: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provinces: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_codes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

/// A SAN entry carried as an `otherName`, identified by OID with a UTF-8
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtherName {
    pub oid: String,
    pub utf8_value: String,
}

/// Requested private-key properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePrivateKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<PrivateKeyAlgorithm>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<PrivateKeyEncoding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_policy: Option<PrivateKeyRotationPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum PrivateKeyAlgorithm {
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "ECDSA")]
    Ecdsa,
    Ed25519,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum PrivateKeyEncoding {
    #[serde(rename = "PKCS1")]
    Pkcs1,
    #[serde(rename = "PKCS8")]
    Pkcs8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum PrivateKeyRotationPolicy {
    Never,
    Always,
}

/// The closed vocabulary of requested key usages.
///
/// Serialized forms match the strings other controllers in the
/// `cert-manager.io` group persist, so the renames are load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
pub enum KeyUsage {
    #[serde(rename = "signing")]
    Signing,
    #[serde(rename = "digital signature")]
    DigitalSignature,
    #[serde(rename = "content commitment")]
    ContentCommitment,
    #[serde(rename = "key encipherment")]
    KeyEncipherment,
    #[serde(rename = "key agreement")]
    KeyAgreement,
    #[serde(rename = "data encipherment")]
    DataEncipherment,
    #[serde(rename = "cert sign")]
    CertSign,
    #[serde(rename = "crl sign")]
    CrlSign,
    #[serde(rename = "encipher only")]
    EncipherOnly,
    #[serde(rename = "decipher only")]
    DecipherOnly,
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "server auth")]
    ServerAuth,
    #[serde(rename = "client auth")]
    ClientAuth,
    #[serde(rename = "code signing")]
    CodeSigning,
    #[serde(rename = "email protection")]
    EmailProtection,
    #[serde(rename = "s/mime")]
    Smime,
    #[serde(rename = "ipsec end system")]
    IpsecEndSystem,
    #[serde(rename = "ipsec tunnel")]
    IpsecTunnel,
    #[serde(rename = "ipsec user")]
    IpsecUser,
    #[serde(rename = "timestamping")]
    Timestamping,
    #[serde(rename = "ocsp signing")]
    OcspSigning,
    #[serde(rename = "microsoft sgc")]
    MicrosoftSgc,
    #[serde(rename = "netscape sgc")]
    NetscapeSgc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_ref_defaults_are_equal_to_explicit_values() {
        let defaulted = IssuerRef {
            name: "ca".into(),
            ..Default::default()
        };
        let explicit = IssuerRef {
            name: "ca".into(),
            kind: "Issuer".into(),
            group: "cert-manager.io".into(),
        };
        assert!(defaulted.matches(&explicit));
        assert!(explicit.matches(&defaulted));
    }

    #[test]
    fn issuer_ref_detects_divergent_kind() {
        let a = IssuerRef {
            name: "ca".into(),
            kind: "ClusterIssuer".into(),
            ..Default::default()
        };
        let b = IssuerRef {
            name: "ca".into(),
            ..Default::default()
        };
        assert!(!a.matches(&b));
    }

    #[test]
    fn key_usage_serializes_with_wire_names() {
        let json = serde_json::to_string(&KeyUsage::DigitalSignature).unwrap();
        assert_eq!(json, "\"digital signature\"");
        let parsed: KeyUsage = serde_json::from_str("\"server auth\"").unwrap();
        assert_eq!(parsed, KeyUsage::ServerAuth);
    }
}
