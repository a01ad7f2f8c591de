use duration_string::DurationString;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use k8s_openapi::ByteString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::certificate::{IssuerRef, KeyUsage};

/// A single issuance attempt for one revision of a Certificate.
///
/// Carries the PEM-encoded PKCS#10 CSR submitted to the issuer. While a
/// request for the current revision exists it is the authoritative comparison
/// target for drift detection, since the Secret may lag a still-completing
/// issuance.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "CertificateRequest",
    namespaced,
    derive = "Default",
    status = "CertificateRequestStatus",
    shortname = "cr"
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestSpec {
    /// PEM-encoded PKCS#10 certificate signing request.
    #[schemars(with = "String")]
    pub request: ByteString,

    pub issuer_ref: IssuerRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub duration: Option<DurationString>,

    #[serde(default, rename = "isCA")]
    pub is_ca: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usages: Option<Vec<KeyUsage>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequestStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub conditions: Option<Vec<Condition>>,

    /// The signed certificate, once the issuer has fulfilled the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub certificate: Option<ByteString>,
}
