//! Kubernetes resource model for the certificate lifecycle controller.
//!
//! `Certificate` and `CertificateRequest` are the declarative inputs; the
//! target `Secret` is the plain `core/v1` type from `k8s-openapi`. Constants
//! here are wire-level strings shared with other controllers acting on the
//! same resources, so their exact spelling is part of the API.

mod certificate;
mod certificate_request;

pub use certificate::{
    issuer_groups_equal, issuer_kinds_equal, Certificate, CertificatePrivateKey, CertificateSpec,
    CertificateStatus, IssuerRef, KeyUsage, OtherName, PrivateKeyAlgorithm, PrivateKeyEncoding,
    PrivateKeyRotationPolicy, SecretTemplate, X509Subject,
};
pub use certificate_request::{
    CertificateRequest, CertificateRequestSpec, CertificateRequestStatus,
};

/// Secret data key under which the PEM certificate chain is stored.
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret data key under which the PEM private key is stored.
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Annotation recording the issuer name a Secret was issued by.
pub const ISSUER_NAME_ANNOTATION_KEY: &str = "cert-manager.io/issuer-name";

/// Annotation recording the issuer kind a Secret was issued by.
pub const ISSUER_KIND_ANNOTATION_KEY: &str = "cert-manager.io/issuer-kind";

/// Annotation recording the issuer group a Secret was issued by.
pub const ISSUER_GROUP_ANNOTATION_KEY: &str = "cert-manager.io/issuer-group";

/// Annotation recording the owning Certificate's name.
pub const CERTIFICATE_NAME_ANNOTATION_KEY: &str = "cert-manager.io/certificate-name";

/// Informational annotation derived from the issued certificate's common name.
pub const COMMON_NAME_ANNOTATION_KEY: &str = "cert-manager.io/common-name";

/// Informational annotation listing the issued certificate's DNS names.
pub const ALT_NAMES_ANNOTATION_KEY: &str = "cert-manager.io/alt-names";

/// Informational annotation listing the issued certificate's IP SANs.
pub const IP_SANS_ANNOTATION_KEY: &str = "cert-manager.io/ip-sans";

/// Informational annotation listing the issued certificate's URI SANs.
pub const URI_SANS_ANNOTATION_KEY: &str = "cert-manager.io/uri-sans";

/// Issuer kind assumed when a reference leaves the kind empty.
pub const DEFAULT_ISSUER_KIND: &str = "Issuer";

/// Issuer group assumed when a reference leaves the group empty.
pub const DEFAULT_ISSUER_GROUP: &str = "cert-manager.io";

/// Annotations the controller always owns on a target Secret.
pub const BASE_MANAGED_ANNOTATIONS: [&str; 4] = [
    CERTIFICATE_NAME_ANNOTATION_KEY,
    ISSUER_NAME_ANNOTATION_KEY,
    ISSUER_KIND_ANNOTATION_KEY,
    ISSUER_GROUP_ANNOTATION_KEY,
];

/// Annotations the controller additionally owns once certificate data is
/// present in the Secret, because their values are derived from it.
pub const CERT_DERIVED_MANAGED_ANNOTATIONS: [&str; 4] = [
    COMMON_NAME_ANNOTATION_KEY,
    ALT_NAMES_ANNOTATION_KEY,
    IP_SANS_ANNOTATION_KEY,
    URI_SANS_ANNOTATION_KEY,
];
