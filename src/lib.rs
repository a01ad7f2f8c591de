//! Core library for the certkeeper certificate-lifecycle controller.
//!
//! The crate evaluates declared `Certificate` resources against their target
//! `Secret` and the current `CertificateRequest`, answering two questions:
//! should a new revision be issued now (the trigger chain), and does the
//! stored artifact still faithfully reflect the spec (the readiness chain).
//! Evaluation is a pure function of the input snapshot plus an injected
//! clock; acting on the verdicts is the surrounding controller's job.
#![deny(unreachable_pub)]
#![deny(unused_must_use)]
#![cfg_attr(docsrs, warn(missing_docs))]

pub mod api;
pub mod clock;
pub mod managed_fields;
pub mod pki;
pub mod policies;

pub use api::{
    Certificate, CertificatePrivateKey, CertificateRequest, CertificateRequestSpec,
    CertificateRequestStatus, CertificateSpec, CertificateStatus, IssuerRef, KeyUsage, OtherName,
    PrivateKeyAlgorithm, PrivateKeyEncoding, PrivateKeyRotationPolicy, SecretTemplate,
    X509Subject,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use managed_fields::{owned_metadata_keys, ManagedFieldsError, OwnedMetadata};
pub use pki::{check_key_pair, request_violations, secret_violations, KeyPairError, PkiError};
pub use policies::{Input, PolicyChain, PolicyFn, Reason, Violation};
