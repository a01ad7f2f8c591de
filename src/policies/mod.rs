//! Policy functions and chains over `(Certificate, CertificateRequest, Secret)`.
//!
//! A policy is a pure function from an [`Input`] snapshot to an optional
//! [`Violation`]. A [`PolicyChain`] runs policies in a fixed order and stops
//! at the first violation; the ordering is part of the contract, since
//! earlier policies mask later ones. Chains are built once at startup and
//! are safe to evaluate concurrently.

mod checks;
mod template;

pub use checks::{
    certificate_expired, current_request_valid_for_spec, current_secret_valid_for_spec,
    renewal_time_reached, secret_does_not_exist, secret_is_missing_data,
    secret_is_missing_key_pair, secret_issuer_annotations_match, secret_key_pair_valid,
};
pub use template::{
    secret_template_mismatches_secret, secret_template_mismatches_secret_managed_fields,
};

use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use log::debug;

use crate::api::{Certificate, CertificateRequest};
use crate::clock::Clock;

/// Immutable snapshot a chain evaluates.
///
/// The certificate is always present; the current-revision request and the
/// target secret may be absent. Policies must not mutate any of the three.
#[derive(Clone, Copy)]
pub struct Input<'a> {
    pub certificate: &'a Certificate,
    pub current_revision_request: Option<&'a CertificateRequest>,
    pub secret: Option<&'a Secret>,
}

/// Stable machine-readable violation tags.
///
/// These identifiers are persisted into status conditions and used as metric
/// labels by callers; renaming one is a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    DoesNotExist,
    MissingData,
    InvalidKeyPair,
    InvalidCertificate,
    SecretMismatch,
    IncorrectIssuer,
    RequestChanged,
    Renewing,
    Expired,
    SecretTemplateMismatch,
    ManagedFieldsParseError,
}

impl Reason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Reason::DoesNotExist => "DoesNotExist",
            Reason::MissingData => "MissingData",
            Reason::InvalidKeyPair => "InvalidKeyPair",
            Reason::InvalidCertificate => "InvalidCertificate",
            Reason::SecretMismatch => "SecretMismatch",
            Reason::IncorrectIssuer => "IncorrectIssuer",
            Reason::RequestChanged => "RequestChanged",
            Reason::Renewing => "Renewing",
            Reason::Expired => "Expired",
            Reason::SecretTemplateMismatch => "SecretTemplateMismatch",
            Reason::ManagedFieldsParseError => "ManagedFieldsParseError",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A policy's verdict when the observed state diverges from the spec.
///
/// For the trigger chain a violation means re-issuance is warranted; for the
/// readiness chain it is reported as drift on the Certificate status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub reason: Reason,
    pub message: String,
}

impl Violation {
    pub fn new(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// A single policy over an input snapshot.
pub type PolicyFn = Box<dyn Fn(&Input<'_>) -> Option<Violation> + Send + Sync>;

/// Ordered composition of policies with first-violation-wins semantics.
pub struct PolicyChain {
    name: &'static str,
    policies: Vec<PolicyFn>,
}

impl PolicyChain {
    /// The chain deciding whether a new revision should be issued now.
    ///
    /// Ordering runs from missing or corrupt data to subtler drift so that a
    /// broken Secret never masks the report of what is actually wrong:
    /// existence, data presence, key-pair validity, issuer annotations, then
    /// request-vs-spec (or stored-cert-vs-spec when no request exists),
    /// renewal time, and finally expiry.
    pub fn trigger(clock: Arc<dyn Clock>) -> Self {
        Self {
            name: "trigger",
            policies: vec![
                Box::new(checks::secret_does_not_exist),
                Box::new(checks::secret_is_missing_data),
                Box::new(checks::secret_is_missing_key_pair),
                Box::new(checks::secret_key_pair_valid),
                Box::new(checks::secret_issuer_annotations_match),
                Box::new(checks::current_request_valid_for_spec),
                Box::new(checks::current_secret_valid_for_spec),
                Box::new(checks::renewal_time_reached(Arc::clone(&clock))),
                Box::new(checks::certificate_expired(clock)),
            ],
        }
    }

    /// The post-issuance chain deciding whether the stored artifact still
    /// faithfully reflects the spec.
    ///
    /// Same prefix as the trigger chain minus the renewal check (a scheduled
    /// renewal is not drift), with the secret-template policies appended.
    /// `field_manager` names this controller in server-side-apply ownership.
    pub fn readiness(clock: Arc<dyn Clock>, field_manager: impl Into<String> + 'static) -> Self {
        Self {
            name: "readiness",
            policies: vec![
                Box::new(checks::secret_does_not_exist),
                Box::new(checks::secret_is_missing_data),
                Box::new(checks::secret_is_missing_key_pair),
                Box::new(checks::secret_key_pair_valid),
                Box::new(checks::secret_issuer_annotations_match),
                Box::new(checks::current_request_valid_for_spec),
                Box::new(checks::current_secret_valid_for_spec),
                Box::new(checks::certificate_expired(clock)),
                Box::new(template::secret_template_mismatches_secret),
                Box::new(template::secret_template_mismatches_secret_managed_fields(
                    field_manager,
                )),
            ],
        }
    }

    /// Apply each policy in order and return the first violation, if any.
    pub fn evaluate(&self, input: &Input<'_>) -> Option<Violation> {
        for policy in &self.policies {
            if let Some(violation) = policy(input) {
                debug!(
                    "event=policy_violation chain={} reason={} message={:?}",
                    self.name, violation.reason, violation.message
                );
                return Some(violation);
            }
        }
        None
    }
}
