//! Secret-template conformance policies for the readiness chain.
//!
//! Two complementary checks: the value comparison catches template entries
//! that are missing or wrong on the Secret, while the managed-field
//! comparison catches keys this controller still owns but that are no longer
//! in the template, so the next apply can drop them.

use std::collections::BTreeSet;

use crate::api::{BASE_MANAGED_ANNOTATIONS, CERT_DERIVED_MANAGED_ANNOTATIONS, TLS_CERT_KEY};
use crate::managed_fields::owned_metadata_keys;

use super::{Input, Reason, Violation};

/// Every annotation and label declared in the template must appear on the
/// Secret with the same value. Extra entries on the Secret are fine here;
/// other controllers may add their own.
pub fn secret_template_mismatches_secret(input: &Input<'_>) -> Option<Violation> {
    let template = input.certificate.spec.secret_template.as_ref()?;
    let secret = input.secret?;

    if let Some(wanted) = &template.annotations {
        let actual = secret.metadata.annotations.as_ref();
        for (key, value) in wanted {
            if actual.and_then(|map| map.get(key)) != Some(value) {
                return Some(Violation::new(
                    Reason::SecretTemplateMismatch,
                    "Certificate's SecretTemplate Annotations missing or incorrect value on Secret",
                ));
            }
        }
    }
    if let Some(wanted) = &template.labels {
        let actual = secret.metadata.labels.as_ref();
        for (key, value) in wanted {
            if actual.and_then(|map| map.get(key)) != Some(value) {
                return Some(Violation::new(
                    Reason::SecretTemplateMismatch,
                    "Certificate's SecretTemplate Labels missing or incorrect value on Secret",
                ));
            }
        }
    }
    None
}

/// Compare the keys this controller owns under server-side apply against the
/// template. Ownership beyond the template (after subtracting the keys the
/// controller always manages) means a previously-templated entry lingers and
/// must be reported so it can be dropped.
pub fn secret_template_mismatches_secret_managed_fields(
    field_manager: impl Into<String>,
) -> impl Fn(&Input<'_>) -> Option<Violation> + Send + Sync {
    let field_manager = field_manager.into();
    move |input| {
        let secret = input.secret?;
        let entries = secret.metadata.managed_fields.as_deref().unwrap_or(&[]);
        let owned = match owned_metadata_keys(entries, &field_manager) {
            Ok(owned) => owned,
            Err(err) => {
                return Some(Violation::new(
                    Reason::ManagedFieldsParseError,
                    format!("failed to decode managed fields on Secret: {err}"),
                ));
            }
        };

        let mut annotations = owned.annotations;
        for key in BASE_MANAGED_ANNOTATIONS {
            annotations.remove(key);
        }
        let has_certificate_data = secret
            .data
            .as_ref()
            .and_then(|data| data.get(TLS_CERT_KEY))
            .map_or(false, |bytes| !bytes.0.is_empty());
        if has_certificate_data {
            for key in CERT_DERIVED_MANAGED_ANNOTATIONS {
                annotations.remove(key);
            }
        }
        let labels = owned.labels;

        let Some(template) = input.certificate.spec.secret_template.as_ref() else {
            if !annotations.is_empty() || !labels.is_empty() {
                return Some(Violation::new(
                    Reason::SecretTemplateMismatch,
                    "SecretTemplate is nil, but Secret contains extra managed entries",
                ));
            }
            return None;
        };

        let wanted_annotations: BTreeSet<&str> = template
            .annotations
            .iter()
            .flatten()
            .map(|(key, _)| key.as_str())
            .collect();
        let wanted_labels: BTreeSet<&str> = template
            .labels
            .iter()
            .flatten()
            .map(|(key, _)| key.as_str())
            .collect();
        let owned_annotations: BTreeSet<&str> =
            annotations.iter().map(String::as_str).collect();
        let owned_labels: BTreeSet<&str> = labels.iter().map(String::as_str).collect();

        if owned_annotations != wanted_annotations || owned_labels != wanted_labels {
            return Some(Violation::new(
                Reason::SecretTemplateMismatch,
                "Certificate's SecretTemplate doesn't match Secret",
            ));
        }
        None
    }
}
