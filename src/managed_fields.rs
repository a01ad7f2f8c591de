//! Server-side-apply ownership projection for target Secrets.
//!
//! A `FieldsV1` document marks owned keys with an `f:` path prefix. Only the
//! `metadata.annotations` and `metadata.labels` subtrees matter here; unknown
//! top-level fields are ignored rather than decoded.

use std::collections::BTreeSet;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ManagedFieldsEntry;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManagedFieldsError {
    #[error("expected {path} to be an object")]
    UnexpectedShape { path: &'static str },
}

/// Annotation and label keys owned by one field manager.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OwnedMetadata {
    pub annotations: BTreeSet<String>,
    pub labels: BTreeSet<String>,
}

/// Union the annotation/label keys owned by `field_manager` across all of a
/// Secret's managed-field entries. Entries from other managers and entries
/// without a `FieldsV1` document are ignored.
pub fn owned_metadata_keys(
    entries: &[ManagedFieldsEntry],
    field_manager: &str,
) -> Result<OwnedMetadata, ManagedFieldsError> {
    let mut owned = OwnedMetadata::default();
    for entry in entries {
        if entry.manager.as_deref() != Some(field_manager) {
            continue;
        }
        let Some(fields) = &entry.fields_v1 else {
            continue;
        };
        project(&fields.0, &mut owned)?;
    }
    Ok(owned)
}

fn project(fields: &Value, owned: &mut OwnedMetadata) -> Result<(), ManagedFieldsError> {
    let Some(metadata) = fields.get("f:metadata") else {
        return Ok(());
    };
    let metadata = metadata
        .as_object()
        .ok_or(ManagedFieldsError::UnexpectedShape {
            path: "f:metadata",
        })?;

    if let Some(annotations) = metadata.get("f:annotations") {
        let annotations =
            annotations
                .as_object()
                .ok_or(ManagedFieldsError::UnexpectedShape {
                    path: "f:metadata.f:annotations",
                })?;
        for key in annotations.keys() {
            owned.annotations.insert(trim_field_prefix(key).to_string());
        }
    }
    if let Some(labels) = metadata.get("f:labels") {
        let labels = labels
            .as_object()
            .ok_or(ManagedFieldsError::UnexpectedShape {
                path: "f:metadata.f:labels",
            })?;
        for key in labels.keys() {
            owned.labels.insert(trim_field_prefix(key).to_string());
        }
    }
    Ok(())
}

fn trim_field_prefix(key: &str) -> &str {
    key.strip_prefix("f:").unwrap_or(key)
}
