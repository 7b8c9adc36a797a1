//! Image extraction from rendered OpenShift manifests.
//!
//! A rendered manifest is a `List` (`items`) or a template (`objects`). JSON
//! manifests go through the YAML parser too.

use crate::error::{HerderError, Result};
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::Path;


/// Kinds whose pod templates are scanned for images.
pub const WORKLOAD_KINDS: &[&str] = &["DeploymentConfig", "StatefulSet"];

/// Reads `path` and returns every workload image, deduplicated and sorted.
pub fn images_from_manifest(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| HerderError::io(path.display(), e))?;
    images_from_str(&raw).map_err(|e| match e {
        HerderError::Validation { message, source } => HerderError::Validation {
            message: format!("{}: {}", path.display(), message),
            source,
        },
        other => other,
    })
}

/// Parses a manifest document and returns its workload images.
pub fn images_from_str(raw: &str) -> Result<Vec<String>> {
    let document: Value = serde_yaml::from_str(raw)
        .map_err(|e| HerderError::validation_with_source("Failed to parse manifest", e))?;

    let mut images = BTreeSet::new();
    for object in objects(&document)? {
        let kind = object.get("kind").and_then(Value::as_str).unwrap_or_default();
        if !WORKLOAD_KINDS.contains(&kind) {
            continue;
        }
        for container in pod_containers(object) {
            if let Some(image) = container.get("image").and_then(Value::as_str) {
                images.insert(image.to_string());
            }
        }
    }
    Ok(images.into_iter().collect())
}

/// Returns the object list of a `List` or template document.
pub(crate) fn objects(document: &Value) -> Result<&[Value]> {
    ["items", "objects"]
        .iter()
        .find_map(|key| document.get(*key).and_then(Value::as_sequence))
        .map(Vec::as_slice)
        .ok_or_else(|| HerderError::validation("Manifest has neither 'items' nor 'objects'"))
}

/// Containers and init containers of a workload's pod template.
pub(crate) fn pod_containers(object: &Value) -> impl Iterator<Item = &Value> {
    let pod_spec = object
        .get("spec")
        .and_then(|s| s.get("template"))
        .and_then(|t| t.get("spec"));

    ["containers", "initContainers"]
        .into_iter()
        .filter_map(move |key| pod_spec.and_then(|s| s.get(key)).and_then(Value::as_sequence))
        .flatten()
}
