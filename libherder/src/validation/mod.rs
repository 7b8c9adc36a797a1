//! Template validation rules.

use crate::error::{HerderError, Result};
use crate::manifest::{objects, pod_containers};
use serde_yaml::Value;
use std::path::Path;

#[cfg(test)]
mod tests;

/// A check run against a parsed template.
pub trait ValidationRule {
    /// Name used as the prefix of every message.
    fn name(&self) -> &'static str;

    /// Returns one message per violation.
    fn validate(&self, template: &Value) -> Result<Vec<String>>;
}

/// Every DeploymentConfig container must set cpu and memory limits and requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerRequestsLimitsRule;

const CHECKS: &[(&str, &str, &str)] = &[
    ("limits", "memory", "Undefined memory limit"),
    ("limits", "cpu", "Undefined cpu limit"),
    ("requests", "memory", "Undefined memory request"),
    ("requests", "cpu", "Undefined cpu request"),
];

impl ValidationRule for ContainerRequestsLimitsRule {
    fn name(&self) -> &'static str {
        "ContainerRequestsLimitsRule"
    }

    fn validate(&self, template: &Value) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        let deployments = objects(template)?
            .iter()
            .filter(|o| o.get("kind").and_then(Value::as_str) == Some("DeploymentConfig"));

        for dc in deployments {
            let dc_name = dc
                .get("metadata")
                .and_then(|m| m.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("unnamed_dc");

            for container in pod_containers(dc) {
                let container_name = container
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("unnamed_container");
                let resources = container.get("resources");

                for (section, resource, message) in CHECKS {
                    let value = resources
                        .and_then(|r| r.get(*section))
                        .and_then(|s| s.get(*resource));
                    if !is_defined(value) {
                        errors.push(format!(
                            "{}: dc {}, container {}: {}",
                            self.name(),
                            dc_name,
                            container_name,
                            message
                        ));
                    }
                }
            }
        }

        Ok(errors)
    }
}

fn is_defined(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Rules applied by [`validate_template`].
pub fn default_rules() -> Vec<Box<dyn ValidationRule + Send + Sync>> {
    vec![Box::new(ContainerRequestsLimitsRule)]
}

/// Runs every default rule against the template at `path`.
pub fn validate_template(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| HerderError::io(path.display(), e))?;
    let template: Value = serde_yaml::from_str(&raw).map_err(|e| {
        HerderError::validation_with_source(format!("Failed to parse {}", path.display()), e)
    })?;

    let mut errors = Vec::new();
    for rule in default_rules() {
        errors.extend(rule.validate(&template)?);
    }
    Ok(errors)
}
