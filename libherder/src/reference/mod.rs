//! Container image reference parsing.
//!
//! References follow the registry-optional grammar used by OpenShift
//! templates: `[registry/][repository/]image[:tag]`. The first path segment is
//! treated as a registry host only when it contains a `.` or a `:`, so
//! `quay.io/ns/foo:v1` and `localhost:5000/foo` name a registry while
//! `library/foo` does not.

use crate::error::{HerderError, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// Tag assumed when a reference does not carry one.
pub const DEFAULT_TAG: &str = "latest";

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    registry: Option<String>,
    repository: String,
    image_name: String,
    tag: String,
}

impl FromStr for ImageReference {
    type Err = HerderError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(HerderError::validation("Image reference cannot be empty"));
        }

        let segments: Vec<&str> = raw.split('/').collect();
        let (registry, path) = match segments.split_first() {
            Some((first, rest)) if !rest.is_empty() && is_registry_host(first) => {
                (Some(first.to_string()), rest)
            }
            _ => (None, segments.as_slice()),
        };

        let Some((last, parents)) = path.split_last() else {
            return Err(HerderError::validation(format!(
                "Invalid image reference '{}': missing image name",
                raw
            )));
        };

        let (image_name, tag) = match last.rsplit_once(':') {
            Some((name, tag)) => (name, tag),
            None => (*last, DEFAULT_TAG),
        };

        if image_name.is_empty() || tag.is_empty() || parents.iter().any(|p| p.is_empty()) {
            return Err(HerderError::validation(format!(
                "Invalid image reference '{}'",
                raw
            )));
        }

        Ok(Self {
            registry,
            repository: parents.join("/"),
            image_name: image_name.to_string(),
            tag: tag.to_string(),
        })
    }
}

fn is_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':')
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}:{}", self.path(), self.tag)
    }
}

impl ImageReference {
    /// Returns the registry host, if the reference names one.
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// Returns the path segments between the registry and the image name.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the final image name without its tag.
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Returns the tag (`latest` when the reference had none).
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns a copy of this reference pointing at `tag`.
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..self.clone()
        }
    }

    /// Returns `repository/image_name`, the path registries key tags under.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::ImageReference;
    ///
    /// let r: ImageReference = "quay.io/openshiftio/rhel-foo:v1".parse().unwrap();
    /// assert_eq!(r.path(), "openshiftio/rhel-foo");
    /// ```
    pub fn path(&self) -> String {
        if self.repository.is_empty() {
            self.image_name.clone()
        } else {
            format!("{}/{}", self.repository, self.image_name)
        }
    }
}
