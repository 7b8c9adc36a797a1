//! Service snapshots read from a context's services directory.
//!
//! Each file in the directory holds `services: [{name, url, hash, ...}]`.
//! A snapshot is whatever the working tree holds when it is loaded, so the
//! caller checks out a revision first.

use crate::config::SaasConfig;
use crate::error::{HerderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[cfg(test)]
mod tests;

/// One deployed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub url: String,
    /// Pinned commit; services without one are left out of diffs
    #[serde(default)]
    pub hash: Option<String>,
    /// `path`, `hash_length`, `parameters` and friends
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Service {
    pub fn new(name: impl Into<String>, url: impl Into<String>, hash: Option<&str>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            hash: hash.map(str::to_string),
            extra: BTreeMap::new(),
        }
    }

    /// Template path inside the service repository.
    pub fn path(&self) -> Option<&str> {
        self.extra.get("path").and_then(|v| v.as_str())
    }

    /// Link to the raw template file at the pinned hash.
    ///
    /// Only GitHub and GitLab hosted repositories have a known raw layout.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::snapshot::Service;
    ///
    /// let mut service = Service::new("api", "https://github.com/org/api/", Some("abc123"));
    /// service.extra.insert("path".into(), "/openshift/api.yaml".into());
    /// assert_eq!(
    ///     service.template_url().as_deref(),
    ///     Some("https://raw.githubusercontent.com/org/api/abc123/openshift/api.yaml")
    /// );
    /// ```
    pub fn template_url(&self) -> Option<String> {
        let url = self.url.trim_end_matches('/');
        let hash = self.hash.as_deref()?;
        let path = self.path()?.trim_start_matches('/');

        if url.contains("github") {
            let mut parts = url.rsplit('/');
            let repo = parts.next()?;
            let owner = parts.next()?;
            Some(format!(
                "https://raw.githubusercontent.com/{}/{}/{}/{}",
                owner, repo, hash, path
            ))
        } else if url.contains("gitlab") {
            Some(format!("{}/raw/{}/{}", url, hash, path))
        } else {
            None
        }
    }

    /// Renders one field for printing; `None` when the service lacks it.
    pub fn field(&self, field: ServiceField) -> Option<String> {
        match field {
            ServiceField::Path => self.path().map(str::to_string),
            ServiceField::Url => Some(self.url.clone()),
            ServiceField::Hash => self.hash.clone(),
            ServiceField::HashLength => self.extra.get("hash_length").map(scalar_text),
            ServiceField::TemplateUrl => self.template_url(),
        }
    }
}

fn scalar_text(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Service attributes `saasherder get` can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceField {
    Path,
    Url,
    Hash,
    HashLength,
    TemplateUrl,
}

impl fmt::Display for ServiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Path => "path",
            Self::Url => "url",
            Self::Hash => "hash",
            Self::HashLength => "hash_length",
            Self::TemplateUrl => "template-url",
        };
        f.write_str(name)
    }
}

impl FromStr for ServiceField {
    type Err = HerderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "path" => Ok(Self::Path),
            "url" => Ok(Self::Url),
            "hash" => Ok(Self::Hash),
            "hash_length" => Ok(Self::HashLength),
            "template-url" => Ok(Self::TemplateUrl),
            other => Err(HerderError::validation(format!(
                "Unknown service field '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceFile {
    #[serde(default)]
    services: Vec<Service>,
}

/// Services keyed by name, remembering load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceSnapshot {
    services: Vec<Service>,
    index: BTreeMap<String, usize>,
}

impl ServiceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service; a later service with the same name replaces the earlier one.
    pub fn insert(&mut self, service: Service) {
        match self.index.get(&service.name) {
            Some(&i) => self.services[i] = service,
            None => {
                self.index.insert(service.name.clone(), self.services.len());
                self.services.push(service);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Service> {
        self.index.get(name).map(|&i| &self.services[i])
    }

    /// Services in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Services named in `names`, or every service when `names` is empty.
    ///
    /// Unknown names are skipped; an empty result is an error.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Service>> {
        let selected: Vec<&Service> = if names.is_empty() {
            self.iter().collect()
        } else {
            names.iter().filter_map(|name| self.get(name)).collect()
        };
        if selected.is_empty() {
            let wanted = if names.is_empty() {
                "any".to_string()
            } else {
                names.join(", ")
            };
            return Err(HerderError::not_found("service".to_string(), wanted));
        }
        Ok(selected)
    }
}

impl FromIterator<Service> for ServiceSnapshot {
    fn from_iter<I: IntoIterator<Item = Service>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for service in iter {
            snapshot.insert(service);
        }
        snapshot
    }
}

/// What the changelog engine needs from its surroundings.
pub trait SnapshotSource {
    /// Makes `name` the context later snapshots are read from.
    fn switch_context(&mut self, name: &str) -> Result<()>;

    /// Reads the services of the current context from the working tree.
    /// `revision` is what the caller checked out, for diagnostics.
    fn load_service_snapshot(&self, revision: &str) -> Result<ServiceSnapshot>;
}

/// Snapshot source backed by `config.yaml` contexts.
#[derive(Debug, Clone)]
pub struct ServicesDir {
    config: SaasConfig,
    root: PathBuf,
}

impl ServicesDir {
    /// `root` is the directory relative service paths resolve against.
    pub fn new(config: SaasConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
        }
    }

    pub fn config(&self) -> &SaasConfig {
        &self.config
    }

    /// Directory of the current context.
    pub fn services_dir(&self) -> Result<PathBuf> {
        let context = self.config.current_context()?;
        Ok(self.root.join(&context.data.services_dir))
    }
}

impl SnapshotSource for ServicesDir {
    fn switch_context(&mut self, name: &str) -> Result<()> {
        self.config.switch_context(name)
    }

    fn load_service_snapshot(&self, revision: &str) -> Result<ServiceSnapshot> {
        let dir = self.services_dir()?;
        let snapshot = load_dir(&dir)?;
        debug!(revision, dir = %dir.display(), services = snapshot.len(), "loaded service snapshot");
        Ok(snapshot)
    }
}

/// Reads every service file in `dir`, in file name order.
pub fn load_dir(dir: &Path) -> Result<ServiceSnapshot> {
    let entries = std::fs::read_dir(dir).map_err(|e| HerderError::io(dir.display(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| HerderError::io(dir.display(), e))?.path();
        let is_service_file = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "yaml" | "yml" | "json"));
        if path.is_file() && is_service_file {
            files.push(path);
        }
    }
    files.sort();

    let mut snapshot = ServiceSnapshot::new();
    for path in files {
        let raw = std::fs::read_to_string(&path).map_err(|e| HerderError::io(path.display(), e))?;
        let file: ServiceFile = serde_yaml::from_str(&raw).map_err(|e| {
            HerderError::validation_with_source(format!("Invalid service file {}", path.display()), e)
        })?;
        for service in file.services {
            snapshot.insert(service);
        }
    }
    Ok(snapshot)
}
