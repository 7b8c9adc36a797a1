//! SaaS configuration file.
//!
//! `config.yaml` names a set of contexts (each pointing at a services
//! directory, a templates directory and an output directory), which one is
//! current, and the verifier settings. Missing keys fall back to defaults.

use crate::error::{HerderError, Result};
use crate::registry::{DEFAULT_QUAY_MAX_PAGES, Inspector, RegistrySettings};
use crate::verify::VerifierConfig;
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;


/// Root of `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SaasConfig {
    /// Name of the active context
    #[serde(default)]
    pub current: String,

    #[serde(default)]
    pub contexts: Vec<Context>,

    #[serde(default)]
    pub verify: VerifySettings,

    #[serde(skip)]
    path: Option<PathBuf>,
}

/// A named set of directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Context {
    pub name: String,
    pub data: ContextData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContextData {
    pub services_dir: PathBuf,
    #[serde(default)]
    pub templates_dir: PathBuf,
    #[serde(default)]
    pub output_dir: PathBuf,
}

/// Registry verifier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifySettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default = "default_quay_endpoint")]
    pub quay_endpoint: String,

    #[serde(default = "default_quay_hosts")]
    pub quay_hosts: Vec<String>,

    /// Tag pages fetched before a Quay lookup gives up
    #[serde(default = "default_quay_max_pages")]
    pub quay_max_pages: u32,

    #[serde(default)]
    pub auth_file: Option<PathBuf>,

    #[serde(default)]
    pub token_file: Option<PathBuf>,

    #[serde(default)]
    pub inspector: Inspector,

    #[serde(default = "default_skopeo")]
    pub skopeo: String,
}

impl Default for VerifySettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            concurrency: default_concurrency(),
            scheme: default_scheme(),
            quay_endpoint: default_quay_endpoint(),
            quay_hosts: default_quay_hosts(),
            quay_max_pages: default_quay_max_pages(),
            auth_file: None,
            token_file: None,
            inspector: Inspector::default(),
            skopeo: default_skopeo(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    4
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_quay_endpoint() -> String {
    RegistrySettings::default().quay_endpoint
}

fn default_quay_hosts() -> Vec<String> {
    RegistrySettings::default().quay_hosts
}

fn default_quay_max_pages() -> u32 {
    DEFAULT_QUAY_MAX_PAGES
}

fn default_skopeo() -> String {
    "skopeo".to_string()
}

impl VerifySettings {
    /// Builds a verifier configuration; credentials and pattern are left for the caller.
    pub fn to_verifier_config(&self) -> VerifierConfig {
        let defaults = RegistrySettings::default();
        VerifierConfig {
            credentials: None,
            auth_file: self.auth_file.clone(),
            token_file: self.token_file.clone(),
            timeout: Duration::from_secs(self.timeout),
            max_retries: self.max_retries,
            backoff_unit: Duration::from_millis(self.backoff_ms),
            concurrency: self.concurrency,
            pattern: None,
            registry: RegistrySettings {
                scheme: self.scheme.clone(),
                quay_endpoint: self.quay_endpoint.clone(),
                quay_hosts: self.quay_hosts.clone(),
                quay_max_pages: self.quay_max_pages,
                inspector: self.inspector,
                skopeo_binary: self.skopeo.clone(),
                client: defaults.client.with_timeout(Duration::from_secs(self.timeout)),
            },
        }
    }
}

impl SaasConfig {
    /// Parses a `SaasConfig` from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(s, FileFormat::Yaml));
        Self::from_builder(builder, None)
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or malformed, or if `current` names no
    /// defined context.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::from(path).format(FileFormat::Yaml).required(true);
        let builder = Self::defaults()?.add_source(file);
        let mut config = Self::from_builder(builder, Some(path))?;
        config.path = Some(path.to_path_buf());

        if !config.current.is_empty() && config.context(&config.current).is_none() {
            return Err(HerderError::config(
                format!("Current context '{}' does not exist", config.current),
                Some(path.display().to_string()),
            ));
        }
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = ConfigRs::try_from(&Self::default()).map_err(|e| {
            HerderError::config_with_source("Failed to build default configuration", None, e)
        })?;
        Ok(ConfigRs::builder().add_source(defaults))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<&Path>,
    ) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                HerderError::config_with_source(
                    "Failed to deserialize configuration".to_string(),
                    path.map(|p| p.display().to_string()),
                    e,
                )
            })
    }

    /// Path the configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Looks up a context by name.
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Returns the current context.
    pub fn current_context(&self) -> Result<&Context> {
        self.context(&self.current).ok_or_else(|| {
            HerderError::config(
                format!("Context '{}', set as current, does not exist", self.current),
                None,
            )
        })
    }

    /// Makes `name` the current context. The file on disk is left untouched.
    pub fn switch_context(&mut self, name: &str) -> Result<()> {
        if self.current == name {
            return Ok(());
        }
        if self.context(name).is_none() {
            return Err(HerderError::config(
                format!("Context '{}' does not exist", name),
                None,
            ));
        }
        self.current = name.to_string();
        info!(context = name, "switched context");
        Ok(())
    }

    /// Names of all contexts, in file order.
    pub fn get_contexts(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }
}
