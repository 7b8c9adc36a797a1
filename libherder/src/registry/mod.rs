//! Registry-specific tag existence checks.
//!
//! A [`Registry`] answers one question per call: does this reference's tag
//! exist? The answer is a [`RegistryQueryResult`]; retries and authentication
//! fallback are the verifier's business, not this module's.

use crate::auth::{CredentialTarget, Credentials};
use crate::client::{Client, ClientConfig};
use crate::error::{HerderError, Result};
use crate::reference::ImageReference;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;


/// Quay.io host name.
pub const QUAY_HOST: &str = "quay.io";

/// Default cap on Quay tag pages fetched for one lookup.
pub const DEFAULT_QUAY_MAX_PAGES: u32 = 100;

/// Outcome of a single tag lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryQueryResult {
    /// The tag exists
    Found,
    /// The repository or the tag does not exist
    NotFound { detail: String },
    /// The registry refused the credentials (or demanded some)
    AuthRequired { status: u16, detail: String },
    /// Anything else: unexpected status, network failure, bad body
    TransientError { status: Option<u16>, detail: String },
}

impl RegistryQueryResult {
    /// Classifies a client error.
    pub fn from_error(error: HerderError) -> Self {
        match &error {
            HerderError::NotFound { .. } => Self::NotFound {
                detail: error.to_string(),
            },
            HerderError::Authentication { status_code, .. } => Self::AuthRequired {
                status: status_code.unwrap_or(401),
                detail: error.to_string(),
            },
            _ => Self::TransientError {
                status: error.status_code(),
                detail: error.to_string(),
            },
        }
    }

    /// Returns true for `Found`.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found)
    }

    /// Human-readable detail for failures; empty for `Found`.
    pub fn detail(&self) -> &str {
        match self {
            Self::Found => "",
            Self::NotFound { detail }
            | Self::AuthRequired { detail, .. }
            | Self::TransientError { detail, .. } => detail,
        }
    }
}

/// Anything that can answer "does this tag exist?".
///
/// Implemented by [`Registry`]; tests substitute scripted probes.
pub trait TagProbe: Sync {
    /// Looks up `reference`'s tag using `credentials`.
    fn probe<'a>(
        &'a self,
        reference: &'a ImageReference,
        credentials: &'a Credentials,
    ) -> impl Future<Output = RegistryQueryResult> + Send + 'a;

    /// Which kind of credentials a lookup of `reference` needs.
    fn credential_target(&self, _reference: &ImageReference) -> CredentialTarget {
        CredentialTarget::Registry
    }
}

/// The API dialect a registry host speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFlavor {
    /// Quay REST API with paginated tag listing
    Quay,
    /// Docker Registry v2 (`/v2/<name>/tags/list`)
    DockerV2,
}

/// How lookups are performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Inspector {
    /// Query the registry HTTP API directly
    #[default]
    Http,
    /// Delegate to `skopeo inspect docker://<image>`
    Skopeo,
}

/// Endpoint and dialect settings for [`Registry`].
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Scheme for Docker v2 registries (default `https`)
    pub scheme: String,
    /// Base URL of the quay.io API (default `https://quay.io`)
    pub quay_endpoint: String,
    /// Hosts speaking the Quay dialect
    pub quay_hosts: Vec<String>,
    /// Tag pages fetched before a Quay lookup gives up
    pub quay_max_pages: u32,
    /// Lookup mechanism
    pub inspector: Inspector,
    /// skopeo executable
    pub skopeo_binary: String,
    /// HTTP client settings
    pub client: ClientConfig,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            quay_endpoint: format!("https://{}", QUAY_HOST),
            quay_hosts: vec![QUAY_HOST.to_string()],
            quay_max_pages: DEFAULT_QUAY_MAX_PAGES,
            inspector: Inspector::Http,
            skopeo_binary: "skopeo".to_string(),
            client: ClientConfig::default(),
        }
    }
}

/// Registry lookups over HTTP or skopeo.
#[derive(Debug, Clone)]
pub struct Registry {
    settings: RegistrySettings,
}

impl Registry {
    /// Creates a registry prober.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the Quay endpoint or scheme is unusable.
    pub fn new(settings: RegistrySettings) -> Result<Self> {
        if settings.scheme != "http" && settings.scheme != "https" {
            return Err(HerderError::validation(format!(
                "Unsupported registry scheme '{}'",
                settings.scheme
            )));
        }
        // Fail early on an unusable endpoint rather than on every lookup.
        Client::with_config(&settings.quay_endpoint, settings.client.clone())?;
        Ok(Self { settings })
    }

    /// Returns the settings this registry was built with.
    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Determines the dialect spoken by `host`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::registry::{Registry, RegistryFlavor, RegistrySettings};
    ///
    /// let registry = Registry::new(RegistrySettings::default()).unwrap();
    /// assert_eq!(registry.flavor("quay.io"), RegistryFlavor::Quay);
    /// assert_eq!(registry.flavor("registry.access.redhat.com"), RegistryFlavor::DockerV2);
    /// ```
    pub fn flavor(&self, host: &str) -> RegistryFlavor {
        if self.settings.quay_hosts.iter().any(|h| h == host) {
            RegistryFlavor::Quay
        } else {
            RegistryFlavor::DockerV2
        }
    }

    /// Base URL of the Quay API serving `host`.
    ///
    /// quay.io goes through the configured endpoint; other Quay installations
    /// are reached on their own host.
    pub fn quay_base_url(&self, host: &str) -> String {
        if host == QUAY_HOST {
            self.settings.quay_endpoint.clone()
        } else {
            format!("{}://{}", self.settings.scheme, host)
        }
    }

    async fn quay_lookup(
        &self,
        host: &str,
        reference: &ImageReference,
        credentials: &Credentials,
    ) -> RegistryQueryResult {
        let client =
            match Client::with_config(&self.quay_base_url(host), self.settings.client.clone()) {
                Ok(client) => client,
                Err(e) => return RegistryQueryResult::from_error(e),
            };

        let path = reference.path();
        let mut page = 1;
        loop {
            if page > self.settings.quay_max_pages {
                return RegistryQueryResult::TransientError {
                    status: None,
                    detail: format!(
                        "gave up on {} after {} page(s) of tags",
                        path, self.settings.quay_max_pages
                    ),
                };
            }
            match client
                .fetch_quay_tag_page(&path, page, credentials)
                .await
            {
                Ok(listing) if listing.contains(reference.tag()) => {
                    debug!(image = %reference, page, "tag found on quay");
                    return RegistryQueryResult::Found;
                }
                Ok(listing) if listing.has_additional => page += 1,
                Ok(_) => {
                    return RegistryQueryResult::NotFound {
                        detail: format!(
                            "tag {} not listed in {} page(s) of {}",
                            reference.tag(),
                            page,
                            path
                        ),
                    };
                }
                Err(e) => return RegistryQueryResult::from_error(e),
            }
        }
    }

    async fn docker_v2_lookup(
        &self,
        host: &str,
        reference: &ImageReference,
        credentials: &Credentials,
    ) -> RegistryQueryResult {
        let base_url = format!("{}://{}", self.settings.scheme, host);
        let client = match Client::with_config(&base_url, self.settings.client.clone()) {
            Ok(client) => client,
            Err(e) => return RegistryQueryResult::from_error(e),
        };

        match client.fetch_tags(&reference.path(), credentials).await {
            Ok(tags) if tags.iter().any(|t| t == reference.tag()) => RegistryQueryResult::Found,
            Ok(tags) => RegistryQueryResult::NotFound {
                detail: format!(
                    "tag {} not among {} tag(s) of {}",
                    reference.tag(),
                    tags.len(),
                    reference.path()
                ),
            },
            Err(e) => RegistryQueryResult::from_error(e),
        }
    }

    /// Builds the `skopeo inspect` argument vector.
    pub fn skopeo_args(reference: &ImageReference, credentials: &Credentials) -> Vec<String> {
        let mut args = vec!["inspect".to_string()];
        match credentials {
            Credentials::Anonymous => args.push("--no-creds".to_string()),
            Credentials::Basic { username, password } => {
                args.push("--creds".to_string());
                args.push(format!("{}:{}", username, password));
            }
            Credentials::Bearer { token } => {
                args.push("--registry-token".to_string());
                args.push(token.clone());
            }
            Credentials::AuthFile { path } => {
                args.push("--authfile".to_string());
                args.push(path.display().to_string());
            }
        }
        args.push(format!("docker://{}", reference));
        args
    }

    async fn skopeo_lookup(
        &self,
        reference: &ImageReference,
        credentials: &Credentials,
    ) -> RegistryQueryResult {
        let output = Command::new(&self.settings.skopeo_binary)
            .args(Self::skopeo_args(reference, credentials))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => RegistryQueryResult::Found,
            Ok(output) => RegistryQueryResult::NotFound {
                detail: format!(
                    "skopeo exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            },
            Err(e) => RegistryQueryResult::TransientError {
                status: None,
                detail: format!("failed to run {}: {}", self.settings.skopeo_binary, e),
            },
        }
    }
}

impl TagProbe for Registry {
    fn probe<'a>(
        &'a self,
        reference: &'a ImageReference,
        credentials: &'a Credentials,
    ) -> impl Future<Output = RegistryQueryResult> + Send + 'a {
        async move {
            if self.settings.inspector == Inspector::Skopeo {
                return self.skopeo_lookup(reference, credentials).await;
            }

            let Some(host) = reference.registry() else {
                return RegistryQueryResult::TransientError {
                    status: None,
                    detail: format!("{} names no registry", reference),
                };
            };

            match self.flavor(host) {
                RegistryFlavor::Quay => self.quay_lookup(host, reference, credentials).await,
                RegistryFlavor::DockerV2 => {
                    self.docker_v2_lookup(host, reference, credentials).await
                }
            }
        }
    }

    fn credential_target(&self, reference: &ImageReference) -> CredentialTarget {
        if self.settings.inspector == Inspector::Skopeo {
            return CredentialTarget::Skopeo;
        }
        match reference.registry().map(|host| self.flavor(host)) {
            Some(RegistryFlavor::Quay) => CredentialTarget::QuayApi,
            _ => CredentialTarget::Registry,
        }
    }
}
