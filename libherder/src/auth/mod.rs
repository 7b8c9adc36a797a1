//! Authentication handling for container registries.
//!
//! Credentials come from three sources: explicit username/password (usually
//! `SKOPEO_USER`/`SKOPEO_PASS`), a docker/skopeo auth file, and a Quay bearer
//! token file. Which of them apply depends on the [`CredentialTarget`]:
//!
//! - the Quay REST API only accepts the bearer token;
//! - Docker Registry v2 takes the explicit credentials, then the auth file
//!   entry for the host;
//! - skopeo takes the explicit credentials, then reads the auth file itself.
//!
//! When none apply the query is anonymous.

use crate::error::{HerderError, Result};
use std::fs;
use std::path::{Path, PathBuf};

mod store;
pub use store::{AuthFileStore, CredentialStore};

#[cfg(test)]
mod tests;

/// Environment variable holding the registry username.
pub const USER_ENV: &str = "SKOPEO_USER";
/// Environment variable holding the registry password.
pub const PASS_ENV: &str = "SKOPEO_PASS";

/// Credentials for registry authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication (anonymous access)
    Anonymous,

    /// HTTP Basic authentication with username and password
    Basic {
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },

    /// An auth file handed to skopeo as is
    AuthFile {
        /// Path of the auth file
        path: PathBuf,
    },
}

/// What a lookup authenticates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTarget {
    /// Quay REST API (`/api/v1`), OAuth bearer tokens only
    QuayApi,
    /// Docker Registry v2 HTTP API
    Registry,
    /// `skopeo inspect`
    Skopeo,
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Basic authentication credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::auth::Credentials;
    ///
    /// let creds = Credentials::basic("username", "password");
    /// assert!(!creds.is_anonymous());
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates Bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Reads `SKOPEO_USER`/`SKOPEO_PASS`; both must be set and non-empty.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var(USER_ENV).ok().filter(|u| !u.is_empty())?;
        let password = std::env::var(PASS_ENV).ok().filter(|p| !p.is_empty())?;
        Some(Self::basic(username, password))
    }

    /// Reads a bearer token from a file, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or is empty.
    pub fn from_token_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let token = fs::read_to_string(path).map_err(|e| {
            HerderError::config_with_source(
                "Failed to read token file".to_string(),
                Some(path.display().to_string()),
                e,
            )
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(HerderError::config(
                "Token file is empty".to_string(),
                Some(path.display().to_string()),
            ));
        }

        Ok(Self::bearer(token))
    }

    /// Returns true for anonymous credentials.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns the Authorization header value for these credentials.
    ///
    /// Auth files carry no header of their own and yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::auth::Credentials;
    ///
    /// let creds = Credentials::bearer("abc");
    /// assert_eq!(creds.to_header_value().as_deref(), Some("Bearer abc"));
    /// ```
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous | Self::AuthFile { .. } => None,
            Self::Basic { username, password } => {
                use base64::{Engine as _, engine::general_purpose};
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            Self::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}

/// Ordered credential sources resolved per registry host.
#[derive(Debug, Clone, Default)]
pub struct CredentialChain {
    explicit: Option<Credentials>,
    auth_file: Option<PathBuf>,
    token_file: Option<PathBuf>,
}

impl CredentialChain {
    /// Creates a chain from its three sources; any of them may be absent.
    pub fn new(
        explicit: Option<Credentials>,
        auth_file: Option<PathBuf>,
        token_file: Option<PathBuf>,
    ) -> Self {
        Self {
            explicit,
            auth_file,
            token_file,
        }
    }

    /// Returns true when no source is configured at all.
    pub fn is_empty(&self) -> bool {
        self.explicit.is_none() && self.auth_file.is_none() && self.token_file.is_none()
    }

    /// Returns the configured auth file path.
    pub fn auth_file(&self) -> Option<&Path> {
        self.auth_file.as_deref()
    }

    /// Resolves the credentials to use for `registry` when talking to `target`.
    ///
    /// Missing files are not errors: an auth file that does not exist simply
    /// contributes nothing, matching how a default `~/skopeo.json` path is
    /// configured on machines that never created one.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn resolve(&self, registry: &str, target: CredentialTarget) -> Result<Credentials> {
        let auth_file = self.auth_file.as_deref().filter(|p| p.exists());

        match target {
            CredentialTarget::QuayApi => {
                if let Some(path) = self.token_file.as_deref().filter(|p| p.exists()) {
                    return Credentials::from_token_file(path);
                }
            }
            CredentialTarget::Registry => {
                if let Some(creds) = &self.explicit {
                    return Ok(creds.clone());
                }
                if let Some(path) = auth_file {
                    let store = AuthFileStore::load(path)?;
                    if let Some(creds) = store.get(registry)? {
                        return Ok(creds);
                    }
                }
            }
            CredentialTarget::Skopeo => {
                if let Some(creds) = &self.explicit {
                    return Ok(creds.clone());
                }
                if let Some(path) = auth_file {
                    return Ok(Credentials::AuthFile {
                        path: path.to_path_buf(),
                    });
                }
            }
        }

        Ok(Credentials::Anonymous)
    }
}
