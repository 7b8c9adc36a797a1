//! Read-only credential stores backing registry authentication.
//!
//! The auth file uses the format shared by skopeo, podman and docker:
//!
//! ```json
//! { "auths": { "quay.io": { "auth": "dXNlcjpwYXNz" } } }
//! ```
//!
//! where `auth` is `base64(username:password)`.

use crate::auth::Credentials;
use crate::error::{HerderError, Result};
use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Trait for looking up registry credentials.
pub trait CredentialStore {
    /// Retrieve credentials for a registry host.
    ///
    /// Returns `Ok(None)` when the store has no entry for the host.
    fn get(&self, registry: &str) -> Result<Option<Credentials>>;

    /// List all registries with stored credentials.
    fn list(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthFileContents {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

/// Credential store loaded from a skopeo/docker auth file.
///
/// # Examples
///
/// ```no_run
/// use libherder::auth::{AuthFileStore, CredentialStore};
///
/// # fn example() -> libherder::error::Result<()> {
/// let store = AuthFileStore::load("/home/user/skopeo.json")?;
/// let creds = store.get("quay.io")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AuthFileStore {
    path: PathBuf,
    entries: HashMap<String, AuthEntry>,
}

impl AuthFileStore {
    /// Loads the auth file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or is not
    /// valid JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|e| {
            HerderError::config_with_source(
                "Failed to read auth file".to_string(),
                Some(path.display().to_string()),
                e,
            )
        })?;

        let parsed: AuthFileContents = serde_json::from_str(&contents).map_err(|e| {
            HerderError::config_with_source(
                "Failed to parse auth file".to_string(),
                Some(path.display().to_string()),
                e,
            )
        })?;

        Ok(Self {
            path,
            entries: parsed.auths,
        })
    }

    /// Returns the path this store was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_entry(entry: &AuthEntry) -> Result<Option<Credentials>> {
        if let (Some(username), Some(password)) = (&entry.username, &entry.password) {
            return Ok(Some(Credentials::basic(username, password)));
        }

        let Some(encoded) = entry.auth.as_deref().filter(|a| !a.is_empty()) else {
            return Ok(None);
        };

        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| HerderError::validation_with_source("Failed to decode auth entry", e))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|e| HerderError::validation_with_source("Invalid auth entry encoding", e))?;

        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| HerderError::validation("Auth entry is not in user:password form"))?;

        Ok(Some(Credentials::basic(username, password)))
    }
}

impl CredentialStore for AuthFileStore {
    fn get(&self, registry: &str) -> Result<Option<Credentials>> {
        // Entries are sometimes keyed with a scheme or a trailing path.
        let entry = self.entries.get(registry).or_else(|| {
            self.entries.iter().find_map(|(key, entry)| {
                let host = key
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .split('/')
                    .next()
                    .unwrap_or_default();
                (host == registry).then_some(entry)
            })
        });

        match entry {
            Some(entry) => Self::decode_entry(entry),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut registries: Vec<String> = self.entries.keys().cloned().collect();
        registries.sort();
        Ok(registries)
    }
}
