//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables
//! 4. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use crate::format::ColorChoice;
use libherder::config::VerifySettings;
use libherder::registry::Inspector;
use libherder::{Credentials, HerderError, Result, SaasConfig, VerifierConfig};
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path of the default registry auth file, relative to the home directory.
pub const DEFAULT_AUTH_FILE: &str = "skopeo.json";

const AUTHFILE_ENV: &str = "SKOPEO_AUTHFILE";
const TOKEN_FILE_ENV: &str = "QUAY_TOKEN_FILE";
const COLOR_ENV: &str = "SAASHERDER_COLOR";

/// Application context with resolved configuration and runtime state
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: SaasConfig,
    /// Context requested with `--context`, applied by the commands that use one
    pub context: Option<String>,
    /// Credentials from `SKOPEO_USER`/`SKOPEO_PASS`
    pub credentials: Option<Credentials>,
    /// Resolved color choice
    pub color: ColorChoice,
    /// Tracking repository the command runs in
    pub root: PathBuf,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > env vars > CLI flags
    ///
    /// A missing config file is not an error; a malformed one is.
    pub fn build(
        config_path: &Path,
        context: Option<String>,
        cli_color: ColorChoice,
    ) -> Result<Self> {
        // 1. Start with defaults, 2. load the config file if it exists
        let mut config = if config_path.exists() {
            SaasConfig::load(config_path)?
        } else {
            debug!(path = %config_path.display(), "no config file, using defaults");
            SaasConfig::default()
        };

        // 3. Apply environment variable overrides
        apply_env(&mut config.verify, |key| env::var(key).ok());
        if config.verify.auth_file.is_none() {
            config.verify.auth_file = dirs::home_dir().map(|home| home.join(DEFAULT_AUTH_FILE));
        }
        let credentials = Credentials::from_env();

        // 4. Apply CLI flag overrides (highest priority)
        // --color only wins over the environment when set explicitly
        let env_color = env::var(COLOR_ENV).ok();
        let color = match (&env_color, cli_color) {
            (Some(value), ColorChoice::Auto) => ColorChoice::from(value.as_str()),
            _ => cli_color,
        };

        let root = env::current_dir().map_err(|e| HerderError::io(".", e))?;

        Ok(Self {
            config,
            context,
            credentials,
            color,
            root,
        })
    }

    /// Verifier configuration for `check-image`.
    pub fn verifier_config(&self, pattern: Option<&str>, skopeo: bool) -> Result<VerifierConfig> {
        let mut verifier = self.config.verify.to_verifier_config();
        verifier.credentials = self.credentials.clone();
        verifier.pattern = pattern
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    HerderError::validation_with_source(format!("Invalid pattern '{}'", p), e)
                })
            })
            .transpose()?;
        if skopeo {
            verifier.registry.inspector = Inspector::Skopeo;
        }
        Ok(verifier)
    }
}

/// Overrides auth and token file locations from the environment.
pub fn apply_env<F>(settings: &mut VerifySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(AUTHFILE_ENV).filter(|p| !p.is_empty()) {
        settings.auth_file = Some(PathBuf::from(path));
    }
    if let Some(path) = lookup(TOKEN_FILE_ENV).filter(|p| !p.is_empty()) {
        settings.token_file = Some(PathBuf::from(path));
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
