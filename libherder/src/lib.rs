//! SaaS Herder - deployment bookkeeping library
//!
//! libherder backs the `saasherder` CLI, which tracks, per service, a source
//! repository and a pinned commit. It provides two independent engines:
//!
//! - **Image verification**: checks that every image referenced by a rendered
//!   manifest exists in its registry (Quay API, Docker Registry v2 or
//!   `skopeo inspect`), with authentication fallback and retries.
//! - **Changelog generation**: diffs the service pins between two revisions of
//!   the tracking repository and renders the commits in between as plain
//!   text, Markdown or HTML.
//!
//! # Quick Start
//!
//! ```no_run
//! use libherder::{Verifier, VerifierConfig, images_from_manifest, status_lines};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let images = images_from_manifest(Path::new("processed/foo.yaml"))?;
//! let verifier = Verifier::new(VerifierConfig::default())?;
//!
//! let report = verifier.verify_batch(images, std::future::pending()).await;
//! for (image, outcome) in &report.results {
//!     for line in status_lines(image, outcome) {
//!         println!("{}", line);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Main Types
//!
//! - [`Verifier`] - Image existence checks, single or batched
//! - [`Changelog`] - Changelog generation over a [`SnapshotSource`]
//! - [`SaasConfig`] - `config.yaml` contexts and verifier settings
//! - [`ImageReference`] - Parsed image reference
//! - [`HerderError`] / [`VerifyError`] - Error taxonomy

#![warn(clippy::all)]

/// Returns the libherder crate version.
///
/// # Examples
///
/// ```
/// let version = libherder::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// Re-export commonly used types for convenience
pub use auth::{CredentialChain, CredentialTarget, Credentials};
pub use changelog::{Changelog, Format, ServiceDiff, fetch_diff, render};
pub use config::SaasConfig;
pub use error::{HerderError, Result, VerifyError};
pub use git::{GitRunner, SystemGit};
pub use manifest::images_from_manifest;
pub use reference::ImageReference;
pub use registry::{Registry, RegistryQueryResult, TagProbe};
pub use snapshot::{Service, ServiceField, ServiceSnapshot, ServicesDir, SnapshotSource};
pub use validation::validate_template;
pub use verify::{BatchReport, StatusTag, Verifier, VerifierConfig, status_lines};

pub mod auth;
pub mod changelog;
pub mod client;
pub mod config;
pub mod error;
pub mod git;
pub mod manifest;
pub mod reference;
pub mod registry;
pub mod snapshot;
pub mod validation;
pub mod verify;
