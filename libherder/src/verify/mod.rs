//! Image existence verification.
//!
//! The [`Verifier`] wraps a [`TagProbe`] with the policies around a lookup:
//!
//! - an optional filter pattern, checked before any network call;
//! - credentials first, then one anonymous try when the authenticated query
//!   fails (never the other way round);
//! - up to `max_retries` attempts with linear backoff (`n × backoff_unit`
//!   after failed attempt `n`);
//! - batches verified concurrently, every image reported, failures collected.

use crate::auth::{CredentialChain, Credentials};
use crate::error::{AttemptTrail, Result, VerifyError};
use crate::reference::ImageReference;
use crate::registry::{Registry, RegistryQueryResult, RegistrySettings, TagProbe};
use futures::StreamExt;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};


/// Verifier settings.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Explicit credentials (take priority over the files)
    pub credentials: Option<Credentials>,
    /// skopeo/docker style auth file
    pub auth_file: Option<PathBuf>,
    /// File holding a bearer token
    pub token_file: Option<PathBuf>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Total attempts per image
    pub max_retries: u32,
    /// Sleep unit for the linear backoff
    pub backoff_unit: Duration,
    /// Images verified at once in a batch
    pub concurrency: usize,
    /// Images must match this pattern to be checked at all
    pub pattern: Option<Regex>,
    /// Endpoints and lookup mechanism
    pub registry: RegistrySettings,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            auth_file: None,
            token_file: None,
            timeout: Duration::from_secs(10),
            max_retries: 5,
            backoff_unit: Duration::from_secs(1),
            concurrency: 4,
            pattern: None,
            registry: RegistrySettings::default(),
        }
    }
}

/// Which credentials the successful lookup used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPath {
    /// Credentials were sent
    Authenticated,
    /// No credentials were sent
    Anonymous,
}

/// A successfully verified image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// The reference that was checked (with the expected tag)
    pub reference: ImageReference,
    /// Path that succeeded
    pub path: AuthPath,
    /// Attempt number that succeeded, from 1
    pub attempts: u32,
}

/// Outcome of verifying one image.
pub type VerifyOutcome = std::result::Result<Verified, VerifyError>;

/// Status tag printed in front of each image line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    OkAuth,
    OkNoAuth,
    ErrorAuth,
    ErrorNoAuth,
    ErrorNoMatch,
    Error,
    Skip,
}

impl StatusTag {
    /// Returns true for the OK-class tags and `Skip`.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::OkAuth | Self::OkNoAuth | Self::Skip)
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::OkAuth => "OK_AUTH",
            Self::OkNoAuth => "OK_NOAUTH",
            Self::ErrorAuth => "ERROR_AUTH",
            Self::ErrorNoAuth => "ERROR_NOAUTH",
            Self::ErrorNoMatch => "ERROR_NO_MATCH",
            Self::Error => "ERROR",
            Self::Skip => "SKIP",
        };
        f.write_str(tag)
    }
}

/// One printable line of a verification report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub tag: StatusTag,
    pub image: String,
    pub detail: Option<String>,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} {}: {}", self.tag, self.image, detail),
            None => write!(f, "{} {}", self.tag, self.image),
        }
    }
}

/// Expands an outcome into its status lines.
///
/// A failure that went through both authentication paths yields two lines,
/// `ERROR_AUTH` and `ERROR_NOAUTH`.
pub fn status_lines(image: &str, outcome: &VerifyOutcome) -> Vec<StatusLine> {
    let line = |tag, detail: Option<String>| StatusLine {
        tag,
        image: image.to_string(),
        detail,
    };

    match outcome {
        Ok(verified) => {
            let tag = match verified.path {
                AuthPath::Authenticated => StatusTag::OkAuth,
                AuthPath::Anonymous => StatusTag::OkNoAuth,
            };
            vec![line(tag, None)]
        }
        Err(err @ VerifyError::NoRegistrySpecified { .. }) => {
            vec![line(StatusTag::Skip, Some(err.to_string()))]
        }
        Err(err @ VerifyError::PatternMismatch { .. }) => {
            vec![line(StatusTag::ErrorNoMatch, Some(err.to_string()))]
        }
        Err(err) => match err.trail() {
            Some(trail) => {
                let mut lines = Vec::new();
                if let Some(detail) = &trail.authenticated {
                    lines.push(line(StatusTag::ErrorAuth, Some(detail.clone())));
                }
                if let Some(detail) = &trail.anonymous {
                    lines.push(line(StatusTag::ErrorNoAuth, Some(detail.clone())));
                }
                if lines.is_empty() {
                    lines.push(line(StatusTag::Error, Some(err.to_string())));
                }
                lines
            }
            None => vec![line(StatusTag::Error, Some(err.to_string()))],
        },
    }
}

/// Result of a batch verification.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Outcomes ordered by image
    pub results: Vec<(String, VerifyOutcome)>,
    /// Whether the batch was interrupted
    pub cancelled: bool,
}

impl BatchReport {
    /// True when nothing failed and the batch ran to completion.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self
                .results
                .iter()
                .all(|(_, outcome)| matches!(outcome, Ok(_)) || is_skip(outcome))
    }

    /// Failed outcomes (skips excluded).
    pub fn failures(&self) -> impl Iterator<Item = &VerifyError> {
        self.results
            .iter()
            .filter_map(|(_, outcome)| outcome.as_ref().err())
            .filter(|err| !err.is_skip())
    }
}

fn is_skip(outcome: &VerifyOutcome) -> bool {
    matches!(outcome, Err(err) if err.is_skip())
}

/// Verifies that images exist in their registries.
pub struct Verifier<P = Registry> {
    config: VerifierConfig,
    credentials: CredentialChain,
    probe: P,
}

impl Verifier<Registry> {
    /// Creates a verifier backed by real registry lookups.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry settings are invalid.
    pub fn new(mut config: VerifierConfig) -> Result<Self> {
        config.registry.client.timeout = config.timeout;
        let registry = Registry::new(config.registry.clone())?;
        Ok(Self::with_probe(config, registry))
    }
}

impl<P: TagProbe> Verifier<P> {
    /// Creates a verifier around any probe.
    pub fn with_probe(config: VerifierConfig, probe: P) -> Self {
        let credentials = CredentialChain::new(
            config.credentials.clone(),
            config.auth_file.clone(),
            config.token_file.clone(),
        );
        Self {
            config,
            credentials,
            probe,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Checks that `image` exists with `expected_tag`.
    pub async fn verify(&self, image: &str, expected_tag: &str) -> VerifyOutcome {
        if let Some(pattern) = self.config.pattern.as_ref().filter(|p| !p.is_match(image)) {
            return Err(VerifyError::PatternMismatch {
                image: image.to_string(),
                pattern: pattern.as_str().to_string(),
            });
        }

        let reference = ImageReference::from_str(image)
            .map_err(|e| VerifyError::InvalidReference {
                image: image.to_string(),
                message: e.to_string(),
            })?
            .with_tag(expected_tag);

        let Some(host) = reference.registry() else {
            warn!(image, "no registry specified, skipping verification");
            return Err(VerifyError::NoRegistrySpecified {
                image: image.to_string(),
            });
        };

        let mut trail = AttemptTrail::default();
        let target = self.probe.credential_target(&reference);
        let credentials = match self.credentials.resolve(host, target) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(image, error = %e, "could not load credentials, continuing anonymously");
                trail.authenticated = Some(e.to_string());
                Credentials::Anonymous
            }
        };

        let max_attempts = self.config.max_retries.max(1);
        let mut last = RegistryQueryResult::TransientError {
            status: None,
            detail: "no attempt made".to_string(),
        };

        for attempt in 1..=max_attempts {
            if !credentials.is_anonymous() {
                let result = self.probe.probe(&reference, &credentials).await;
                if result.is_found() {
                    info!(image, attempt, "verified with credentials");
                    return Ok(Verified {
                        reference,
                        path: AuthPath::Authenticated,
                        attempts: attempt,
                    });
                }
                debug!(image, attempt, detail = result.detail(), "authenticated lookup failed");
                trail.authenticated = Some(result.detail().to_string());
            }

            let result = self.probe.probe(&reference, &Credentials::Anonymous).await;
            if result.is_found() {
                info!(image, attempt, "verified anonymously");
                return Ok(Verified {
                    reference,
                    path: AuthPath::Anonymous,
                    attempts: attempt,
                });
            }
            debug!(image, attempt, detail = result.detail(), "anonymous lookup failed");
            trail.anonymous = Some(result.detail().to_string());
            last = result;

            if attempt < max_attempts {
                let delay = self.config.backoff_unit * attempt;
                debug!(image, attempt, ?delay, "retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }

        Err(final_error(image, &reference, max_attempts, last, trail))
    }

    /// Checks that `image` exists with the tag it names.
    pub async fn verify_reference(&self, image: &str) -> VerifyOutcome {
        let tag = ImageReference::from_str(image)
            .map(|r| r.tag().to_string())
            .map_err(|e| VerifyError::InvalidReference {
                image: image.to_string(),
                message: e.to_string(),
            });

        match tag {
            Ok(tag) => self.verify(image, &tag).await,
            // The pattern check still wins over a parse failure.
            Err(err) => match &self.config.pattern {
                Some(pattern) if !pattern.is_match(image) => Err(VerifyError::PatternMismatch {
                    image: image.to_string(),
                    pattern: pattern.as_str().to_string(),
                }),
                _ => Err(err),
            },
        }
    }

    /// Verifies a batch of images until done or until `cancel` resolves.
    pub async fn verify_batch<I, F>(&self, images: I, cancel: F) -> BatchReport
    where
        I: IntoIterator<Item = String>,
        F: Future<Output = ()>,
    {
        self.verify_batch_with(images, cancel, |_, _| {}).await
    }

    /// Like [`Verifier::verify_batch`], calling `on_done` as each image finishes.
    pub async fn verify_batch_with<I, F, C>(&self, images: I, cancel: F, mut on_done: C) -> BatchReport
    where
        I: IntoIterator<Item = String>,
        F: Future<Output = ()>,
        C: FnMut(&str, &VerifyOutcome),
    {
        let unique: BTreeSet<String> = images.into_iter().collect();
        let concurrency = self.config.concurrency.max(1);
        info!(images = unique.len(), concurrency, "verifying images");

        let mut pending = futures::stream::iter(unique.iter().cloned())
            .map(|image| async move {
                let outcome = self.verify_reference(&image).await;
                (image, outcome)
            })
            .buffer_unordered(concurrency);

        let mut report = BatchReport::default();
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                next = pending.next() => match next {
                    Some((image, outcome)) => {
                        on_done(&image, &outcome);
                        report.results.push((image, outcome));
                    }
                    None => break,
                },
                _ = &mut cancel => {
                    warn!("verification interrupted");
                    report.cancelled = true;
                    break;
                }
            }
        }

        if report.cancelled {
            let finished: BTreeSet<String> =
                report.results.iter().map(|(image, _)| image.clone()).collect();
            for image in unique.difference(&finished) {
                report.results.push((
                    image.clone(),
                    Err(VerifyError::Cancelled {
                        image: image.clone(),
                    }),
                ));
            }
        }

        report.results.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }
}

fn final_error(
    image: &str,
    reference: &ImageReference,
    attempts: u32,
    last: RegistryQueryResult,
    trail: AttemptTrail,
) -> VerifyError {
    let image = image.to_string();
    match last {
        RegistryQueryResult::Found | RegistryQueryResult::NotFound { .. } => {
            VerifyError::TagNotFound {
                image,
                tag: reference.tag().to_string(),
                attempts,
                trail,
            }
        }
        RegistryQueryResult::AuthRequired { status, .. } => VerifyError::HttpError {
            image,
            status,
            trail,
        },
        RegistryQueryResult::TransientError {
            status: Some(status),
            ..
        } => VerifyError::HttpError {
            image,
            status,
            trail,
        },
        RegistryQueryResult::TransientError { status: None, .. } => {
            VerifyError::NetworkError { image, trail }
        }
    }
}
