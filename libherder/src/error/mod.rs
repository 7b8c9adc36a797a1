//! Error types for SaaS Herder
//!
//! This module provides the error taxonomy shared by the registry verifier,
//! the changelog engine and the configuration layer. `HerderError` covers
//! operational failures; `VerifyError` describes why a single image failed
//! verification and carries the detail of both authentication paths.

use std::fmt;
use thiserror::Error;


/// Main error type for herder operations
#[derive(Error, Debug)]
pub enum HerderError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403, token issues)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found errors (404)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit { message: String },

    /// Any other non-success HTTP status
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Validation errors (malformed reference, unparseable response, etc.)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid config file, unknown context)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local filesystem errors
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A git (or other external tool) invocation exited unsuccessfully
    #[error("Command `{command}` failed with exit code {exit_code:?}: {stderr}")]
    Git {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A date revision resolved to no commit
    #[error("No commit found at or before {date}")]
    AmbiguousDate { date: String },
}

/// Result type alias for herder operations
pub type Result<T> = std::result::Result<T, HerderError>;

impl HerderError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::error::HerderError;
    ///
    /// let err = HerderError::network("connection refused");
    /// assert!(matches!(err, HerderError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::error::HerderError;
    ///
    /// let err = HerderError::not_found("tag", "v1");
    /// assert_eq!(err.to_string(), "tag not found: v1");
    /// ```
    pub fn not_found<S: Into<String>>(resource_type: S, name: S) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::error::HerderError;
    ///
    /// let err = HerderError::validation("empty image reference");
    /// assert!(matches!(err, HerderError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an I/O error tagged with the path it occurred on.
    pub fn io<P: fmt::Display>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }

    /// Creates a failed-command error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::error::HerderError;
    ///
    /// let err = HerderError::git("git checkout deadbeef", Some(128), "pathspec did not match");
    /// assert!(err.to_string().contains("exit code Some(128)"));
    /// ```
    pub fn git<C: Into<String>, S: Into<String>>(
        command: C,
        exit_code: Option<i32>,
        stderr: S,
    ) -> Self {
        Self::Git {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status_code, .. } => *status_code,
            Self::Server { status_code, .. } => Some(*status_code),
            Self::NotFound { .. } => Some(404),
            Self::RateLimit { .. } => Some(429),
            _ => None,
        }
    }
}

/// Last failure detail observed on each authentication path.
///
/// Both are surfaced to the user so a credentials problem can be told apart
/// from a genuinely missing image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptTrail {
    /// Detail of the last failed authenticated query, if one was made
    pub authenticated: Option<String>,
    /// Detail of the last failed anonymous query, if one was made
    pub anonymous: Option<String>,
}

impl fmt::Display for AttemptTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.authenticated, &self.anonymous) {
            (Some(auth), Some(anon)) => write!(f, "auth: {}; anonymous: {}", auth, anon),
            (Some(auth), None) => write!(f, "auth: {}", auth),
            (None, Some(anon)) => write!(f, "{}", anon),
            (None, None) => write!(f, "no attempt made"),
        }
    }
}

/// Why a single image failed verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The reference names no registry; verification is skipped with a warning
    #[error("no registry specified for {image}, skipping")]
    NoRegistrySpecified { image: String },

    /// The image does not match the caller-supplied filter
    #[error("{image} does not match pattern '{pattern}'")]
    PatternMismatch { image: String, pattern: String },

    /// The reference could not be parsed
    #[error("invalid image reference '{image}': {message}")]
    InvalidReference { image: String, message: String },

    /// The tag is absent after all retries (and all pages)
    #[error("tag {tag} not found for {image} after {attempts} attempts ({trail})")]
    TagNotFound {
        image: String,
        tag: String,
        attempts: u32,
        trail: AttemptTrail,
    },

    /// The registry answered with an unexpected HTTP status
    #[error("HTTP {status} while checking {image} ({trail})")]
    HttpError {
        image: String,
        status: u16,
        trail: AttemptTrail,
    },

    /// The registry could not be reached
    #[error("network error while checking {image} ({trail})")]
    NetworkError { image: String, trail: AttemptTrail },

    /// The batch was interrupted before this image finished
    #[error("verification of {image} was cancelled")]
    Cancelled { image: String },
}

impl VerifyError {
    /// Returns true for outcomes that are warnings rather than failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NoRegistrySpecified { .. })
    }

    /// Returns the image the error refers to.
    pub fn image(&self) -> &str {
        match self {
            Self::NoRegistrySpecified { image }
            | Self::PatternMismatch { image, .. }
            | Self::InvalidReference { image, .. }
            | Self::TagNotFound { image, .. }
            | Self::HttpError { image, .. }
            | Self::NetworkError { image, .. }
            | Self::Cancelled { image } => image,
        }
    }

    /// Returns the per-path failure trail, when the registry was queried.
    pub fn trail(&self) -> Option<&AttemptTrail> {
        match self {
            Self::TagNotFound { trail, .. }
            | Self::HttpError { trail, .. }
            | Self::NetworkError { trail, .. } => Some(trail),
            _ => None,
        }
    }
}
