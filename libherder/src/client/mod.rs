//! HTTP client for registry tag lookups.
//!
//! This module provides a thin HTTP client built on reqwest. It speaks two
//! dialects: the Docker Registry v2 tag list (`/v2/<name>/tags/list`) and the
//! Quay.io REST API (`/api/v1/repository/<name>/tag/?page=N`).

use crate::auth::Credentials;
use crate::error::{HerderError, Result};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Response from the Docker Registry v2 tags list endpoint.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    /// List of tag names; registries return `null` for empty repositories
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// A single tag entry in a Quay tag page.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct QuayTag {
    /// Tag name
    pub name: String,
}

/// One page of the Quay tag listing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct QuayTagPage {
    /// Tags on this page
    #[serde(default)]
    pub tags: Vec<QuayTag>,
    /// Whether another page follows
    #[serde(default)]
    pub has_additional: bool,
    /// Page number echoed by the server
    #[serde(default)]
    pub page: Option<u32>,
}

impl QuayTagPage {
    /// Returns true if the page lists `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.name == tag)
    }
}

/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use libherder::client::ClientConfig;
///
/// use std::time::Duration;
///
/// let config = ClientConfig::new().with_timeout(Duration::from_millis(1500));
/// assert_eq!(config.timeout, Duration::from_millis(1500));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout (default: 10s)
    pub timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_idle_per_host: 10,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }
}

/// HTTP client bound to one registry endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    /// The underlying HTTP client
    http_client: ReqwestClient,
    /// Base URL (e.g., "https://quay.io")
    base_url: String,
    /// Timeout, kept for error messages
    timeout: Duration,
}

impl Client {
    /// Creates a new client for `base_url` with default configuration.
    ///
    /// A URL without a scheme gets `https://`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libherder::client::Client;
    ///
    /// let client = Client::new("quay.io").unwrap();
    /// assert_eq!(client.base_url(), "https://quay.io");
    /// ```
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    /// Creates a new client with custom configuration.
    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self> {
        let normalized_url = Self::normalize_url(base_url)?;

        let http_client = ReqwestClient::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .user_agent(concat!("saasherder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HerderError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            base_url: normalized_url,
            timeout: config.timeout,
        })
    }

    /// Normalizes a URL by ensuring it has a scheme and removing trailing slashes.
    fn normalize_url(url: &str) -> Result<String> {
        let url = url.trim();

        if url.is_empty() {
            return Err(HerderError::validation("Registry URL cannot be empty"));
        }

        let url = if !url.starts_with("http://") && !url.starts_with("https://") {
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        Ok(url.trim_end_matches('/').to_string())
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        match credentials.to_header_value() {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }

    /// Fetches the tag list of `repository` from a Docker Registry v2 endpoint.
    ///
    /// `repository` is the full path below the registry host, e.g.
    /// `openshiftio/rhel-foo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry is unreachable, answers with a
    /// non-success status, or returns a body that is not a tag list.
    pub async fn fetch_tags(
        &self,
        repository: &str,
        credentials: &Credentials,
    ) -> Result<Vec<String>> {
        let url = format!("{}/v2/{}/tags/list", self.base_url, repository);
        tracing::debug!(%url, "listing tags");

        let request = Self::authorized(self.http_client.get(&url), credentials);
        let response = request
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))?;

        let response = Self::check_response_status(response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| HerderError::validation_with_source("Failed to parse tags response", e))?;

        Ok(tags.tags.unwrap_or_default())
    }

    /// Fetches one page of Quay tags for `repository`.
    ///
    /// Pages are numbered from 1.
    pub async fn fetch_quay_tag_page(
        &self,
        repository: &str,
        page: u32,
        credentials: &Credentials,
    ) -> Result<QuayTagPage> {
        let url = format!(
            "{}/api/v1/repository/{}/tag/?page={}",
            self.base_url, repository, page
        );
        tracing::debug!(%url, page, "fetching quay tag page");

        let request = Self::authorized(self.http_client.get(&url), credentials);
        let response = request
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))?;

        // Quay answers 200 on success; anything else aborts this page walk.
        let status = response.status();
        if status != StatusCode::OK {
            let response = Self::check_response_status(response).await?;
            return Err(HerderError::server(
                format!("Unexpected HTTP {} from {}", status.as_u16(), response.url()),
                status.as_u16(),
            ));
        }

        response.json().await.map_err(|e| {
            HerderError::validation_with_source("Failed to parse Quay tag page", e)
        })
    }

    /// Translates a reqwest error into a HerderError.
    fn translate_reqwest_error(&self, error: reqwest::Error) -> HerderError {
        if error.is_timeout() {
            HerderError::network(format!(
                "Request to {} timed out after {:?}",
                self.base_url, self.timeout
            ))
        } else if error.is_connect() {
            HerderError::network_with_source(
                format!("Failed to connect to registry at {}", self.base_url),
                error,
            )
        } else {
            HerderError::network_with_source(
                format!("Network error communicating with {}", self.base_url),
                error,
            )
        }
    }

    /// Checks the HTTP response status and translates errors to HerderError.
    async fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(HerderError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(HerderError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::NOT_FOUND => Err(HerderError::not_found("endpoint", url.as_str())),
            StatusCode::TOO_MANY_REQUESTS => Err(HerderError::RateLimit {
                message: format!("Rate limit exceeded for {}", url),
            }),
            _ => Err(HerderError::server(
                format!("HTTP {} from {}: {}", status.as_u16(), url, error_body),
                status.as_u16(),
            )),
        }
    }
}
