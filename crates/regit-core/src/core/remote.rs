use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

use super::error::ReconstructError;

pub(crate) const USER_AGENT: &str = concat!("regit/", env!("CARGO_PKG_VERSION"));
pub(crate) const METADATA_SEGMENT: &str = ".git";

/// Result of a single GET against the exposed metadata directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Vec<u8>),
    /// The server answered with a non-success status.
    Missing { status: u16 },
}

/// Read-only view of the remote metadata directory.
///
/// Transport failures (connect, read, timeout) are `Err`; anything the server
/// actually answered is a [`FetchOutcome`].
pub trait RemoteFetcher: Send + Sync {
    fn get(&self, path: &str) -> Result<FetchOutcome>;

    /// Absolute URL for `path`, used in diagnostics.
    fn url_for(&self, path: &str) -> String;
}

/// Normalize an operator-supplied base URL so it ends in `.git/`.
///
/// # Errors
///
/// Returns [`ReconstructError::InvalidUrl`] when the input is not an absolute
/// http(s) URL.
pub fn normalize_base_url(raw: &str) -> Result<Url, ReconstructError> {
    let invalid = |reason: &str| ReconstructError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https are supported"));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("url has no host"));
    }
    let mut path = url.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    if !path.split('/').any(|segment| segment == METADATA_SEGMENT) {
        path.push_str(METADATA_SEGMENT);
        path.push('/');
    }
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Blocking HTTP client rooted at a normalized metadata URL.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base: Url,
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    /// # Errors
    ///
    /// Fails when the URL is invalid or the HTTP client cannot be built.
    pub fn new(raw_url: &str, timeout: Duration, keep_proxies: bool) -> Result<Self> {
        let base = normalize_base_url(raw_url)?;
        let client = http_client(timeout, keep_proxies)?;
        Ok(Self { base, client })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("cannot join {path} onto {}", self.base))
    }
}

fn http_client(timeout: Duration, keep_proxies: bool) -> Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout);
    if !keep_proxies {
        builder = builder.no_proxy();
    }
    builder.build().context("failed to build http client")
}

impl RemoteFetcher for HttpRemote {
    fn get(&self, path: &str) -> Result<FetchOutcome> {
        let url = self.join(path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "GET");
        if !status.is_success() {
            return Ok(FetchOutcome::Missing {
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(FetchOutcome::Found(bytes.to_vec()))
    }

    fn url_for(&self, path: &str) -> String {
        self.join(path)
            .map_or_else(|_| format!("{}{path}", self.base), |url| url.to_string())
    }
}
