use log::*;
use thiserror::Error;

/// User-Agent header sent by [`HttpTransport`] unless overridden.
pub const DEFAULT_USER_AGENT: &str =
    concat!("osm-client/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned {code} for '{url}'")]
    Status { url: String, code: u16 },
}

/// Abstraction over "fetch a response body from a URL".
///
/// Capability negotiation goes through this trait so the wire layer can be
/// replaced in tests or adapted by callers. Implementations must report
/// non-success statuses as errors, not as bodies.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<String, TransportError>;
}

/// Default reqwest-backed transport.
///
/// No retries and no timeout beyond what reqwest itself enforces; a failed
/// fetch surfaces immediately to the caller.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Create a transport sending the given User-Agent header.
    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.into(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        debug!("GET {url}");
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("'{url}' answered {status}");
            return Err(TransportError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        Ok(resp.text().await?)
    }
}
