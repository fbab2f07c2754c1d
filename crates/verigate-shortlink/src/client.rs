use crate::error::AttemptError;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;
use typed_builder::TypedBuilder;

type AttemptResult<T> = std::result::Result<T, AttemptError>;

/// One round-trip to the external shortening service.
///
/// Implementations make a single attempt per call; retry and caching live
/// in [`ShortlinkResolver`](crate::ShortlinkResolver).
#[async_trait]
pub trait ShortenerClient: Send + Sync + 'static {
    /// Asks the shortener for a short URL pointing at `long_url`.
    ///
    /// Returns the raw `shortenedUrl` value; the caller validates it.
    async fn shorten(&self, long_url: &str) -> AttemptResult<String>;

    /// Issues a GET on `url`, following redirects, and returns the final URL.
    async fn follow(&self, url: &str) -> AttemptResult<String>;
}

/// Connection settings for [`HttpShortenerClient`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct HttpShortenerSettings {
    /// Full API endpoint, e.g. `https://short.example/api`.
    api_url: String,
    api_key: String,
    #[builder(default = Duration::from_secs(15))]
    shorten_timeout: Duration,
    #[builder(default = Duration::from_secs(10))]
    follow_timeout: Duration,
    #[builder(default = 10)]
    max_redirects: usize,
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(rename = "shortenedUrl")]
    shortened_url: Option<String>,
}

/// `reqwest` client for shorteners speaking the `GET /api?api=KEY&url=URL`
/// convention that answers with `{"shortenedUrl": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpShortenerClient {
    http: reqwest::Client,
    probe: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpShortenerClient {
    pub fn new(settings: HttpShortenerSettings) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.shorten_timeout)
            .build()?;
        let probe = reqwest::Client::builder()
            .timeout(settings.follow_timeout)
            .redirect(Policy::limited(settings.max_redirects))
            .build()?;

        Ok(Self {
            http,
            probe,
            api_url: settings.api_url,
            api_key: settings.api_key,
        })
    }

    /// Builds the conventional API endpoint for a shortener domain.
    pub fn api_url_for_domain(domain: &str) -> String {
        format!("https://{}/api", domain.trim_end_matches('/'))
    }
}

// The request URL carries the API key, so it is stripped from every error.
fn transport_error(err: reqwest::Error) -> AttemptError {
    AttemptError::Transport(err.without_url().to_string())
}

#[async_trait]
impl ShortenerClient for HttpShortenerClient {
    async fn shorten(&self, long_url: &str) -> AttemptResult<String> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[("api", self.api_key.as_str()), ("url", long_url)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        trace!(status = status.as_u16(), "shortener responded");
        if status != StatusCode::OK {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body: ShortenResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::MalformedBody(e.without_url().to_string()))?;

        body.shortened_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AttemptError::MalformedBody("missing shortenedUrl".to_string()))
    }

    async fn follow(&self, url: &str) -> AttemptResult<String> {
        let response = self.probe.get(url).send().await.map_err(transport_error)?;
        Ok(response.url().to_string())
    }
}
