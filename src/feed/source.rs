use super::types::{Cursor, Page, SubjectId};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_PAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Shown when the server rejects a request without explaining why.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Errors that can occur while fetching a page of posts.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response carrying a `{ "message": ... }` body
    #[error("{message}")]
    Server { status: u16, message: String },
    /// Non-2xx response without a usable message
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body was not a valid page document
    #[error("Invalid page response: {0}")]
    Decode(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// The task running the fetch panicked
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

impl FetchError {
    /// Message suitable for showing to the user.
    ///
    /// Server-provided messages are passed through; blank ones fall back to
    /// [`GENERIC_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Server { message, .. } if message.trim().is_empty() => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    fn from_error_body(status: u16, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }

        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(ErrorBody {
                message: Some(message),
            }) => FetchError::Server { status, message },
            _ => FetchError::HttpStatus(status),
        }
    }
}

/// Capability for fetching one page of a subject's feed.
///
/// Implemented over HTTP by [`HttpFeedSource`]; tests substitute scripted sources.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the page starting at `cursor` (`None` for the first page).
    async fn fetch_page(
        &self,
        subject: &SubjectId,
        cursor: Option<&Cursor>,
    ) -> Result<Page, FetchError>;
}

/// Create a redirect policy with loop detection and limited hops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Build the HTTP client used for feed requests.
///
/// No overall request timeout is set: a page fetch fails only when the
/// network or the server rejects it.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// [`FeedSource`] backed by `GET {base}/posts?cursor=..&subject=..`.
pub struct HttpFeedSource {
    client: reqwest::Client,
    endpoint: Url,
    auth_token: Option<SecretString>,
}

impl HttpFeedSource {
    /// Create a source rooted at `base_url` (e.g. `https://example.com/api/`).
    pub fn new(
        client: reqwest::Client,
        base_url: &Url,
        auth_token: Option<SecretString>,
    ) -> Result<Self, url::ParseError> {
        let mut base = base_url.clone();
        // Url::join replaces the last segment unless the base ends in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("posts")?;

        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn page_url(&self, subject: &SubjectId, cursor: Option<&Cursor>) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("cursor", cursor.map(Cursor::as_str).unwrap_or(""))
            .append_pair("subject", subject.as_str());
        url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_page(
        &self,
        subject: &SubjectId,
        cursor: Option<&Cursor>,
    ) -> Result<Page, FetchError> {
        let url = self.page_url(subject, cursor);
        tracing::debug!(
            subject = %subject,
            cursor = cursor.map(Cursor::as_str).unwrap_or(""),
            "Fetching feed page"
        );

        let mut request = self.client.get(url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = read_limited_bytes(response, MAX_PAGE_SIZE).await?;

        if !status.is_success() {
            let err = FetchError::from_error_body(status.as_u16(), &bytes);
            tracing::warn!(subject = %subject, status = status.as_u16(), error = %err, "Feed page request rejected");
            return Err(err);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Page::default());
        }

        // A literal `null` body means "nothing here", same as an empty last page
        let page: Option<Page> =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        let page = page.unwrap_or_default();

        tracing::debug!(
            subject = %subject,
            posts = page.posts.len(),
            last = page.is_last(),
            "Feed page received"
        );
        Ok(page)
    }
}

/// Whether a declared Content-Length is over `limit`, compared without narrowing.
fn declared_length_exceeds(len: u64, limit: usize) -> bool {
    u64::try_from(limit).map_or(false, |limit| len > limit)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if declared_length_exceeds(len, limit) {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
