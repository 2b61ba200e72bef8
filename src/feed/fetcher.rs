use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use url::Url;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default response body cap. Feed documents larger than this are junk.
const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a feed document.
///
/// Any of these fails the whole refresh; the previously held items are
/// left untouched by the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the configured size limit
    #[error("response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Tunables for a single document fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Response body size cap.
    pub max_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Fetches one feed document, returning its raw bytes.
///
/// This is the only suspension point in a refresh cycle: the caller
/// aborts the task awaiting it to cancel an in-flight refresh. There is no
/// retry or backoff here: a failed refresh reports once and the next
/// `refresh()` call tries again.
///
/// # Errors
///
/// See [`FetchError`]. Non-2xx statuses are errors; redirects are
/// followed by the client's policy before we see the response.
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &Url,
    options: &FetchOptions,
) -> Result<Vec<u8>, FetchError> {
    tokio::time::timeout(options.timeout, async {
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, options.max_bytes).await
    })
    .await
    .map_err(|_| FetchError::Timeout)?
}

/// Reads a response body up to `limit` bytes, verifying completeness
/// against Content-Length when the server provides one.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: Content-Length already over the cap
    if let Some(len) = expected_length {
        if len as usize > limit {
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

    // A short read means the connection dropped mid-body
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
