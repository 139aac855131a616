use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::Client;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// A response body, delivered chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Retrieves pages for the crawler.
///
/// Implementations should give up promptly once `cancel` fires and report
/// it as [`FetchError::Cancelled`]. Non-success statuses are errors.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, cancel: &CancellationToken, url: &str) -> Result<ByteStream, FetchError>;
}

/// Production fetcher: a plain HTTP GET with the body streamed back.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("sitewalk/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, cancel: &CancellationToken, url: &str) -> Result<ByteStream, FetchError> {
        let target =
            Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        debug!("Fetching {}", url);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            response = self.client.get(target).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes_stream().map_err(FetchError::from).boxed())
    }
}

/// A canned response served by [`MockFetcher`].
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    /// Fail with a read error after the body has been sent.
    pub read_error: bool,
}

impl MockResponse {
    pub fn ok(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            body: body.into(),
            read_error: false,
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            body: Vec::new(),
            read_error: false,
        }
    }

    pub fn with_read_error(mut self) -> Self {
        self.read_error = true;
        self
    }
}

/// Serves canned bodies keyed by URL; anything unknown is a 404.
///
/// Records how often each URL was requested and the highest number of
/// requests it saw in flight at once.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    chunk_size: Option<usize>,
    delay: Option<Duration>,
    requests: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_canned_response(&mut self, response: MockResponse) {
        self.responses.insert(response.url.clone(), response);
    }

    pub fn with_response(mut self, response: MockResponse) -> Self {
        self.add_canned_response(response);
        self
    }

    /// Deliver bodies in chunks of `size` bytes instead of all at once.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Hold every request for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn body_stream(&self, response: &MockResponse) -> ByteStream {
        let chunk_size = self.chunk_size.unwrap_or(response.body.len().max(1));
        let mut chunks: Vec<Result<Bytes, FetchError>> = response
            .body
            .chunks(chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if response.read_error {
            chunks.push(Err(FetchError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset while reading body",
            ))));
        }
        stream::iter(chunks).boxed()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn get(&self, cancel: &CancellationToken, url: &str) -> Result<ByteStream, FetchError> {
        *self
            .requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(url.to_string())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        match self.responses.get(url) {
            Some(response) if (200..300).contains(&response.status) => {
                Ok(self.body_stream(response))
            }
            Some(response) => Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
