pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod page;
pub mod policy;
pub mod result;

pub use crawler::{Crawler, DEFAULT_CONCURRENCY, ProgressCallback};
pub use error::{FetchError, ScanError};
pub use fetch::{ByteStream, Fetch, HttpFetcher, MockFetcher, MockResponse};
pub use page::Page;
pub use policy::{accept_and_normalize, host_with_port};
pub use result::{PageLinks, PageResult};

/// Crawl `start_url` over HTTP with the default settings, following only
/// links on `host` (or every link when `host` is empty).
///
/// The returned future is not `Send`: await it in place, or run it in the
/// background with `tokio::task::spawn_local` inside a `LocalSet`.
pub async fn crawl(start_url: &str, host: &str) -> error::Result<PageLinks> {
    Crawler::http()?.crawl(start_url, host).await
}
