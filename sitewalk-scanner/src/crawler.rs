use crate::error::{FetchError, Result, ScanError};
use crate::fetch::{Fetch, HttpFetcher};
use crate::page::Page;
use crate::result::{PageLinks, PageResult, into_page_links};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Fetches allowed in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Called with `(level, url)` as each fetch is dispatched.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Breadth-first crawler over a single host.
///
/// The crawl runs level by level. Every page of a level is fetched
/// concurrently (at most `concurrency` at a time) and the whole level is
/// joined before the next frontier is built, so the visited set and the
/// results are only ever touched from the crawl's own control flow.
///
/// Pages hold a streaming tokenizer that is not `Send`, so the future
/// returned by [`Crawler::crawl`] cannot go to `tokio::spawn`. Await it in
/// place or hand it to `tokio::task::spawn_local` on a `LocalSet`.
pub struct Crawler {
    fetcher: Arc<dyn Fetch>,
    concurrency: usize,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancellationToken::new(),
            progress_callback: None,
        }
    }

    /// A crawler that fetches over HTTP.
    pub fn http() -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::new()?)))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Once `cancel` fires, in-flight and later fetches fail like any other
    /// page error; the crawl still returns what it has.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Crawl from `start_url`, following links on `host` (empty for no
    /// restriction), and map every visited page to its links.
    pub async fn crawl(&self, start_url: &str, host: &str) -> Result<PageLinks> {
        let results = self.crawl_pages(start_url, host).await?;
        Ok(into_page_links(results))
    }

    /// Like [`Crawler::crawl`] but keeps per-page failure detail, in visit order.
    pub async fn crawl_pages(&self, start_url: &str, host: &str) -> Result<Vec<PageResult>> {
        Url::parse(start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", start_url, e)))?;

        info!(
            "Starting crawl of {} (host: {:?}, concurrency: {})",
            start_url, host, self.concurrency
        );

        let mut visited: HashSet<String> = HashSet::new();
        let mut results: Vec<PageResult> = Vec::new();
        let mut frontier: HashMap<String, Page> = HashMap::new();
        frontier.insert(start_url.to_string(), Page::new(start_url, host));
        let mut level = 0;

        while !frontier.is_empty() {
            let pending: Vec<Page> = frontier
                .into_values()
                .filter(|page| !visited.contains(page.url()))
                .collect();

            info!("Level {}: fetching {} page(s)", level, pending.len());
            let fetched: Vec<PageResult> = stream::iter(pending)
                .map(|page| self.visit(level, page))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for result in &fetched {
                visited.insert(result.url.clone());
            }

            frontier = HashMap::new();
            for result in &fetched {
                for link in &result.links {
                    if !visited.contains(link) && !frontier.contains_key(link) {
                        frontier.insert(link.clone(), Page::new(link.as_str(), host));
                    }
                }
            }

            results.extend(fetched);
            level += 1;
        }

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(
            "Crawl complete. Visited {} pages over {} level(s), {} failed",
            results.len(),
            level,
            failed
        );
        Ok(results)
    }

    async fn visit(&self, level: usize, mut page: Page) -> PageResult {
        if let Some(ref callback) = self.progress_callback {
            callback(level, page.url().to_string());
        }

        let url = page.url().to_string();
        match self.stream_into(&mut page).await {
            Ok(()) => {
                let links = page.into_links();
                debug!("{} has {} link(s)", url, links.len());
                PageResult::new(url, links)
            }
            Err(e) => {
                warn!("Error reading page {}: {}", url, e);
                PageResult::with_error(url, e.to_string())
            }
        }
    }

    async fn stream_into(&self, page: &mut Page) -> std::result::Result<(), FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let mut body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
            body = self.fetcher.get(&self.cancel, page.url()) => body?,
        };

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                chunk = body.next() => chunk,
            };
            match chunk {
                Some(chunk) => page.write_chunk(&chunk?),
                None => break,
            }
        }

        page.finish();
        Ok(())
    }
}
