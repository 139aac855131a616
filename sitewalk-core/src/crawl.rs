use indicatif::{ProgressBar, ProgressStyle};
use sitewalk_scanner::{
    Crawler, DEFAULT_CONCURRENCY, Fetch, PageResult, ProgressCallback, host_with_port,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    /// Host the crawl is restricted to; empty follows every host
    pub host: String,
    pub concurrency: usize,
    /// Whole-crawl deadline; outstanding fetches are cancelled when it passes
    pub timeout: Option<Duration>,
    pub show_progress_bars: bool,
    pub cancel: CancellationToken,
    /// Fetch through this instead of HTTP
    pub fetcher: Option<Arc<dyn Fetch>>,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            host: host.into(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            show_progress_bars: false,
            cancel: CancellationToken::new(),
            fetcher: None,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// The host a crawl starting at `url` stays on, or `""` to follow every host.
pub fn scope_host(url: &Url, any_host: bool) -> Result<String, String> {
    if any_host {
        return Ok(String::new());
    }
    host_with_port(url).ok_or_else(|| format!("{} has no host to restrict the crawl to", url))
}

/// Execute a crawl with the given options
/// Returns the crawl results in visit order
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<Vec<PageResult>, String> {
    let CrawlOptions {
        url,
        host,
        concurrency,
        timeout,
        show_progress_bars,
        cancel,
        fetcher,
    } = options;

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    // Counter for tracking dispatched fetches
    let processed_count = Arc::new(AtomicUsize::new(0));

    let pb_clone = progress_bar.clone();
    let count_clone = processed_count.clone();
    let internal_progress_callback: ProgressCallback = Arc::new(move |level: usize, url: String| {
        let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!(
                "Level {}: {} ({} pages fetched)",
                level,
                extract_url_path(&url),
                count
            ));
            pb.tick();
        }
    });

    let crawler = match fetcher {
        Some(fetcher) => Crawler::new(fetcher),
        None => Crawler::http().map_err(|e| format!("Failed to set up crawler: {}", e))?,
    }
    .with_concurrency(concurrency)
    .with_cancellation(cancel.clone())
    .with_progress_callback(internal_progress_callback);

    let deadline = timeout.map(|limit| {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            if !token.is_cancelled() {
                warn!("Crawl deadline of {:?} reached, cancelling outstanding fetches", limit);
                token.cancel();
            }
        })
    });

    let outcome = crawler.crawl_pages(&url, &host).await;

    if let Some(handle) = deadline {
        handle.abort();
    }

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            if let Some(ref pb) = progress_bar {
                pb.finish_and_clear();
            }
            return Err(format!("Failed to crawl {}: {}", url, e));
        }
    };

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Crawl complete! {} pages fetched", total));
    }

    if let Some(ref callback) = progress_callback {
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            callback(format!("[!] {} of {} pages could not be read", failed, results.len()));
        }
        if cancel.is_cancelled() {
            callback("[!] Crawl was cancelled, results are partial".to_string());
        }
    }

    Ok(results)
}
