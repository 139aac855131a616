pub mod crawl;
pub mod report;

pub use crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path, scope_host};
pub use report::{ReportData, ReportFormat};
