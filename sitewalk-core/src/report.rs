// Report generation from crawl results

use serde::{Deserialize, Serialize};
use sitewalk_scanner::PageResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    pub start_url: String,
    pub host: String,
    pub summary: CrawlSummary,
    /// Sorted by URL, each with sorted links
    pub pages: Vec<PageResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub total_pages: usize,
    pub failed_pages: usize,
    pub total_links: usize,
}

pub fn gather_report_data(start_url: &str, host: &str, results: &[PageResult]) -> ReportData {
    let mut pages: Vec<PageResult> = results
        .iter()
        .cloned()
        .map(|mut page| {
            page.links.sort();
            page
        })
        .collect();
    pages.sort_by(|a, b| a.url.cmp(&b.url));

    let summary = CrawlSummary {
        total_pages: pages.len(),
        failed_pages: pages.iter().filter(|p| !p.is_ok()).count(),
        total_links: pages.iter().map(|p| p.links.len()).sum(),
    };

    ReportData {
        start_url: start_url.to_string(),
        host: host.to_string(),
        summary,
        pages,
    }
}

/// The page listing: a header per page, one line per link, then a separator.
pub fn page_link_lines(data: &ReportData) -> Vec<String> {
    let mut lines = Vec::new();
    for page in &data.pages {
        lines.push(format!("Page: {} No of Links: {}", page.url, page.links.len()));
        for link in &page.links {
            lines.push(format!("\tLink: {}", link));
        }
        lines.push("-----".to_string());
    }
    lines
}

/// Write the page listing to the log stream.
pub fn log_page_links(data: &ReportData) {
    for line in page_link_lines(data) {
        info!("{}", line);
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();
    for line in page_link_lines(data) {
        report.push_str(&line);
        report.push('\n');
    }
    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    // An unrestricted crawl has no host
    let host = (!data.host.is_empty()).then_some(data.host.as_str());

    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "sitewalk",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "crawl": {
                "start_url": data.start_url,
                "host": host
            },
            "summary": data.summary,
            "pages": data.pages
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
