use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Page URL to the links found on it, the output of a crawl.
pub type PageLinks = HashMap<String, Vec<String>>;

/// One visited page as folded into the crawl result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub links: Vec<String>,
    pub error: Option<String>,
}

impl PageResult {
    pub fn new(url: String, links: Vec<String>) -> Self {
        Self {
            url,
            links,
            error: None,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            url,
            links: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Collapse crawl results into the page to links map.
pub fn into_page_links(results: Vec<PageResult>) -> PageLinks {
    results.into_iter().map(|r| (r.url, r.links)).collect()
}
