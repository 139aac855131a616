use crate::extractor::LinkExtractor;
use crate::policy::accept_and_normalize;
use std::collections::HashSet;
use std::io;

/// One fetch target and the in-scope links found on it.
///
/// Bytes are pushed in as they arrive; every href the extractor completes is
/// scoped and normalized against this page's URL straight away, so the body
/// never has to be buffered. A page does no I/O of its own. Each distinct URL
/// gets a fresh page.
pub struct Page {
    url: String,
    host: String,
    links: HashSet<String>,
    extractor: LinkExtractor,
}

impl Page {
    pub fn new(url: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            host: host.into(),
            links: HashSet::new(),
            extractor: LinkExtractor::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn links(&self) -> &HashSet<String> {
        &self.links
    }

    /// Feed the next chunk of the response body.
    pub fn write_chunk(&mut self, chunk: &[u8]) {
        let hrefs = self.extractor.feed(chunk);
        self.add_links(hrefs);
    }

    /// Mark the end of the body, flushing anything the tokenizer still holds.
    pub fn finish(&mut self) {
        let hrefs = self.extractor.finish();
        self.add_links(hrefs);
    }

    /// Consume the page, returning its links sorted.
    pub fn into_links(self) -> Vec<String> {
        let mut links: Vec<String> = self.links.into_iter().collect();
        links.sort();
        links
    }

    fn add_links(&mut self, hrefs: Vec<String>) {
        for href in hrefs {
            if let Some(link) = accept_and_normalize(&href, &self.url, &self.host) {
                self.links.insert(link);
            }
        }
    }
}

impl io::Write for Page {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url)
            .field("host", &self.host)
            .field("links", &self.links)
            .finish()
    }
}
