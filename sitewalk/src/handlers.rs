use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use sitewalk_core::crawl::{CrawlOptions, execute_crawl, scope_host};
use sitewalk_core::report::{
    ReportData, ReportFormat, gather_report_data, generate_json_report, generate_text_report,
    log_page_links, save_report,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Everything `crawl` needs, resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub start_url: String,
    pub host: String,
    pub concurrency: usize,
    pub timeout: Option<Duration>,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

/// Install the log subscriber. `RUST_LOG` wins; otherwise `info`, or only
/// warnings plus the page listing when `quiet`.
pub fn init_tracing(quiet: bool) {
    let default_directive = if quiet {
        "warn,sitewalk_core::report=info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Try to parse as-is
    if Url::parse(line).is_ok_and(|u| u.has_host()) {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

pub fn crawl_settings(sub_matches: &ArgMatches) -> Result<CrawlSettings> {
    let raw = sub_matches
        .get_one::<String>("url")
        .or_else(|| sub_matches.get_one::<String>("TARGET"))
        .ok_or_else(|| anyhow!("A start URL is required (--url or positional)"))?;

    let start_url =
        parse_url_line(raw).ok_or_else(|| anyhow!("Invalid start URL '{}'", raw))?;
    let parsed = Url::parse(&start_url).with_context(|| format!("Invalid start URL '{}'", raw))?;
    let host = scope_host(&parsed, sub_matches.get_flag("any-host")).map_err(|e| anyhow!(e))?;

    let format_name = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;

    Ok(CrawlSettings {
        start_url,
        host,
        concurrency: *sub_matches.get_one::<usize>("concurrency").unwrap_or(&20),
        timeout: sub_matches
            .get_one::<u64>("timeout")
            .map(|secs| Duration::from_secs(*secs)),
        format,
        output: sub_matches.get_one::<PathBuf>("output").cloned(),
    })
}

/// Deliver the report: to `output` when given, otherwise text goes to the
/// log stream and JSON to stdout.
pub fn write_report(data: &ReportData, format: ReportFormat, output: Option<&Path>) -> Result<()> {
    let content = match format {
        ReportFormat::Text => {
            if output.is_none() {
                log_page_links(data);
                return Ok(());
            }
            generate_text_report(data)
        }
        ReportFormat::Json => {
            generate_json_report(data).context("Failed to serialize JSON report")?
        }
    };

    match output {
        Some(path) => save_report(&content, path)
            .with_context(|| format!("Failed to save report to {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let settings = crawl_settings(sub_matches)?;

    // Fail before crawling if the report has nowhere to go
    if let Some(ref path) = settings.output {
        File::create(path)
            .with_context(|| format!("Cannot write report to {}", path.display()))?;
    }

    if !quiet {
        eprintln!("{} Crawling {}", "[+]".green().bold(), settings.start_url.bright_white());
        let host = if settings.host.is_empty() {
            "any".to_string()
        } else {
            settings.host.clone()
        };
        eprintln!("    Host: {}", host.cyan());
        eprintln!("    Concurrency: {}", settings.concurrency.to_string().cyan());
        if let Some(timeout) = settings.timeout {
            eprintln!("    Timeout: {}s", timeout.as_secs().to_string().cyan());
        }
        eprintln!();
    }

    let mut options = CrawlOptions::new(&settings.start_url, &settings.host);
    options.concurrency = settings.concurrency;
    options.timeout = settings.timeout;
    options.show_progress_bars = !quiet;

    let cancel = options.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding fetches");
            cancel.cancel();
        }
    });

    let progress_callback = Arc::new(move |msg: String| {
        if !quiet {
            eprintln!("{}", msg.yellow());
        }
    });

    let outcome = execute_crawl(options, Some(progress_callback)).await;
    interrupt.abort();
    let results = outcome.map_err(|e| anyhow!(e))?;

    let data = gather_report_data(&settings.start_url, &settings.host, &results);
    write_report(&data, settings.format, settings.output.as_deref())?;

    if !quiet {
        eprintln!(
            "\n{} Crawl complete: {} pages, {} links, {} failed",
            "[+]".green().bold(),
            data.summary.total_pages,
            data.summary.total_links,
            data.summary.failed_pages
        );
        if let Some(ref path) = settings.output {
            eprintln!("{} Report saved to {}", "[+]".green().bold(), path.display());
        }
    }

    Ok(())
}
