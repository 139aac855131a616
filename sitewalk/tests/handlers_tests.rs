use sitewalk::commands::command_argument_builder;
use sitewalk::handlers::*;
use sitewalk_core::report::{ReportFormat, gather_report_data};
use sitewalk_scanner::PageResult;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn crawl_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["sitewalk", "crawl"];
    argv.extend_from_slice(args);
    let matches = command_argument_builder()
        .try_get_matches_from(argv)
        .expect("arguments should parse");
    let (name, sub) = matches.subcommand().expect("subcommand");
    assert_eq!(name, "crawl");
    sub.clone()
}

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    let result = parse_url_line("example.com");
    assert_eq!(result, Some("http://example.com".to_string()));
}

#[test]
fn test_parse_url_line_host_and_port() {
    let result = parse_url_line("localhost:8080");
    assert_eq!(result, Some("http://localhost:8080".to_string()));
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
    assert_eq!(parse_url_line("   "), None);
}

#[test]
fn test_crawl_settings_defaults() {
    let settings = crawl_settings(&crawl_matches(&["-u", "https://www.google.com"])).unwrap();

    assert_eq!(settings.start_url, "https://www.google.com");
    assert_eq!(settings.host, "www.google.com");
    assert_eq!(settings.concurrency, 20);
    assert_eq!(settings.timeout, None);
    assert_eq!(settings.format, ReportFormat::Text);
    assert_eq!(settings.output, None);
}

#[test]
fn test_crawl_settings_positional_url() {
    let settings = crawl_settings(&crawl_matches(&["http://127.0.0.1:8080/start"])).unwrap();

    assert_eq!(settings.start_url, "http://127.0.0.1:8080/start");
    assert_eq!(settings.host, "127.0.0.1:8080");
}

#[test]
fn test_crawl_settings_all_options() {
    let settings = crawl_settings(&crawl_matches(&[
        "-u",
        "https://example.com/",
        "--any-host",
        "--concurrency",
        "4",
        "--timeout",
        "30",
        "-f",
        "json",
        "-o",
        "report.json",
    ]))
    .unwrap();

    assert_eq!(settings.host, "");
    assert_eq!(settings.concurrency, 4);
    assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    assert_eq!(settings.format, ReportFormat::Json);
    assert_eq!(settings.output, Some(PathBuf::from("report.json")));
}

#[test]
fn test_url_and_positional_conflict() {
    let result = command_argument_builder().try_get_matches_from([
        "sitewalk",
        "crawl",
        "-u",
        "https://a.example",
        "https://b.example",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_start_url_is_required() {
    let result = command_argument_builder().try_get_matches_from(["sitewalk", "crawl"]);
    assert!(result.is_err());
}

#[test]
fn test_unknown_format_is_rejected() {
    let result = command_argument_builder().try_get_matches_from([
        "sitewalk",
        "crawl",
        "https://example.com",
        "-f",
        "csv",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_quiet_is_global() {
    let matches = command_argument_builder()
        .try_get_matches_from(["sitewalk", "crawl", "https://example.com", "-q"])
        .unwrap();
    assert!(matches.get_flag("quiet"));
}

#[test]
fn test_write_text_report_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp_file = NamedTempFile::new()?;
    let data = gather_report_data(
        "https://example.com",
        "example.com",
        &[PageResult::new(
            "https://example.com".to_string(),
            vec!["https://example.com/about".to_string()],
        )],
    );

    write_report(&data, ReportFormat::Text, Some(temp_file.path()))?;

    let content = fs::read_to_string(temp_file.path())?;
    assert_eq!(
        content,
        "Page: https://example.com No of Links: 1\n\tLink: https://example.com/about\n-----\n"
    );

    Ok(())
}

#[test]
fn test_write_json_report_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp_file = NamedTempFile::new()?;
    let data = gather_report_data(
        "https://example.com",
        "example.com",
        &[PageResult::with_error(
            "https://example.com".to_string(),
            "Fetch cancelled".to_string(),
        )],
    );

    write_report(&data, ReportFormat::Json, Some(temp_file.path()))?;

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(temp_file.path())?)?;
    assert_eq!(parsed["report"]["summary"]["failed_pages"], 1);
    assert_eq!(parsed["report"]["pages"][0]["error"], "Fetch cancelled");

    Ok(())
}

#[test]
fn test_write_report_to_unwritable_path_fails() {
    let data = gather_report_data("https://example.com", "", &[]);
    let path = PathBuf::from("/nonexistent-dir/for/sure/report.txt");

    assert!(write_report(&data, ReportFormat::Text, Some(&path)).is_err());
}
