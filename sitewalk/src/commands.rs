use crate::CLAP_STYLING;
use clap::{arg, command};

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitewalk")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitewalk")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress status lines, the spinner and crawl logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site breadth-first from a start URL and list the links found on \
                every page.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The URL to start crawling from"),
                )
                .arg(
                    arg!([TARGET])
                        .required(false)
                        .help("The URL to start crawling from (same as --url)"),
                )
                .group(
                    clap::ArgGroup::new("start")
                        .args(["url", "TARGET"])
                        .required(true),
                )
                .arg(
                    arg!(--"any-host")
                        .required(false)
                        .help("Follow links to every host instead of staying on the start URL's host")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-c --"concurrency" <NUM_FETCHES>)
                        .required(false)
                        .help("Maximum number of pages fetched at once")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("20"),
                )
                .arg(
                    arg!(-t --"timeout" <SECS>)
                        .required(false)
                        .help("Stop the whole crawl after this many seconds and report what was found")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: text to the log, json to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}
