use std::path::PathBuf;

use clap::builder::RangedU64ValueParser;
use clap::{value_parser, ArgAction, Parser};
use regit_core::DEFAULT_OUTPUT_DIR;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Rebuild a git repository from a .git directory exposed over HTTP.",
    long_about = "Downloads HEAD, the ref it names and every object `git log` reports as \
                  unreadable until the history from HEAD can be walked locally.",
    after_help = "Examples:\n  regit -u http://example.com\n  regit --url http://example.com:8080\n  regit -u http://example.com/.git/ -o site-repo --jobs 4\n"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct RegitCli {
    #[arg(
        short,
        long,
        value_name = "URL",
        help = "Remote URL of the site or of its exposed .git directory"
    )]
    pub url: String,
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        value_parser = value_parser!(PathBuf),
        help = "Directory to (re)create for the rebuilt repository"
    )]
    pub output: PathBuf,
    #[arg(
        long,
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        help = "Stop after N fetch rounds even if objects are still missing"
    )]
    pub max_iterations: Option<usize>,
    #[arg(
        long,
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        help = "Download up to N missing objects at once (default 1)"
    )]
    pub jobs: Option<usize>,
    #[arg(
        long,
        value_name = "SECS",
        value_parser = value_parser!(u64).range(1..),
        help = "Per-request HTTP timeout in seconds (default 30)"
    )]
    pub timeout: Option<u64>,
    #[arg(
        short,
        long,
        help = "Suppress progress logs and human output (errors still print to stderr)"
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    pub trace: bool,
    #[arg(long, help = "Emit {status,code,message,details} JSON on stdout")]
    pub json: bool,
    #[arg(long, help = "Disable colored human output")]
    pub no_color: bool,
}
