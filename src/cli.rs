//! CLI argument definitions using clap derive macros.

use clap::{ArgGroup, Parser};
use reqwest::Url;
use std::path::PathBuf;

/// Local Tor SOCKS endpoint used by `--tor`.
pub const TOR_PROXY: &str = "socks5://127.0.0.1:9050";

/// Download files concurrently over HTTP(S), resuming partial downloads.
#[derive(Parser, Debug)]
#[command(name = "downpour")]
#[command(author, version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "file"])))]
pub struct Args {
    /// URL to download
    #[arg(short, long)]
    pub url: Option<Url>,

    /// File with one URL per line
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Directory to store the downloads in
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Route traffic through a local Tor SOCKS proxy (127.0.0.1:9050)
    #[arg(long, conflicts_with = "proxy")]
    pub tor: bool,

    /// Route traffic through a proxy (http, https or socks5)
    #[arg(long)]
    pub proxy: Option<Url>,

    /// Maximum concurrent downloads
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: u16,

    /// Retries per file
    #[arg(short, long, default_value_t = 0)]
    pub retries: u32,

    /// Overall timeout, in minutes
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Render a progress bar
    #[arg(short, long)]
    pub progress: bool,
}

impl Args {
    /// The proxy requests go through, if any.
    pub fn proxy_url(&self) -> Option<Url> {
        if self.tor {
            return Url::parse(TOR_PROXY).ok();
        }
        self.proxy.clone()
    }
}

/// Extracts URLs from a list, one per line, ignoring blank lines.
pub fn parse_url_list(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
