//! CLI entry point for the downpour tool.

use clap::Parser;
use downpour::{Download, DownloaderBuilder, ProgressDisplay, Status};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

mod cli;

use cli::{parse_url_list, Args};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> downpour::Result<()> {
    let downloads = collect_downloads(&args).await?;
    if downloads.is_empty() {
        info!("No URL to download");
        return Ok(());
    }

    let mut builder = DownloaderBuilder::new()
        .concurrent_downloads(usize::from(args.threads))
        .retries(args.retries)
        .timeout_minutes(args.timeout)
        .detailed_progress(args.progress)
        .on_complete(|summary| {
            let path = summary.download().path.display();
            match summary.status() {
                Status::Success => info!("Saved {} ({} bytes)", path, summary.size()),
                Status::Skipped(reason) => info!("Skipped {}: {}", path, reason),
                Status::Cancelled => warn!("Cancelled {}", path),
                Status::Fail(msg) => warn!("Failed {}: {}", path, msg),
            }
        });
    if let Some(proxy) = args.proxy_url() {
        info!("Using proxy {}", proxy);
        builder = builder.proxy(proxy);
    }
    let downloader = Arc::new(builder.build()?);

    let rendering = match (downloader.progress(), downloader.speed()) {
        (Some(fractions), Some(speeds)) => {
            let display = ProgressDisplay::new(downloader.progress_interval()).with_clear(true);
            Some(tokio::spawn(display.run(fractions, speeds)))
        }
        _ => None,
    };

    let interrupt = downloader.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling downloads");
            interrupt.cancel();
        }
    });

    let result = downloader.download_all(&downloads).await;
    if let Some(rendering) = rendering {
        let _ = rendering.await;
    }
    result
}

async fn collect_downloads(args: &Args) -> downpour::Result<Vec<Download>> {
    let urls: Vec<String> = match (&args.url, &args.file) {
        (Some(url), _) => vec![url.to_string()],
        (None, Some(file)) => {
            let text = tokio::fs::read_to_string(file).await?;
            parse_url_list(&text).into_iter().map(String::from).collect()
        }
        (None, None) => Vec::new(),
    };

    urls.iter()
        .map(|url| Download::try_from(url.as_str()).map(|d| d.in_directory(&args.output)))
        .collect()
}
