mod arguments;
mod report;

use anyhow::{bail, Context, Result};
use arguments::Args;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitewalker_core::{ControllerConfig, CrawlEvent};
use sitewalker_engine::{run_crawl, SessionOptions};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);
    if let Err(e) = run(args).await {
        eprintln!("{} {e:#}", "✗".red().bold());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let start = Url::parse(&args.url).context("invalid start URL")?;
    if start.scheme() != "http" && start.scheme() != "https" {
        bail!("only http and https URLs can be crawled");
    }
    let host = start
        .host_str()
        .context("start URL has no host")?
        .to_string();

    let cookies = match &args.cookies {
        Some(path) => load_cookies(path)?,
        None => Vec::new(),
    };

    let mut config = ControllerConfig::new(&host)
        .with_path(start.path())
        .with_lock_to_path(!args.no_path_lock)
        .with_check_fragments(!args.no_fragments)
        .with_cookies(cookies);
    if let Some(port) = start.port() {
        config = config.with_port(port);
    }
    if let Some(name) = &args.name {
        config = config.with_site_name(name);
    }

    let spinner = if args.quiet {
        None
    } else {
        Some(make_spinner(args.name.as_deref().unwrap_or(&host)))
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let options = SessionOptions {
        workers: args.workers,
        timeout_secs: args.timeout,
    };
    let crawl = tokio::spawn(run_crawl(start, config, options, tx));

    while let Some(event) = rx.recv().await {
        if let Some(spinner) = &spinner
            && let Some(line) = report::notification_line(&event)
        {
            spinner.println(line);
        }
        if matches!(event, CrawlEvent::Complete { .. }) {
            break;
        }
    }

    let frontier = crawl.await.context("crawl task failed")??;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
        println!("{} Crawl complete", "✓".green().bold());
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&frontier)?;
        fs::write(path, json).with_context(|| format!("writing {path}"))?;
        if !args.quiet {
            println!("{} Frontier map written to {path}", "✓".green().bold());
        }
    }
    if !args.quiet {
        print!("{}", report::render(&frontier)?);
    }
    Ok(())
}

fn make_spinner(site: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Crawling {site}"));
    spinner
}

/// Reads cookie strings from a file, one per line. Blank lines and lines
/// starting with `#` are skipped; `~` in the path is expanded.
fn load_cookies(path: &str) -> Result<Vec<String>> {
    let expanded = shellexpand::tilde(path);
    let contents = fs::read_to_string(Path::new(expanded.as_ref()))
        .with_context(|| format!("reading cookie file {path}"))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
