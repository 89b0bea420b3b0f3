use clap::Parser;

/// Map the reachable surface of a website from a starting URL.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Starting URL, e.g. https://example.com/docs/
    pub url: String,

    /// Friendly name for the site, used in logs instead of the hostname
    #[arg(short, long)]
    pub name: Option<String>,

    /// Allow fetching anywhere on the host, not just under the start path
    #[arg(long)]
    pub no_path_lock: bool,

    /// Skip in-page fragment (#anchor) verification
    #[arg(long)]
    pub no_fragments: bool,

    /// File of cookie strings to send with every request, one per line
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<String>,

    /// Number of concurrent fetch workers
    #[arg(short, long, default_value_t = 4)]
    pub workers: usize,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Write the final frontier map as JSON to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Suppress the spinner and per-URL notifications
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
