// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Flags only; export and git push are independent switches

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "yuque-exporter")]
#[command(about = "Export a Yuque repository to local markdown and push it with git", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Export the repository from Yuque
    #[arg(long)]
    pub yuque: bool,

    /// Commit the export directory and push it to the remote
    #[arg(long)]
    pub git_push: bool,

    /// Repository slug to export
    #[arg(long, default_value = "wiki")]
    pub repo: String,

    /// Parent directory for exports; each repository lands in <output-dir>/<repo>
    #[arg(long, default_value = "repo")]
    pub output_dir: PathBuf,

    /// Git remote to push to
    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// API base URL
    #[arg(long, default_value = crate::api::DEFAULT_API_BASE)]
    pub api_base: String,

    /// Yuque namespace (login); requires --token
    #[arg(long)]
    pub namespace: Option<String>,

    /// Yuque access token; requires --namespace
    #[arg(long)]
    pub token: Option<String>,

    /// Credential file (namespace|token)
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Disable throttling (not recommended)
    #[arg(long)]
    pub no_throttle: bool,

    /// Throttle range in ms (min:max)
    #[arg(long, value_parser = parse_throttle_range)]
    pub throttle_ms: Option<(u64, u64)>,

    /// Retries for failed idempotent requests
    #[arg(long, default_value_t = 2)]
    pub retries: u32,
}

fn parse_throttle_range(s: &str) -> Result<(u64, u64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Expected format: min:max".into());
    }

    let min = parts[0].parse().map_err(|_| "Invalid min value")?;
    let max = parts[1].parse().map_err(|_| "Invalid max value")?;

    if min > max {
        return Err("min must be <= max".into());
    }

    Ok((min, max))
}
