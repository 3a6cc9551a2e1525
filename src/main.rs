use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dashsync_sdk::{keys, Dashboard, PollMode, Snapshot, SyncConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dashsync-watch")]
#[command(about = "Watch the dashboard statistics endpoint through the sync engine")]
struct Args {
    /// Path to a TOML config file (DASHSYNC_* environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Statistics API root, overriding the config
    #[arg(long)]
    base_url: Option<String>,

    /// Polling mode: high, normal or low
    #[arg(short, long)]
    mode: Option<PollMode>,

    /// Fetch once, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match args.base_url.as_deref() {
        Some(url) => SyncConfig::load_with_base_url(args.config.as_deref(), url),
        None => SyncConfig::load(args.config.as_deref()),
    }
    .context("Failed to load configuration")?;
    if let Some(mode) = args.mode {
        config.mode = mode;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args.once))
}

async fn run(config: SyncConfig, once: bool) -> Result<()> {
    let source = config
        .http_source()
        .context("Failed to build statistics fetcher")?;

    let dashboard = Dashboard::builder(source)
        .frequencies(config.frequency_table())
        .freshness_window(config.freshness_window())
        .mode(config.mode)
        .on_unauthorized(|failure| {
            eprintln!("Not authorized ({}); set DASHSYNC_BEARER_TOKEN", failure.message);
        })
        .build();

    if once {
        let snapshot = dashboard.refresh_now().await;
        println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
        return Ok(());
    }

    let subscription = dashboard.subscribe(|snapshot| println!("{}", summary_line(&snapshot)));

    info!(url = %config.base_url, mode = %config.mode, "Watching dashboard statistics (Ctrl-C to stop)");
    dashboard.start(dashboard.interval());

    tokio::signal::ctrl_c().await?;

    subscription.unsubscribe();
    dashboard.shutdown().await;
    Ok(())
}

/// One line per delivered snapshot.
fn summary_line(snapshot: &Arc<Snapshot>) -> String {
    let mut line = format!(
        "[{:<8}] fetched_at={} beneficiaries={} attendance={:.1}% centers={} events={} ({}ms)",
        snapshot.freshness.as_str(),
        snapshot.fetched_at_ms,
        snapshot.stat(keys::TOTAL_BENEFICIARIES),
        snapshot.stat(keys::ATTENDANCE_RATE),
        snapshot.group_stats.len(),
        snapshot.recent_events.len(),
        snapshot.fetch_duration.as_millis(),
    );
    if let Some(error) = &snapshot.error {
        line.push_str(&format!(" error={}", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashsync_sdk::{FailureKind, FetchFailure, Milliseconds};

    #[test]
    fn summary_line_for_live_snapshot() {
        let snapshot = Snapshot::builder()
            .timestamp_ms(1_000)
            .stat(keys::TOTAL_BENEFICIARIES, 160.0)
            .stat(keys::ATTENDANCE_RATE, 75.0)
            .fetch_duration(Milliseconds::from_millis(42))
            .build();

        let line = summary_line(&Arc::new(snapshot));

        assert!(line.starts_with("[live    ]"));
        assert!(line.contains("beneficiaries=160"));
        assert!(line.contains("attendance=75.0%"));
        assert!(line.ends_with("(42ms)"));
    }

    #[test]
    fn summary_line_includes_error() {
        let failure = FetchFailure::new(FailureKind::Timeout, "deadline elapsed");
        let snapshot = Snapshot::fallback(failure, 1_000, Milliseconds::from_millis(10_000));

        let line = summary_line(&Arc::new(snapshot));

        assert!(line.starts_with("[fallback]"));
        assert!(line.ends_with("error=timeout: deadline elapsed"));
    }
}
