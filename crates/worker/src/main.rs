use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use macro_pulse_core::refresh::Refresher;

#[derive(Debug, Parser)]
#[command(name = "macro_pulse_worker")]
struct Args {
    /// Refresh every N seconds until interrupted. Runs once when omitted.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Fetch and merge, but do not write the data file.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = macro_pulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let refresher = Refresher::from_settings(&settings)?;

    let Some(secs) = args.interval_secs else {
        run_once(&refresher, args.dry_run).await?;
        return Ok(());
    };
    anyhow::ensure!(secs > 0, "--interval-secs must be >= 1");

    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = run_once(&refresher, args.dry_run).await {
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(error = %err, "refresh cycle failed; will retry next tick");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; stopping refresh loop");
                return Ok(());
            }
        }
    }
}

async fn run_once(refresher: &Refresher, dry_run: bool) -> anyhow::Result<()> {
    let report = if dry_run {
        refresher.dry_run().await
    } else {
        refresher.refresh().await
    }
    .with_context(|| {
        format!(
            "refresh failed for {}",
            refresher.store().path().display()
        )
    })?;

    tracing::info!(
        updated = ?report.updated,
        persisted = report.persisted,
        "worker refresh finished"
    );
    Ok(())
}

fn init_sentry(settings: &macro_pulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_single_persisted_run() {
        let args = Args::try_parse_from(["macro_pulse_worker"]).unwrap();
        assert!(args.interval_secs.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn parses_interval_and_dry_run() {
        let args =
            Args::try_parse_from(["macro_pulse_worker", "--interval-secs", "900", "--dry-run"])
                .unwrap();
        assert_eq!(args.interval_secs, Some(900));
        assert!(args.dry_run);
    }
}
