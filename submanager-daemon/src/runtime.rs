use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use submanager_core::{Accounts, StaticConfig};

use crate::cycle::{run_manage_once, RunOptions};
use crate::error::{io_err, DaemonError};

/// Repeat-loop settings.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub repeat_interval: Duration,
    /// Stop after this many cycles; `None` runs until interrupted.
    pub repeat_max_n: Option<u64>,
    /// Options for the first cycle. Later cycles never force a resync.
    pub run: RunOptions,
}

impl LoopOptions {
    /// Interval from `repeat_interval_s`; the first cycle resyncs everything.
    pub fn from_config(config: &StaticConfig) -> Self {
        let repeat_interval = Duration::try_from_secs_f64(config.repeat_interval_s)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(60));
        Self {
            repeat_interval,
            repeat_max_n: None,
            run: RunOptions {
                resync_all: true,
                ..RunOptions::default()
            },
        }
    }
}

/// Start the repeat loop and block the current thread until it exits.
pub fn start_blocking(
    config: StaticConfig,
    accounts: Accounts,
    dynamic_path: &Path,
    options: LoopOptions,
) -> Result<u64, DaemonError> {
    init_tracing(false);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(
        Arc::new(config),
        accounts,
        dynamic_path.to_path_buf(),
        options,
    ))
}

/// Run manage cycles every `repeat_interval` until the cycle limit, ctrl-c,
/// or a fatal error. Returns the number of completed cycles.
pub async fn run(
    config: Arc<StaticConfig>,
    accounts: Accounts,
    dynamic_path: PathBuf,
    options: LoopOptions,
) -> Result<u64, DaemonError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let cycle_handle = {
        let shutdown = shutdown_tx.clone();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = cycle_task(config, accounts, dynamic_path, options, rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, stopping after the current cycle");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(io_err("ctrl-c handler", err)),
                    }
                }
            }
        })
    };

    let (cycle_result, signal_result) = tokio::join!(cycle_handle, signal_handle);
    let completed = handle_join("cycle", cycle_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(completed)
}

async fn cycle_task(
    config: Arc<StaticConfig>,
    accounts: Accounts,
    dynamic_path: PathBuf,
    options: LoopOptions,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<u64, DaemonError> {
    let mut interval = tokio::time::interval(options.repeat_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut run_options = options.run.clone();
    let mut completed = 0u64;
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let config = Arc::clone(&config);
                let accounts = accounts.clone();
                let path = dynamic_path.clone();
                let cycle_options = run_options.clone();
                let result = tokio::task::spawn_blocking(move || {
                    run_manage_once(&config, &accounts, &path, &cycle_options)
                })
                .await
                .map_err(|err| DaemonError::Join {
                    task: "manage cycle",
                    message: err.to_string(),
                })?;

                match result {
                    Ok(summary) => {
                        for item in summary.failures() {
                            tracing::warn!(uid = %item.uid, error = %item.detail, "item failed");
                        }
                    }
                    // Another process holds the state; try again next tick.
                    Err(DaemonError::Lock(err)) => {
                        tracing::warn!(error = %err, "skipping cycle");
                    }
                    Err(err) => return Err(err),
                }

                run_options.resync_all = false;
                run_options.force_threads.clear();
                completed += 1;
                if options.repeat_max_n.is_some_and(|max| completed >= max) {
                    break;
                }
            }
        }
    }
    Ok(completed)
}

fn handle_join<T>(
    task: &'static str,
    result: Result<Result<T, DaemonError>, tokio::task::JoinError>,
) -> Result<T, DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            message: err.to_string(),
        }),
    }
}

/// Install the global subscriber. Honours `RUST_LOG`, defaulting to `info`.
///
/// Also bridges `log` records from the sync and thread crates.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
