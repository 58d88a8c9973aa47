mod bus;
mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use dbusdl_core::{config, lifecycle, logging, Registry};
use tokio::sync::Notify;

use crate::cli::Cli;

fn main() -> Result<()> {
    let args = Cli::parse_args();

    if args.fg {
        logging::init_logging_stderr();
    } else if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!(error = %e, "falling back to stderr logging");
    }

    if !args.fg {
        daemonize::Daemonize::new()
            .working_directory(".")
            .start()
            .context("failed to daemonize")?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed building tokio runtime")?;

    runtime.block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let download_dir = config::DownloadDirConfig::resolve(args.tmpdir)?;
    let registry = Registry::init(download_dir.path.clone(), true);
    let tempfile_path = registry.tempfile_path().to_path_buf();

    let notify = Arc::new(Notify::new());
    let wake_notify = Arc::clone(&notify);
    let (worker_handle, outbound) = lifecycle::start_worker(
        tempfile_path,
        Arc::new(move || wake_notify.notify_one()),
    )
    .context("failed starting transfer worker")?;

    let file_transfer = bus::FileTransfer::new(registry, worker_handle.sender());

    let connection = zbus::connection::Builder::session()
        .context("connecting to session bus")?
        .name(bus::WELL_KNOWN_NAME)
        .context("requesting well-known name")?
        .serve_at(bus::OBJECT_PATH, file_transfer)
        .context("exporting FileTransfer interface")?
        .build()
        .await
        .context("building bus connection")?;

    tracing::info!(name = bus::WELL_KNOWN_NAME, "D-Bus name acquired");

    let drain_task = tokio::spawn(bus::run_outbound_drain_loop(
        connection.clone(),
        outbound,
        notify,
    ));

    wait_for_shutdown_signal().await;
    tracing::info!("shutting down");

    drain_task.abort();
    worker_handle.stop();

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed installing SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed installing SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
