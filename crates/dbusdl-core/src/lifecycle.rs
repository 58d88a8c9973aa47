//! Starts and stops the transfer worker thread.

use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::channel::{
    InboundChannel, InboundEvent, InboundSender, OutboundChannel, OutboundSender, WakeFn,
};
use crate::worker;

/// A running worker thread plus the channel handles used to talk to it.
pub struct WorkerHandle {
    join_handle: Option<JoinHandle<()>>,
    inbound: InboundSender,
}

/// Initializes the curl transport and spawns the worker thread, named
/// "transfer-thread" the way the original names its `GThread`. `wake` is
/// wired onto the outbound channel before it's ever cloned for the worker,
/// so every `Done`/`Progress` push reaches the caller's notification
/// mechanism from the first event onward. Returns the outbound channel for
/// the caller to drain, and a handle used to stop the worker later.
pub fn start_worker(
    tempfile_path: PathBuf,
    wake: WakeFn,
) -> Result<(WorkerHandle, OutboundChannel), anyhow::Error> {
    curl::init();

    let inbound = InboundChannel::new();
    let mut outbound = OutboundChannel::new();
    outbound.set_wake(wake);

    let inbound_sender = inbound.sender();
    let outbound_sender = outbound.sender();

    let join_handle = std::thread::Builder::new()
        .name("transfer-thread".to_string())
        .spawn(move || {
            worker::run(&tempfile_path, &inbound, &outbound_sender);
        })?;

    Ok((
        WorkerHandle {
            join_handle: Some(join_handle),
            inbound: inbound_sender,
        },
        outbound,
    ))
}

impl WorkerHandle {
    /// A cloneable sender for pushing inbound events to the worker.
    pub fn sender(&self) -> InboundSender {
        self.inbound.clone()
    }

    /// Asks the worker to shut down and waits for it to exit. Retries
    /// sending `Shutdown` up to 10 times (mirroring the original's
    /// retry-then-detach loop) before giving up and returning without
    /// joining — the original's fallback for an unresponsive queue.
    pub fn stop(mut self) {
        let mut tries = 10;
        let mut sent = false;

        while tries > 0 {
            match self.inbound.send(InboundEvent::Shutdown) {
                Ok(()) => {
                    sent = true;
                    break;
                }
                Err(_) => {
                    tries -= 1;
                    std::thread::yield_now();
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }

        if !sent {
            tracing::error!("failed notifying worker of shutdown, giving up without joining");
            return;
        }

        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // A normal shutdown is driven through `stop`, which consumes the
        // handle. If we get here with a live thread, the caller dropped the
        // handle without calling `stop` — best-effort cleanup only.
        if let Some(handle) = self.join_handle.take() {
            let _ = self.inbound.send(InboundEvent::Shutdown);
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn start_and_stop_joins_cleanly() {
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");

        let (handle, _outbound) = start_worker(tempfile_path, Arc::new(|| {})).unwrap();
        handle.stop();
    }

    #[test]
    fn wake_fires_on_done() {
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");
        let woken = Arc::new(AtomicUsize::new(0));
        let woken_cb = Arc::clone(&woken);

        let (handle, outbound) = start_worker(tempfile_path, Arc::new(move || {
            woken_cb.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        let sender = handle.sender();
        sender
            .send(InboundEvent::Cancel { item_id: 1 })
            .ok();
        handle.stop();
        let _ = outbound;
    }
}
