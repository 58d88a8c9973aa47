//! The transfer worker: a single blocking thread that owns at most one
//! in-flight `Item` at a time and drives it through `download`.

mod download;
mod progress;

use std::path::Path;

use crate::channel::{InboundChannel, InboundEvent, OutboundEvent, OutboundSender};
use crate::error::ErrorCode;
use crate::registry::Item;

/// Downloads `item` into `tempfile_path`, renames it into place on success,
/// and sends the terminal `Done` event. Returns the event (if any) that
/// interrupted the transfer, so the caller can act on it immediately
/// instead of blocking on the queue for a second time.
fn download(
    item: Item,
    tempfile_path: &Path,
    inbound: &InboundChannel,
    outbound: &OutboundSender,
) -> Option<InboundEvent> {
    tracing::info!(item_id = item.item_id, url = %item.url, "starting download");

    let outcome = download::do_download(&item, tempfile_path, inbound, outbound);
    let mut error = outcome.error;

    if error == ErrorCode::Ok {
        if let Err(e) = std::fs::rename(tempfile_path, &item.destfile_path) {
            tracing::error!(
                from = %tempfile_path.display(),
                to = %item.destfile_path.display(),
                error = %e,
                "failed renaming temp file into place"
            );
            error = ErrorCode::PhysicalMediaIO;
            if let Err(e) = std::fs::remove_file(tempfile_path) {
                tracing::error!(path = %tempfile_path.display(), error = %e, "failed deleting temp file");
            }
        } else {
            tracing::info!(
                item_id = item.item_id,
                url = %item.url,
                dest = %item.destfile_path.display(),
                "download finished"
            );
        }
    }

    let _ = outbound.send(OutboundEvent::Done { item, error });

    outcome.carried_event
}

/// Runs the worker loop until a `Shutdown` event is received. Blocking:
/// intended to run on its own OS thread, started by
/// [`crate::lifecycle::start_worker`].
pub fn run(tempfile_path: &Path, inbound: &InboundChannel, outbound: &OutboundSender) {
    let mut pending_next: Option<InboundEvent> = None;

    loop {
        let event = match pending_next.take() {
            Some(ev) => ev,
            None => match inbound.recv(true) {
                Some(ev) => ev,
                None => {
                    tracing::info!("inbound channel closed, worker exiting");
                    return;
                }
            },
        };

        match event {
            InboundEvent::Shutdown => {
                tracing::info!("worker received shutdown");
                return;
            }
            InboundEvent::StartDownload { item } => {
                pending_next = download(item, tempfile_path, inbound, outbound);
            }
            InboundEvent::Cancel { item_id } => {
                tracing::debug!(item_id, "spurious cancel, nothing in flight");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{InboundChannel, OutboundChannel};
    use std::net::TcpListener;
    use std::path::PathBuf;
    use std::thread;

    fn spawn_loopback_server(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                use std::io::{Read, Write};
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.0 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.write_all(body);
            }
        });
        format!("http://{}/file.bin", addr)
    }

    #[test]
    fn run_processes_one_download_then_shuts_down() {
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");
        let destfile_path = tempdir.path().join("0000000001.dbusdl");

        let url = spawn_loopback_server(b"payload");
        let item = Item {
            item_id: 1,
            total_ticks: 20,
            url,
            destfile_path: destfile_path.clone(),
        };

        let inbound = InboundChannel::new();
        let outbound = OutboundChannel::new();
        let inbound_sender = inbound.sender();
        inbound_sender
            .send(InboundEvent::StartDownload { item })
            .unwrap();
        inbound_sender.send(InboundEvent::Shutdown).unwrap();

        run(&tempfile_path, &inbound, &outbound.sender());

        let mut saw_done = false;
        while let Some(ev) = outbound.recv(false) {
            if let OutboundEvent::Done { error, .. } = ev {
                assert_eq!(error, ErrorCode::Ok);
                saw_done = true;
            }
        }
        assert!(saw_done, "expected a Done event");
        assert!(destfile_path.exists());
    }

    #[test]
    fn cancel_with_nothing_in_flight_is_ignored() {
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");

        let inbound = InboundChannel::new();
        let outbound = OutboundChannel::new();
        let inbound_sender = inbound.sender();
        inbound_sender
            .send(InboundEvent::Cancel { item_id: 42 })
            .unwrap();
        inbound_sender.send(InboundEvent::Shutdown).unwrap();

        run(&tempfile_path, &inbound, &outbound.sender());

        assert!(outbound.recv(false).is_none());
    }
}
