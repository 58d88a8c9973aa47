//! Performs one GET into a temp file, reporting progress and watching for
//! cancellation as it goes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::channel::{InboundChannel, InboundEvent, OutboundEvent, OutboundSender};
use crate::error::{classify_curl_error, ErrorCode};
use crate::fetcher;
use crate::registry::Item;

use super::progress::ProgressTracker;

/// What came out of one transfer attempt: the error classification, and —
/// if an inbound event aborted the transfer — that event, carried forward
/// so the worker loop can act on it without waiting on the queue again.
pub struct DownloadOutcome {
    pub error: ErrorCode,
    pub carried_event: Option<InboundEvent>,
}

/// An event always interrupts the current transfer unless it's a cancel
/// for a different item, in which case it's spurious and dropped.
fn must_cancel(event: &InboundEvent, current_item_id: u32) -> bool {
    match event {
        InboundEvent::StartDownload { .. } | InboundEvent::Shutdown => true,
        InboundEvent::Cancel { item_id } => *item_id == current_item_id,
    }
}

/// Downloads `item.url` into `tempfile_path`, polling `inbound` for
/// cancellation/shutdown/superseding-start on every progress tick and
/// reporting ticks on `outbound` as they cross the threshold.
///
/// On any non-`Ok` outcome the temp file is removed; on `Ok` it is left in
/// place for the caller to rename into its final destination.
pub fn do_download(
    item: &Item,
    tempfile_path: &Path,
    inbound: &InboundChannel,
    outbound: &OutboundSender,
) -> DownloadOutcome {
    let mut file = match File::create(tempfile_path) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(
                path = %tempfile_path.display(),
                error = %e,
                "failed creating temporary file"
            );
            return DownloadOutcome {
                error: ErrorCode::PhysicalMediaIO,
                carried_event: None,
            };
        }
    };

    let mut easy = match fetcher::configure(&item.url) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "failed configuring transfer");
            remove_tempfile(tempfile_path);
            return DownloadOutcome {
                error: ErrorCode::Internal,
                carried_event: None,
            };
        }
    };

    let mut tracker = ProgressTracker::new();
    let mut carried_event: Option<InboundEvent> = None;

    let perform_result = wire_and_perform(
        &mut easy,
        &mut file,
        item,
        inbound,
        outbound,
        &mut tracker,
        &mut carried_event,
    );

    let mut error = match &perform_result {
        Ok(()) => ErrorCode::Ok,
        Err(e) => classify_curl_error(e),
    };

    drop(file);

    if error == ErrorCode::Ok {
        if tracker.last_sent_tick() != item.total_ticks {
            let _ = outbound.send(OutboundEvent::Progress {
                item_id: item.item_id,
                tick: item.total_ticks,
                total_ticks: item.total_ticks,
            });
        }
    } else {
        if let Err(e) = &perform_result {
            if !e.is_aborted_by_callback() {
                tracing::error!(item_id = item.item_id, error = %e, "download failed");
            } else {
                tracing::info!(item_id = item.item_id, "download canceled as requested");
                error = ErrorCode::Interrupted;
            }
        }
        remove_tempfile(tempfile_path);
    }

    DownloadOutcome {
        error,
        carried_event,
    }
}

/// Wires the write and progress callbacks onto a scoped `Transfer` and runs
/// it to completion. Lives in its own function so the borrows of `tracker`
/// and `carried_event` end when it returns, before `do_download` needs them
/// again.
fn wire_and_perform(
    easy: &mut curl::easy::Easy,
    file: &mut File,
    item: &Item,
    inbound: &InboundChannel,
    outbound: &OutboundSender,
    tracker: &mut ProgressTracker,
    carried_event: &mut Option<InboundEvent>,
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();

    transfer.write_function(|data| match file.write_all(data) {
        Ok(()) => Ok(data.len()),
        Err(e) => {
            tracing::warn!(error = %e, "temp file write failed, aborting transfer");
            Ok(0)
        }
    })?;

    transfer.progress_function(|dltotal, dlnow, _ultotal, _ulnow| {
        if let Some(ev) = inbound.recv(false) {
            if must_cancel(&ev, item.item_id) {
                *carried_event = Some(ev);
                return false;
            }
            // Cancel for a different id: spurious at this point, drop it.
        }

        let tick = ProgressTracker::tick_for(item.total_ticks, dlnow as u64, dltotal as u64);
        if tracker.should_send(tick, item.total_ticks) {
            tracing::info!(
                item_id = item.item_id,
                tick,
                total_ticks = item.total_ticks,
                "download progress"
            );
            let _ = outbound.send(OutboundEvent::Progress {
                item_id: item.item_id,
                tick,
                total_ticks: item.total_ticks,
            });
            tracker.mark_sent(tick);
        }

        true
    })?;

    transfer.perform()
}

fn remove_tempfile(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::error!(path = %path.display(), error = %e, "failed deleting temp file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::InboundChannel;
    use crate::channel::OutboundChannel;
    use crate::registry::Item;
    use std::io::Read;
    use std::net::TcpListener;
    use std::path::PathBuf;
    use std::thread;

    fn sample_item(url: String) -> Item {
        Item {
            item_id: 1,
            total_ticks: 100,
            url,
            destfile_path: PathBuf::from("/tmp/unused.dbusdl"),
        }
    }

    /// A loopback HTTP/1.0 server that serves a fixed body once, then exits.
    fn spawn_loopback_server(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.0 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                use std::io::Write as _;
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.write_all(body);
            }
        });
        format!("http://{}/file.bin", addr)
    }

    #[test]
    fn successful_download_writes_body_and_reports_ok() {
        let url = spawn_loopback_server(b"hello world");
        let item = sample_item(url);
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");

        let inbound = InboundChannel::new();
        let outbound = OutboundChannel::new();
        let outcome = do_download(&item, &tempfile_path, &inbound, &outbound.sender());

        assert_eq!(outcome.error, ErrorCode::Ok);
        assert!(outcome.carried_event.is_none());
        let contents = std::fs::read(&tempfile_path).unwrap();
        assert_eq!(contents, b"hello world");
    }

    #[test]
    fn missing_host_is_classified_as_net_io() {
        let item = sample_item("http://127.0.0.1:1".to_string());
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");

        let inbound = InboundChannel::new();
        let outbound = OutboundChannel::new();
        let outcome = do_download(&item, &tempfile_path, &inbound, &outbound.sender());

        assert_eq!(outcome.error, ErrorCode::NetIO);
        assert!(!tempfile_path.exists());
    }

    #[test]
    fn shutdown_during_transfer_is_carried_forward() {
        let url = spawn_loopback_server(&[0u8; 1]);
        let item = sample_item(url);
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");

        let inbound = InboundChannel::new();
        inbound.sender().send(InboundEvent::Shutdown).unwrap();
        let outbound = OutboundChannel::new();
        let outcome = do_download(&item, &tempfile_path, &inbound, &outbound.sender());

        assert_eq!(outcome.error, ErrorCode::Interrupted);
        match outcome.carried_event {
            Some(InboundEvent::Shutdown) => {}
            _ => panic!("expected the shutdown event to be carried forward"),
        }
    }

    #[test]
    fn cancel_for_a_different_item_is_spurious() {
        let url = spawn_loopback_server(b"hello world");
        let item = sample_item(url);
        let tempdir = tempfile::tempdir().unwrap();
        let tempfile_path = tempdir.path().join("0000000000.dbusdl");

        let inbound = InboundChannel::new();
        inbound
            .sender()
            .send(InboundEvent::Cancel { item_id: 999 })
            .unwrap();
        let outbound = OutboundChannel::new();
        let outcome = do_download(&item, &tempfile_path, &inbound, &outbound.sender());

        assert_eq!(outcome.error, ErrorCode::Ok);
        assert!(outcome.carried_event.is_none());
    }
}
