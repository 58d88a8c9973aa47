//! Translates bus method invocations into inbound events and drains the
//! outbound queue back out as `Progress`/`Done` signals.

use std::sync::{Arc, Mutex};

use dbusdl_core::channel::{InboundEvent, InboundSender, OutboundChannel, OutboundEvent};
use dbusdl_core::{ErrorCode, Registry};
use tokio::sync::Notify;
use zbus::object_server::SignalEmitter;

pub const OBJECT_PATH: &str = "/de/tahifi/DBusDL";
pub const WELL_KNOWN_NAME: &str = "de.tahifi.DBusDL";

/// The exported `de.tahifi.FileTransfer` object. Holds the registry (so
/// `Download` can allocate ids) and the sender half of the inbound channel.
pub struct FileTransfer {
    registry: Mutex<Registry>,
    inbound: InboundSender,
}

impl FileTransfer {
    pub fn new(registry: Registry, inbound: InboundSender) -> Self {
        FileTransfer {
            registry: Mutex::new(registry),
            inbound,
        }
    }
}

#[zbus::interface(name = "de.tahifi.FileTransfer")]
impl FileTransfer {
    /// Queues a download and returns its freshly allocated item id.
    async fn download(&self, url: String, ticks: u32) -> zbus::fdo::Result<u32> {
        let item = {
            let mut registry = self
                .registry
                .lock()
                .map_err(|_| zbus::fdo::Error::Failed("registry lock poisoned".into()))?;
            registry.allocate(url, ticks)
        };
        let item_id = item.item_id;

        self.inbound
            .send(InboundEvent::StartDownload { item })
            .map_err(|_| zbus::fdo::Error::Failed("transfer worker is gone".into()))?;

        tracing::info!(item_id, ticks, "queued download");
        Ok(item_id)
    }

    /// Queues a cancel for `item_id`. `item_id == 0` is always invalid.
    async fn cancel(&self, item_id: u32) -> zbus::fdo::Result<()> {
        if item_id == 0 {
            return Err(zbus::fdo::Error::InvalidArgs(
                "item id 0 is invalid".to_string(),
            ));
        }

        self.inbound
            .send(InboundEvent::Cancel { item_id })
            .map_err(|_| zbus::fdo::Error::Failed("transfer worker is gone".into()))?;

        tracing::info!(item_id, "queued cancel");
        Ok(())
    }

    #[zbus(signal)]
    async fn progress(
        signal_emitter: &SignalEmitter<'_>,
        item_id: u32,
        tick: u32,
        total_ticks: u32,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn done(
        signal_emitter: &SignalEmitter<'_>,
        item_id: u32,
        error_code: u32,
        path: String,
    ) -> zbus::Result<()>;
}

/// Drains the outbound queue every time `notify` fires, re-emitting each
/// event as a `Progress` or `Done` signal. Runs until the connection or
/// outbound channel goes away; intended to be spawned as its own task.
pub async fn run_outbound_drain_loop(
    connection: zbus::Connection,
    outbound: OutboundChannel,
    notify: Arc<Notify>,
) {
    loop {
        notify.notified().await;

        while let Some(event) = outbound.recv(false) {
            let iface_ref = match connection
                .object_server()
                .interface::<_, FileTransfer>(OBJECT_PATH)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(error = %e, "failed looking up exported interface");
                    continue;
                }
            };
            let emitter = iface_ref.signal_emitter();

            let result = match event {
                OutboundEvent::Progress {
                    item_id,
                    tick,
                    total_ticks,
                } => FileTransfer::progress(emitter, item_id, tick, total_ticks).await,
                OutboundEvent::Done { item, error } => {
                    let path = if error == ErrorCode::Ok {
                        item.destfile_path.display().to_string()
                    } else {
                        String::new()
                    };
                    FileTransfer::done(emitter, item.item_id, error.code(), path).await
                }
            };

            if let Err(e) = result {
                tracing::error!(error = %e, "failed emitting bus signal");
            }
        }
    }
}
