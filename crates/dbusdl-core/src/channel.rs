//! The bidirectional event plane between the bus thread and the worker.
//!
//! Two unbounded FIFO queues: inbound (user → worker) and outbound (worker →
//! user). Ownership of an `Item` transfers with the event that carries it;
//! Rust's move semantics enforce the "exactly one owner" rule the original
//! design relied on manual free-function discipline for.

use std::sync::mpsc;
use std::sync::Arc;

use crate::error::ErrorCode;
use crate::registry::Item;

/// Commands sent from the bus thread to the worker.
pub enum InboundEvent {
    /// Ask the worker to finish what it's doing and exit.
    Shutdown,
    /// Start downloading `item`. Owns the item until it's either carried
    /// into an outbound `Done` or a new `StartDownload`.
    StartDownload { item: Item },
    /// Cancel the transfer with this id, if it is the one currently running.
    Cancel { item_id: u32 },
}

/// Notifications sent from the worker to the bus thread.
pub enum OutboundEvent {
    /// A progress tick for an in-flight item. Carries the scalar fields a
    /// `Progress` signal needs rather than a reference to the `Item` itself
    /// — the item is still owned elsewhere (the worker's in-flight slot);
    /// this event never frees it.
    Progress {
        item_id: u32,
        tick: u32,
        total_ticks: u32,
    },
    /// Terminal outcome for `item`. Owns the item; freeing this event frees
    /// the item (dropping it, in Rust terms).
    Done { item: Item, error: ErrorCode },
}

/// Callback invoked (at most once per `send_outbound`) to wake a drain on
/// the bus event loop. No callback means no wake fires.
pub type WakeFn = Arc<dyn Fn() + Send + Sync>;

/// The inbound half: bus thread sends, worker receives.
pub struct InboundChannel {
    tx: mpsc::Sender<InboundEvent>,
    rx: mpsc::Receiver<InboundEvent>,
}

impl InboundChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        InboundChannel { tx, rx }
    }

    /// A cloneable handle for sending inbound events; safe to share across
    /// the bus adapter's method-call tasks.
    pub fn sender(&self) -> InboundSender {
        InboundSender {
            tx: self.tx.clone(),
        }
    }

    /// Receives the next event. Blocks when `blocking` is true and the
    /// queue is empty; otherwise returns `None` immediately on an empty
    /// queue.
    pub fn recv(&self, blocking: bool) -> Option<InboundEvent> {
        if blocking {
            self.rx.recv().ok()
        } else {
            self.rx.try_recv().ok()
        }
    }
}

impl Default for InboundChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable sender for inbound events (the bus side of the channel).
#[derive(Clone)]
pub struct InboundSender {
    tx: mpsc::Sender<InboundEvent>,
}

impl InboundSender {
    /// Pushes `ev` onto the inbound queue. Fails only if the worker thread
    /// has already exited and dropped its receiver.
    pub fn send(&self, ev: InboundEvent) -> Result<(), InboundEvent> {
        self.tx.send(ev).map_err(|e| e.0)
    }
}

/// The outbound half: worker sends, bus thread receives.
pub struct OutboundChannel {
    tx: mpsc::Sender<OutboundEvent>,
    rx: mpsc::Receiver<OutboundEvent>,
    wake: Option<WakeFn>,
}

impl OutboundChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        OutboundChannel {
            tx,
            rx,
            wake: None,
        }
    }

    /// Registers the wake callback fired after every successful send.
    pub fn set_wake(&mut self, wake: WakeFn) {
        self.wake = Some(wake);
    }

    /// A cloneable handle for sending outbound events from the worker
    /// thread; fires the registered wake callback after each send.
    pub fn sender(&self) -> OutboundSender {
        OutboundSender {
            tx: self.tx.clone(),
            wake: self.wake.clone(),
        }
    }

    /// Receives the next event. Blocks when `blocking` is true and the
    /// queue is empty; otherwise returns `None` immediately on an empty
    /// queue. The bus adapter only ever uses `blocking = false`, draining
    /// in response to the wake notification.
    pub fn recv(&self, blocking: bool) -> Option<OutboundEvent> {
        if blocking {
            self.rx.recv().ok()
        } else {
            self.rx.try_recv().ok()
        }
    }
}

impl Default for OutboundChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable sender for outbound events (the worker side of the channel).
#[derive(Clone)]
pub struct OutboundSender {
    tx: mpsc::Sender<OutboundEvent>,
    wake: Option<WakeFn>,
}

impl OutboundSender {
    /// Pushes `ev` onto the outbound queue, then fires the wake callback
    /// (if one is registered). Fails only if the bus thread has already
    /// dropped its receiver.
    pub fn send(&self, ev: OutboundEvent) -> Result<(), OutboundEvent> {
        self.tx.send(ev).map_err(|e| e.0)?;
        if let Some(wake) = &self.wake {
            wake();
        }
        Ok(())
    }
}
