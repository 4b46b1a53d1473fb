//! Outbound frame buffer
//!
//! Commands issued before the transport is started (or after it has been
//! torn down) are queued here and flushed, in issue order, as soon as a
//! sender is attached. While a sender is attached, frames pass straight
//! through; queueing during reconnect gaps happens inside the transport.

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use chorus_ws::OutboundMessage;

pub(crate) struct Outbox {
    tx: RwLock<Option<mpsc::UnboundedSender<OutboundMessage>>>,
    buffer: Mutex<Vec<OutboundMessage>>,
}

impl Outbox {
    pub(crate) fn new() -> Self {
        Self {
            tx: RwLock::new(None),
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Queue a frame, or deliver it immediately if a sender is attached
    pub(crate) fn send(&self, message: OutboundMessage) {
        let tx = self.tx.read();
        match tx.as_ref() {
            Some(tx) => {
                if tx.send(message).is_err() {
                    tracing::warn!("transport channel closed, dropping frame");
                }
            }
            None => {
                tracing::debug!("no transport attached, buffering frame");
                self.buffer.lock().push(message);
            }
        }
    }

    /// Attach a sender and flush everything buffered so far
    pub(crate) fn attach(&self, tx: mpsc::UnboundedSender<OutboundMessage>) {
        let buffered: Vec<_> = {
            let mut guard = self.tx.write();
            *guard = Some(tx);
            self.buffer.lock().drain(..).collect()
        };
        if !buffered.is_empty() {
            tracing::debug!(count = buffered.len(), "flushing buffered frames");
        }
        for message in buffered {
            self.send(message);
        }
    }

    pub(crate) fn detach(&self) {
        *self.tx.write() = None;
    }
}
