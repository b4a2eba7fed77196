//! Bounded hand-off between the watcher and the reconciler.
//!
//! There is exactly one producer and one consumer. `send` waits while the queue is full, so a
//! slow reconciler stalls the watcher (and with it the advance of the watch position) instead of
//! events piling up or being dropped.

// Third Party
use k8s_openapi::api::core::v1::Namespace;
use tokio::sync::mpsc;

// Local
use crate::error::Error;

pub struct EventChannel;

impl EventChannel {
    /// Create a FIFO queue holding at most `capacity` namespaces.
    pub fn bounded(capacity: usize) -> Result<(EventSender, EventReceiver), Error> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "event channel capacity must be at least 1".to_string(),
            ));
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok((EventSender { tx }, EventReceiver { rx }))
    }
}

/// Producer half, owned by the watcher.
pub struct EventSender {
    tx: mpsc::Sender<Namespace>,
}

impl EventSender {
    /// Push a namespace, waiting for a free slot if the queue is full.
    pub async fn send(&self, namespace: Namespace) -> Result<(), Error> {
        self.tx
            .send(namespace)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Slots currently free.
    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Consumer half, owned by the reconciler.
pub struct EventReceiver {
    rx: mpsc::Receiver<Namespace>,
}

impl EventReceiver {
    /// Pop the oldest namespace, waiting if the queue is empty. `None` once the sender is gone
    /// and everything queued has been received.
    pub async fn recv(&mut self) -> Option<Namespace> {
        self.rx.recv().await
    }
}
