//! In-process change bus backed by a tokio broadcast channel.
//!
//! Bridges the store's synchronous observers to async consumers.

use tokio::sync::broadcast;

use crate::change::StoreChange;
use crate::observer::SubscriptionId;
use crate::ports::StateStorage;
use crate::store::DeviceStore;

/// Fan-out of [`StoreChange`]s using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active receivers
/// (the change is simply dropped). Slow receivers lag rather than
/// blocking the store.
#[derive(Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<StoreChange>,
}

impl ChangeBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to changes on this bus.
    ///
    /// Returns a receiver that will get all changes published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.sender.subscribe()
    }

    /// Forward a change to every receiver.
    pub fn publish(&self, change: StoreChange) {
        // send fails only when there are zero receivers.
        let _ = self.sender.send(change);
    }

    /// Register on `store` so that every applied command is forwarded.
    pub fn attach<S: StateStorage>(&self, store: &DeviceStore<S>) -> SubscriptionId {
        let bus = self.clone();
        store.subscribe(move |change, _| bus.publish(change.clone()))
    }
}
