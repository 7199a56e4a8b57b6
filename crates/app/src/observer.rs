//! Observer registry: synchronous change notification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::change::StoreChange;
use crate::state::StoreSnapshot;

/// Callback invoked after every applied command.
pub type ChangeHandler = Arc<dyn Fn(&StoreChange, &StoreSnapshot) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of change handlers.
///
/// Handlers run in subscription order, on the thread that issued the
/// command, after the registry lock has been released so a handler may
/// subscribe, unsubscribe or issue store commands itself. Unsubscribing
/// takes effect immediately, even for a handler still pending in the
/// current notification; handlers subscribed during a notification are
/// first called on the next one.
pub struct ObserverRegistry {
    handlers: RwLock<Vec<(SubscriptionId, ChangeHandler)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StoreChange, &StoreSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(entry, _)| *entry != id);
        handlers.len() != before
    }

    pub fn notify(&self, change: &StoreChange, snapshot: &StoreSnapshot) {
        let handlers: Vec<(SubscriptionId, ChangeHandler)> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();
        for (id, handler) in handlers {
            if self.contains(id) {
                handler(change, snapshot);
            }
        }
    }

    /// Whether `id` is still subscribed.
    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(entry, _)| *entry == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StoreState;
    use homedash_domain::id::RoomId;
    use std::sync::Mutex;

    fn change() -> StoreChange {
        StoreChange::RoomAdded(RoomId::new("kitchen"))
    }

    #[test]
    fn should_call_every_handler_in_subscription_order() {
        let registry = ObserverRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&calls);
        registry.subscribe(move |_, _| first.lock().unwrap().push("first"));
        let second = Arc::clone(&calls);
        registry.subscribe(move |_, _| second.lock().unwrap().push("second"));

        registry.notify(&change(), &Arc::new(StoreState::default()));

        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn should_stop_calling_handler_after_unsubscribe() {
        let registry = ObserverRegistry::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let id = registry.subscribe(move |_, _| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        registry.notify(&change(), &Arc::new(StoreState::default()));
        assert!(registry.unsubscribe(id));
        registry.notify(&change(), &Arc::new(StoreState::default()));

        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn should_return_false_when_unsubscribing_twice() {
        let registry = ObserverRegistry::new();
        let id = registry.subscribe(|_, _| {});
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
    }

    #[test]
    fn should_allow_handler_to_unsubscribe_itself() {
        let registry = Arc::new(ObserverRegistry::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let reg = Arc::clone(&registry);
        let own = Arc::clone(&slot);
        let id = registry.subscribe(move |_, _| {
            if let Some(id) = *own.lock().unwrap() {
                reg.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        registry.notify(&change(), &Arc::new(StoreState::default()));
        assert!(registry.is_empty());
    }

    #[test]
    fn should_skip_pending_handler_when_unsubscribed_during_notification() {
        let registry = Arc::new(ObserverRegistry::new());
        let target: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let later_calls = Arc::new(AtomicU64::new(0));

        let reg = Arc::clone(&registry);
        let victim = Arc::clone(&target);
        registry.subscribe(move |_, _| {
            if let Some(id) = *victim.lock().unwrap() {
                reg.unsubscribe(id);
            }
        });
        let calls = Arc::clone(&later_calls);
        let later = registry.subscribe(move |_, _| {
            calls.fetch_add(1, Ordering::Relaxed);
        });
        *target.lock().unwrap() = Some(later);

        registry.notify(&change(), &Arc::new(StoreState::default()));

        assert_eq!(later_calls.load(Ordering::Relaxed), 0);
        assert!(!registry.contains(later));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_not_call_handler_subscribed_during_notification_until_next_one() {
        let registry = Arc::new(ObserverRegistry::new());
        let late_calls = Arc::new(AtomicU64::new(0));
        let subscribed = Arc::new(Mutex::new(false));

        let reg = Arc::clone(&registry);
        let calls = Arc::clone(&late_calls);
        let once = Arc::clone(&subscribed);
        registry.subscribe(move |_, _| {
            let mut done = once.lock().unwrap();
            if !*done {
                *done = true;
                let calls = Arc::clone(&calls);
                reg.subscribe(move |_, _| {
                    calls.fetch_add(1, Ordering::Relaxed);
                });
            }
        });

        registry.notify(&change(), &Arc::new(StoreState::default()));
        assert_eq!(late_calls.load(Ordering::Relaxed), 0);

        registry.notify(&change(), &Arc::new(StoreState::default()));
        assert_eq!(late_calls.load(Ordering::Relaxed), 1);
    }
}
