//! Slot observers
//!
//! Observers are the scheduler's only outward notification channel. They run
//! synchronously on the scheduler task, in registration order, right after
//! the state change they describe.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::SlotName;

use super::messages::SlotUpdate;

/// Receives slot status changes
pub trait SlotObserver<V>: Send + Sync {
    /// Called once per visible status change
    fn on_slot_updated(&self, update: &SlotUpdate<V>);

    /// Closed observers are dropped from the registry on the next notify
    fn is_closed(&self) -> bool {
        false
    }
}

impl<V, F> SlotObserver<V> for F
where
    F: Fn(&SlotUpdate<V>) + Send + Sync,
{
    fn on_slot_updated(&self, update: &SlotUpdate<V>) {
        self(update)
    }
}

/// Forwards updates into an unbounded channel
pub struct ChannelObserver<V> {
    tx: mpsc::UnboundedSender<SlotUpdate<V>>,
}

impl<V> ChannelObserver<V> {
    /// Create an observer and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SlotUpdate<V>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<V: Clone + Send> SlotObserver<V> for ChannelObserver<V> {
    fn on_slot_updated(&self, update: &SlotUpdate<V>) {
        // Receiver gone is fine; the registry prunes us on the next pass
        let _ = self.tx.send(update.clone());
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Identifies a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Which slots an observer wants to hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverFilter {
    Slot(SlotName),
    All,
}

impl ObserverFilter {
    fn matches(&self, slot: &SlotName) -> bool {
        match self {
            Self::Slot(name) => name == slot,
            Self::All => true,
        }
    }
}

struct Registration<V> {
    id: ObserverId,
    filter: ObserverFilter,
    observer: Arc<dyn SlotObserver<V>>,
}

/// Observer registry owned by the scheduler task
pub(crate) struct ObserverRegistry<V> {
    next_id: u64,
    registrations: Vec<Registration<V>>,
}

impl<V> ObserverRegistry<V> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            registrations: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, filter: ObserverFilter, observer: Arc<dyn SlotObserver<V>>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        debug!(?id, ?filter, "ObserverRegistry::register: called");
        self.registrations.push(Registration { id, filter, observer });
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        debug!(?id, "ObserverRegistry::remove: called");
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Deliver an update to every matching observer
    ///
    /// Returns the number of observers that panicked. A panicking observer
    /// is logged and skipped; the others still run.
    pub(crate) fn notify(&mut self, update: &SlotUpdate<V>) -> u64 {
        self.registrations.retain(|r| !r.observer.is_closed());

        let mut panics = 0;
        for registration in &self.registrations {
            if !registration.filter.matches(&update.slot) {
                continue;
            }
            let observer = &registration.observer;
            if catch_unwind(AssertUnwindSafe(|| observer.on_slot_updated(update))).is_err() {
                warn!(id = ?registration.id, slot = %update.slot, "Observer panicked");
                panics += 1;
            }
        }
        panics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::messages::UpdateStatus;
    use std::sync::Mutex;

    fn update(slot: &str, value: u32) -> SlotUpdate<u32> {
        SlotUpdate {
            slot: SlotName::new(slot).unwrap(),
            value: Some(value),
            status: UpdateStatus::Applied,
            version: 1,
            error: None,
        }
    }

    #[test]
    fn test_filter_matches() {
        let list = SlotName::new("list").unwrap();
        let toggle = SlotName::new("toggle").unwrap();
        assert!(ObserverFilter::All.matches(&list));
        assert!(ObserverFilter::Slot(list.clone()).matches(&list));
        assert!(!ObserverFilter::Slot(list).matches(&toggle));
    }

    #[test]
    fn test_notify_respects_filter() {
        let mut registry = ObserverRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        registry.register(
            ObserverFilter::Slot(SlotName::new("list").unwrap()),
            Arc::new(move |u: &SlotUpdate<u32>| sink.lock().unwrap().push(u.slot.to_string())),
        );

        registry.notify(&update("list", 1));
        registry.notify(&update("toggle", 2));

        assert_eq!(*seen.lock().unwrap(), vec!["list".to_string()]);
    }

    #[test]
    fn test_remove_observer() {
        let mut registry = ObserverRegistry::<u32>::new();
        let id = registry.register(ObserverFilter::All, Arc::new(|_: &SlotUpdate<u32>| {}));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_panicking_observer_is_isolated() {
        let mut registry = ObserverRegistry::new();
        let seen = Arc::new(Mutex::new(0));

        registry.register(
            ObserverFilter::All,
            Arc::new(|u: &SlotUpdate<u32>| {
                if u.value.is_some() {
                    panic!("observer bug");
                }
            }),
        );
        let sink = seen.clone();
        registry.register(
            ObserverFilter::All,
            Arc::new(move |_: &SlotUpdate<u32>| *sink.lock().unwrap() += 1),
        );

        assert_eq!(registry.notify(&update("list", 1)), 1);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_closed_channel_observer_is_pruned() {
        let mut registry = ObserverRegistry::new();
        let (observer, rx) = ChannelObserver::<u32>::channel();
        registry.register(ObserverFilter::All, Arc::new(observer));

        drop(rx);
        registry.notify(&update("list", 1));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_channel_observer_forwards() {
        let mut registry = ObserverRegistry::new();
        let (observer, mut rx) = ChannelObserver::<u32>::channel();
        registry.register(ObserverFilter::All, Arc::new(observer));

        registry.notify(&update("list", 9));
        let got = rx.try_recv().unwrap();
        assert_eq!(got.value, Some(9));
    }
}
