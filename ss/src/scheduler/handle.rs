//! SchedulerHandle - cloneable front door to the scheduler actor

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::domain::{Priority, SlotName, Token};
use crate::error::{SchedulerError, SchedulerResult};

use super::messages::{DeferredTicket, Receipt, SchedulerRequest, SchedulerStats, SlotSnapshot, SlotUpdate};
use super::observer::{ChannelObserver, ObserverFilter, ObserverId, SlotObserver};
use super::request::{DeferredContext, Producer, UpdateRequest};

/// Handle to send requests to the PriorityScheduler
pub struct SchedulerHandle<V> {
    tx: mpsc::Sender<SchedulerRequest<V>>,
}

// Manual impl so `V` need not be Clone
impl<V> Clone for SchedulerHandle<V> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<V: Clone + Send + 'static> SchedulerHandle<V> {
    pub(crate) fn new(tx: mpsc::Sender<SchedulerRequest<V>>) -> Self {
        Self { tx }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> SchedulerRequest<V>) -> SchedulerResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SchedulerError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SchedulerError::ChannelClosed)
    }

    // === Submission ===

    /// Submit an update request
    ///
    /// Urgent requests are applied before this returns. Deferred requests
    /// return a [`DeferredTicket`] as soon as they are queued.
    pub async fn submit(&self, request: UpdateRequest<V>) -> SchedulerResult<Receipt> {
        debug!(slot = %request.slot, priority = %request.priority, "SchedulerHandle::submit: called");
        let UpdateRequest { slot, priority, producer } = request;
        match priority {
            Priority::Urgent => self.apply(slot, producer).await.map(|version| Receipt::Applied { version }),
            Priority::Deferred => self.enqueue(slot, producer).await.map(Receipt::Deferred),
        }
    }

    /// Apply an urgent update; returns the slot's new version
    pub async fn urgent<F>(&self, slot: &str, f: F) -> SchedulerResult<u64>
    where
        F: FnOnce() -> eyre::Result<V> + Send + 'static,
    {
        let request = UpdateRequest::urgent(slot, f)?;
        self.apply(request.slot, request.producer).await
    }

    /// Queue a deferred update with a plain producer
    pub async fn deferred<F>(&self, slot: &str, f: F) -> SchedulerResult<DeferredTicket>
    where
        F: FnOnce() -> eyre::Result<V> + Send + 'static,
    {
        let request = UpdateRequest::deferred(slot, f)?;
        self.enqueue(request.slot, request.producer).await
    }

    /// Queue a deferred update with a long-running producer
    pub async fn deferred_yielding<F, Fut>(&self, slot: &str, f: F) -> SchedulerResult<DeferredTicket>
    where
        F: FnOnce(DeferredContext) -> Fut + Send + 'static,
        Fut: Future<Output = eyre::Result<V>> + Send + 'static,
    {
        let request = UpdateRequest::deferred_yielding(slot, f)?;
        self.enqueue(request.slot, request.producer).await
    }

    async fn apply(&self, slot: SlotName, producer: Producer<V>) -> SchedulerResult<u64> {
        self.request(|reply| SchedulerRequest::Urgent { slot, producer, reply })
            .await?
    }

    async fn enqueue(&self, slot: SlotName, producer: Producer<V>) -> SchedulerResult<DeferredTicket> {
        self.request(|reply| SchedulerRequest::Deferred { slot, producer, reply })
            .await
    }

    /// Cancel a pending deferred update
    ///
    /// Returns `true` only if `token` was still the slot's latest deferred
    /// request. Stale or unknown tokens are a no-op.
    pub async fn cancel(&self, slot: &SlotName, token: Token) -> SchedulerResult<bool> {
        debug!(%slot, %token, "SchedulerHandle::cancel: called");
        let slot = slot.clone();
        self.request(|reply| SchedulerRequest::Cancel { slot, token, reply })
            .await
    }

    // === Observation ===

    /// Register an observer
    pub async fn observe(
        &self,
        filter: ObserverFilter,
        observer: impl SlotObserver<V> + 'static,
    ) -> SchedulerResult<ObserverId> {
        debug!(?filter, "SchedulerHandle::observe: called");
        let observer: Arc<dyn SlotObserver<V>> = Arc::new(observer);
        self.request(|reply| SchedulerRequest::Observe { filter, observer, reply })
            .await
    }

    /// Remove an observer; returns whether it was registered
    pub async fn unobserve(&self, id: ObserverId) -> SchedulerResult<bool> {
        debug!(?id, "SchedulerHandle::unobserve: called");
        self.request(|reply| SchedulerRequest::Unobserve { id, reply }).await
    }

    /// Stream updates for one slot
    ///
    /// The observer is dropped automatically once the receiver is dropped.
    pub async fn watch(&self, slot: &SlotName) -> SchedulerResult<mpsc::UnboundedReceiver<SlotUpdate<V>>> {
        let (observer, rx) = ChannelObserver::channel();
        self.observe(ObserverFilter::Slot(slot.clone()), observer).await?;
        Ok(rx)
    }

    /// Stream updates for every slot
    pub async fn watch_all(&self) -> SchedulerResult<mpsc::UnboundedReceiver<SlotUpdate<V>>> {
        let (observer, rx) = ChannelObserver::channel();
        self.observe(ObserverFilter::All, observer).await?;
        Ok(rx)
    }

    // === Inspection ===

    /// Read a slot; `None` if it has never been touched
    pub async fn snapshot(&self, slot: &SlotName) -> SchedulerResult<Option<SlotSnapshot<V>>> {
        let slot = slot.clone();
        self.request(|reply| SchedulerRequest::Snapshot { slot, reply }).await
    }

    /// Current value of a slot
    pub async fn value(&self, slot: &SlotName) -> SchedulerResult<Option<V>> {
        Ok(self.snapshot(slot).await?.and_then(|snap| snap.value))
    }

    /// Scheduler counters
    pub async fn stats(&self) -> SchedulerResult<SchedulerStats> {
        self.request(|reply| SchedulerRequest::Stats { reply }).await
    }

    /// Stop the scheduler
    ///
    /// Outstanding deferred tickets resolve as shut down. Requests sent
    /// afterwards fail with [`SchedulerError::ChannelClosed`].
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        debug!("SchedulerHandle::shutdown: called");
        self.tx
            .send(SchedulerRequest::Shutdown)
            .await
            .map_err(|_| SchedulerError::ChannelClosed)
    }

    /// Whether the scheduler task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
