//! PriorityScheduler actor
//!
//! One task owns every slot, the deferred queue, and the observer registry.
//! Requests arrive on a single ordered channel. The loop always drains that
//! channel before polling the running deferred computation again, so urgent
//! work waits at most until the deferred producer's next yield point.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{CancellationToken, SlotName, Token, TokenGenerator};
use crate::error::SchedulerError;

use super::config::SchedulerConfig;
use super::handle::SchedulerHandle;
use super::messages::{
    DeferredOutcome, DeferredTicket, SchedulerRequest, SchedulerStats, SlotPhase, SlotSnapshot, SlotUpdate,
    UpdateStatus,
};
use super::observer::ObserverRegistry;
use super::request::{DeferredContext, ImmediateFn, Producer};

/// Deferred request that is still the slot's latest intent
struct PendingDeferred {
    token: Token,
    cancel: CancellationToken,
    outcome: oneshot::Sender<DeferredOutcome>,
}

impl PendingDeferred {
    fn resolve(self, outcome: DeferredOutcome) {
        if !matches!(outcome, DeferredOutcome::Applied { .. }) {
            self.cancel.cancel();
        }
        // Ticket may have been dropped by the caller
        let _ = self.outcome.send(outcome);
    }
}

/// A named value cell
struct Slot<V> {
    current: Option<V>,
    pending: Option<PendingDeferred>,
    phase: SlotPhase,
    version: u64,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            current: None,
            pending: None,
            phase: SlotPhase::Idle,
            version: 0,
        }
    }

    fn pending_token(&self) -> Option<Token> {
        self.pending.as_ref().map(|p| p.token)
    }
}

/// Why a deferred job or result was dropped without writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discard {
    /// A newer deferred request for the slot holds the pending token
    StaleToken,
    /// The slot no longer has a pending request (cancelled or overwritten by urgent work)
    Cancelled,
}

impl Discard {
    fn classify(pending: Option<Token>) -> Self {
        match pending {
            Some(_) => Self::StaleToken,
            None => Self::Cancelled,
        }
    }
}

/// Queued deferred work
struct DeferredJob<V> {
    slot: SlotName,
    token: Token,
    cancel: CancellationToken,
    producer: Producer<V>,
    queued_at: Instant,
}

/// The single deferred computation currently being polled
struct Running<V> {
    slot: SlotName,
    token: Token,
    cancel: CancellationToken,
    started_at: Instant,
    future: BoxFuture<'static, Result<V, String>>,
}

impl<V: Send + 'static> Running<V> {
    fn start(job: DeferredJob<V>) -> Self {
        let cx = DeferredContext::new(job.slot.clone(), job.token, job.cancel.clone());

        let future: BoxFuture<'static, eyre::Result<V>> = match job.producer {
            Producer::Immediate(f) => async move {
                cx.checkpoint().await?;
                f()
            }
            .boxed(),
            Producer::Yielding(f) => match catch_unwind(AssertUnwindSafe(|| f(cx))) {
                Ok(future) => future,
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    async move { Err(eyre::eyre!(reason)) }.boxed()
                }
            },
        };

        let future = AssertUnwindSafe(future)
            .catch_unwind()
            .map(|result| match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(payload) => Err(panic_reason(payload.as_ref())),
            })
            .boxed();

        Self {
            slot: job.slot,
            token: job.token,
            cancel: job.cancel,
            started_at: Instant::now(),
            future,
        }
    }
}

/// Poll the running computation, or never resolve when idle
async fn drive<V>(running: &mut Option<Running<V>>) -> Result<V, String> {
    match running {
        Some(running) => running.future.as_mut().await,
        None => std::future::pending().await,
    }
}

fn run_immediate<V>(f: ImmediateFn<V>) -> Result<V, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(panic_reason(payload.as_ref())),
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("producer panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("producer panicked: {}", msg)
    } else {
        "producer panicked".to_string()
    }
}

/// State owned by the scheduler task
struct SchedulerState<V> {
    slots: HashMap<SlotName, Slot<V>>,
    queue: VecDeque<DeferredJob<V>>,
    observers: ObserverRegistry<V>,
    tokens: TokenGenerator,
    stats: SchedulerStats,
}

impl<V: Clone + Send + 'static> SchedulerState<V> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            queue: VecDeque::new(),
            observers: ObserverRegistry::new(),
            tokens: TokenGenerator::default(),
            stats: SchedulerStats::default(),
        }
    }

    /// Run an urgent producer inline; it never suspends
    ///
    /// The slot is only touched once the producer succeeds, so a failure
    /// keeps both its value and any pending deferred request.
    fn apply_urgent(&mut self, slot: SlotName, producer: Producer<V>) -> Result<u64, SchedulerError> {
        debug!(%slot, "SchedulerState::apply_urgent: called");
        let f = match producer {
            Producer::Immediate(f) => f,
            Producer::Yielding(_) => {
                warn!(%slot, "Rejecting urgent request with a yielding producer");
                return Err(SchedulerError::YieldingUrgent(slot));
            }
        };

        match run_immediate(f) {
            Ok(value) => {
                // Urgent overrides any deferred intent for the same slot
                self.supersede(&slot);
                let entry = self.slots.entry(slot.clone()).or_insert_with(Slot::new);
                entry.phase = SlotPhase::Idle;
                entry.current = Some(value);
                entry.version += 1;
                let version = entry.version;
                self.stats.urgent_applied += 1;
                debug!(%slot, version, "Urgent update applied");
                self.notify(&slot, UpdateStatus::Applied, None);
                Ok(version)
            }
            Err(reason) => {
                self.stats.producer_failures += 1;
                warn!(%slot, %reason, "Urgent producer failed");
                self.notify(&slot, UpdateStatus::Failed, Some(reason.clone()));
                Err(SchedulerError::ProducerFailed { slot, reason })
            }
        }
    }

    /// Record the new deferred intent and queue its computation
    fn enqueue_deferred(&mut self, slot: SlotName, producer: Producer<V>) -> DeferredTicket {
        self.supersede(&slot);

        let token = self.tokens.next_token();
        let cancel = CancellationToken::new();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let entry = self.slots.entry(slot.clone()).or_insert_with(Slot::new);
        entry.pending = Some(PendingDeferred {
            token,
            cancel: cancel.clone(),
            outcome: outcome_tx,
        });
        entry.phase = SlotPhase::ComputingDeferred;

        self.queue.push_back(DeferredJob {
            slot: slot.clone(),
            token,
            cancel,
            producer,
            queued_at: Instant::now(),
        });
        self.stats.deferred_submitted += 1;
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queue.len());
        debug!(%slot, %token, queue_depth = self.queue.len(), "Deferred update queued");

        self.notify(&slot, UpdateStatus::Pending, None);
        DeferredTicket::new(slot, token, outcome_rx)
    }

    /// Invalidate the slot's pending deferred request, silently
    fn supersede(&mut self, slot: &SlotName) -> bool {
        let Some(pending) = self.slots.get_mut(slot).and_then(|entry| entry.pending.take()) else {
            return false;
        };
        debug!(%slot, token = %pending.token, "Superseding deferred computation");
        pending.resolve(DeferredOutcome::Superseded);
        self.stats.deferred_superseded += 1;
        true
    }

    /// Cancel the pending deferred request if `token` is still current
    ///
    /// Silent to observers; only the ticket learns of it.
    fn cancel(&mut self, slot: &SlotName, token: Token) -> bool {
        debug!(%slot, %token, "SchedulerState::cancel: called");
        let Some(entry) = self.slots.get_mut(slot) else {
            debug!(%slot, "SchedulerState::cancel: unknown slot, no-op");
            return false;
        };
        let Some(pending) = entry.pending.take_if(|p| p.token == token) else {
            debug!(%slot, %token, "SchedulerState::cancel: token not current, no-op");
            return false;
        };
        entry.phase = SlotPhase::Idle;
        pending.resolve(DeferredOutcome::Cancelled);
        self.stats.deferred_cancelled += 1;
        true
    }

    /// Pop the next job whose token is still current
    fn next_job(&mut self) -> Option<Running<V>> {
        while let Some(job) = self.queue.pop_front() {
            let pending = self.slots.get(&job.slot).and_then(Slot::pending_token);
            if pending != Some(job.token) || job.cancel.is_cancelled() {
                let reason = Discard::classify(pending);
                self.stats.stale_discarded += 1;
                debug!(slot = %job.slot, token = %job.token, ?reason, "Dropping stale deferred job");
                continue;
            }
            debug!(
                slot = %job.slot,
                token = %job.token,
                waited_ms = job.queued_at.elapsed().as_millis() as u64,
                "Starting deferred computation"
            );
            return Some(Running::start(job));
        }
        None
    }

    /// Apply the result of a finished deferred computation if still current
    fn finish(&mut self, done: Running<V>, output: Result<V, String>) {
        let elapsed_ms = done.started_at.elapsed().as_millis() as u64;
        let pending = self
            .slots
            .get_mut(&done.slot)
            .and_then(|entry| entry.pending.take_if(|p| p.token == done.token));
        let Some(pending) = pending else {
            let reason = Discard::classify(self.slots.get(&done.slot).and_then(Slot::pending_token));
            self.stats.stale_discarded += 1;
            debug!(slot = %done.slot, token = %done.token, ?reason, elapsed_ms, "Discarding stale deferred result");
            return;
        };
        let Some(entry) = self.slots.get_mut(&done.slot) else {
            return;
        };
        entry.phase = SlotPhase::Idle;

        match output {
            Ok(value) => {
                entry.current = Some(value);
                entry.version += 1;
                let version = entry.version;
                self.stats.deferred_applied += 1;
                debug!(slot = %done.slot, token = %done.token, version, elapsed_ms, "Deferred update applied");
                self.notify(&done.slot, UpdateStatus::Applied, None);
                pending.resolve(DeferredOutcome::Applied { version });
            }
            Err(reason) => {
                self.stats.producer_failures += 1;
                warn!(slot = %done.slot, token = %done.token, %reason, "Deferred producer failed");
                self.notify(&done.slot, UpdateStatus::Failed, Some(reason.clone()));
                pending.resolve(DeferredOutcome::Failed { reason });
            }
        }
    }

    fn snapshot(&self, slot: &SlotName) -> Option<SlotSnapshot<V>> {
        self.slots.get(slot).map(|entry| SlotSnapshot {
            slot: slot.clone(),
            value: entry.current.clone(),
            phase: entry.phase,
            version: entry.version,
            pending_token: entry.pending_token(),
        })
    }

    fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queue_depth: self.queue.len(),
            slots: self.slots.len(),
            observers: self.observers.len(),
            ..self.stats.clone()
        }
    }

    fn notify(&mut self, slot: &SlotName, status: UpdateStatus, error: Option<String>) {
        let entry = self.slots.get(slot);
        let update = SlotUpdate {
            slot: slot.clone(),
            value: entry.and_then(|e| e.current.clone()),
            status,
            version: entry.map_or(0, |e| e.version),
            error,
        };
        self.stats.observer_panics += self.observers.notify(&update);
    }

    /// Resolve every outstanding ticket and drop queued work
    fn shutdown(&mut self, running: Option<Running<V>>) {
        if let Some(running) = running {
            debug!(slot = %running.slot, token = %running.token, "Dropping in-flight deferred computation");
            running.cancel.cancel();
        }
        for entry in self.slots.values_mut() {
            if let Some(pending) = entry.pending.take() {
                pending.resolve(DeferredOutcome::Shutdown);
                entry.phase = SlotPhase::Idle;
            }
        }
        let dropped = self.queue.len();
        self.queue.clear();
        info!(dropped, "PriorityScheduler state released");
    }
}

/// Priority-aware update scheduler
///
/// Construct with [`PriorityScheduler::new`], take a [`SchedulerHandle`], and
/// drive it with [`PriorityScheduler::run`] on a task, or do all three with
/// [`PriorityScheduler::spawn`]. The scheduler stops when shut down or when
/// every handle is dropped.
pub struct PriorityScheduler<V> {
    config: SchedulerConfig,
    tx: mpsc::Sender<SchedulerRequest<V>>,
    rx: mpsc::Receiver<SchedulerRequest<V>>,
}

impl<V: Clone + Send + 'static> PriorityScheduler<V> {
    /// Create a scheduler with the given configuration
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "PriorityScheduler::new: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        Self { config, tx, rx }
    }

    /// Spawn the scheduler task and return a handle to it
    pub fn spawn(config: SchedulerConfig) -> SchedulerHandle<V> {
        let scheduler = Self::new(config);
        let handle = scheduler.handle();
        tokio::spawn(scheduler.run());
        handle
    }

    /// Get a handle for submitting requests
    pub fn handle(&self) -> SchedulerHandle<V> {
        SchedulerHandle::new(self.tx.clone())
    }

    /// Run the scheduler until shutdown
    ///
    /// This consumes the scheduler. All state lives inside this future.
    pub async fn run(self) {
        let Self { config, tx, mut rx } = self;
        // Only handles keep the channel open
        drop(tx);

        let mut state = SchedulerState::new();
        let mut running: Option<Running<V>> = None;

        info!(channel_buffer = config.channel_buffer, "PriorityScheduler started");

        loop {
            if running.is_none() {
                running = state.next_job();
            }

            tokio::select! {
                biased;

                req = rx.recv() => match req {
                    Some(SchedulerRequest::Urgent { slot, producer, reply }) => {
                        let _ = reply.send(state.apply_urgent(slot, producer));
                    }
                    Some(SchedulerRequest::Deferred { slot, producer, reply }) => {
                        let _ = reply.send(state.enqueue_deferred(slot, producer));
                    }
                    Some(SchedulerRequest::Cancel { slot, token, reply }) => {
                        let _ = reply.send(state.cancel(&slot, token));
                    }
                    Some(SchedulerRequest::Observe { filter, observer, reply }) => {
                        let id = state.observers.register(filter, observer);
                        let _ = reply.send(id);
                    }
                    Some(SchedulerRequest::Unobserve { id, reply }) => {
                        let _ = reply.send(state.observers.remove(id));
                    }
                    Some(SchedulerRequest::Snapshot { slot, reply }) => {
                        let _ = reply.send(state.snapshot(&slot));
                    }
                    Some(SchedulerRequest::Stats { reply }) => {
                        let _ = reply.send(state.stats());
                    }
                    Some(SchedulerRequest::Shutdown) => {
                        info!("PriorityScheduler shutdown requested");
                        break;
                    }
                    None => {
                        info!("All scheduler handles dropped");
                        break;
                    }
                },

                output = drive(&mut running) => {
                    if let Some(done) = running.take() {
                        state.finish(done, output);
                    }
                }
            }
        }

        state.shutdown(running.take());
        info!("PriorityScheduler stopped");
    }
}
