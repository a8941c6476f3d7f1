//! Message types for the scheduler actor
//!
//! Requests flow from [`SchedulerHandle`](super::SchedulerHandle) to the actor
//! over one ordered channel; replies come back on oneshot channels.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::domain::{SlotName, Token};
use crate::error::SchedulerError;

use super::observer::{ObserverFilter, ObserverId, SlotObserver};
use super::request::Producer;

/// Internal requests to the scheduler task
pub(crate) enum SchedulerRequest<V> {
    /// Apply an urgent update inline; replies with the slot's new version
    Urgent {
        slot: SlotName,
        producer: Producer<V>,
        reply: oneshot::Sender<Result<u64, SchedulerError>>,
    },

    /// Queue a deferred update
    Deferred {
        slot: SlotName,
        producer: Producer<V>,
        reply: oneshot::Sender<DeferredTicket>,
    },

    /// Cancel a pending deferred update if it is still current
    Cancel {
        slot: SlotName,
        token: Token,
        reply: oneshot::Sender<bool>,
    },

    /// Register an observer
    Observe {
        filter: ObserverFilter,
        observer: Arc<dyn SlotObserver<V>>,
        reply: oneshot::Sender<ObserverId>,
    },

    /// Remove an observer
    Unobserve { id: ObserverId, reply: oneshot::Sender<bool> },

    /// Read the state of one slot
    Snapshot {
        slot: SlotName,
        reply: oneshot::Sender<Option<SlotSnapshot<V>>>,
    },

    /// Read scheduler statistics
    Stats { reply: oneshot::Sender<SchedulerStats> },

    /// Stop the scheduler
    Shutdown,
}

/// Status reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// A new value was written
    Applied,
    /// A deferred computation was queued; the value shown is the previous one
    Pending,
    /// The producer failed; the value shown is unchanged
    Failed,
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Pending => write!(f, "pending"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Notification delivered to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUpdate<V> {
    pub slot: SlotName,
    pub value: Option<V>,
    pub status: UpdateStatus,
    /// Number of writes the slot has seen so far
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-slot scheduling phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotPhase {
    #[default]
    Idle,
    ComputingDeferred,
}

/// Point-in-time view of a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot<V> {
    pub slot: SlotName,
    pub value: Option<V>,
    pub phase: SlotPhase,
    pub version: u64,
    /// Token of the latest deferred request, if one is outstanding
    #[serde(rename = "pending-token")]
    pub pending_token: Option<Token>,
}

/// Counters kept by the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchedulerStats {
    pub urgent_applied: u64,
    pub deferred_submitted: u64,
    pub deferred_applied: u64,
    pub deferred_superseded: u64,
    pub deferred_cancelled: u64,
    /// Deferred results or queued jobs dropped because their token went stale
    pub stale_discarded: u64,
    pub producer_failures: u64,
    pub observer_panics: u64,
    pub queue_depth: usize,
    pub peak_queue_depth: usize,
    pub slots: usize,
    pub observers: usize,
}

/// Final outcome of a deferred submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DeferredOutcome {
    /// The result was written to the slot
    Applied { version: u64 },
    /// A newer request for the same slot replaced this one
    Superseded,
    /// Cancelled through [`SchedulerHandle::cancel`](super::SchedulerHandle::cancel)
    Cancelled,
    /// The producer failed; the slot is unchanged
    Failed { reason: String },
    /// The scheduler stopped before the computation finished
    Shutdown,
}

/// Caller-side handle of a deferred submission
#[derive(Debug)]
pub struct DeferredTicket {
    slot: SlotName,
    token: Token,
    outcome: oneshot::Receiver<DeferredOutcome>,
}

impl DeferredTicket {
    pub(crate) fn new(slot: SlotName, token: Token, outcome: oneshot::Receiver<DeferredOutcome>) -> Self {
        Self { slot, token, outcome }
    }

    /// Slot the deferred computation targets
    pub fn slot(&self) -> &SlotName {
        &self.slot
    }

    /// Staleness token of the deferred computation
    pub fn token(&self) -> Token {
        self.token
    }

    /// Wait for the computation to resolve
    pub async fn outcome(self) -> DeferredOutcome {
        self.outcome.await.unwrap_or(DeferredOutcome::Shutdown)
    }
}

/// Acknowledgement of a submitted request
#[derive(Debug)]
pub enum Receipt {
    /// Urgent update written; `version` is the slot's new version
    Applied { version: u64 },
    /// Deferred update queued
    Deferred(DeferredTicket),
}

impl Receipt {
    /// Take the ticket of a deferred submission
    pub fn into_ticket(self) -> Option<DeferredTicket> {
        match self {
            Self::Deferred(ticket) => Some(ticket),
            Self::Applied { .. } => None,
        }
    }
}
