//! Update requests and the producer contract
//!
//! A producer computes the new value of a slot. It must be safe to abandon:
//! the scheduler may drop its result, or stop polling it, whenever a newer
//! request for the same slot arrives.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::trace;

use crate::domain::{CancellationToken, Priority, SlotName, Token};
use crate::error::SchedulerError;

/// Plain function producer
pub type ImmediateFn<V> = Box<dyn FnOnce() -> eyre::Result<V> + Send + 'static>;

/// Long-running producer that yields through a [`DeferredContext`]
pub type YieldingFn<V> = Box<dyn FnOnce(DeferredContext) -> BoxFuture<'static, eyre::Result<V>> + Send + 'static>;

/// Computes the new value for a slot
pub enum Producer<V> {
    /// Runs to completion in one call; the only kind allowed for urgent work
    Immediate(ImmediateFn<V>),

    /// Future that calls `cx.checkpoint().await?` at its yield points
    Yielding(YieldingFn<V>),
}

impl<V> Producer<V> {
    /// Wrap a plain function
    pub fn immediate<F>(f: F) -> Self
    where
        F: FnOnce() -> eyre::Result<V> + Send + 'static,
    {
        Self::Immediate(Box::new(f))
    }

    /// Wrap an async function that receives the deferred context
    pub fn yielding<F, Fut>(f: F) -> Self
    where
        F: FnOnce(DeferredContext) -> Fut + Send + 'static,
        Fut: Future<Output = eyre::Result<V>> + Send + 'static,
    {
        Self::Yielding(Box::new(move |cx| f(cx).boxed()))
    }

    /// Whether this producer may suspend
    pub fn is_yielding(&self) -> bool {
        matches!(self, Self::Yielding(_))
    }
}

impl<V> fmt::Debug for Producer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => write!(f, "Producer::Immediate"),
            Self::Yielding(_) => write!(f, "Producer::Yielding"),
        }
    }
}

/// A request to update one slot
#[derive(Debug)]
pub struct UpdateRequest<V> {
    pub slot: SlotName,
    pub priority: Priority,
    pub producer: Producer<V>,
}

impl<V> UpdateRequest<V> {
    /// Create a request from already-validated parts
    pub fn new(slot: SlotName, priority: Priority, producer: Producer<V>) -> Self {
        Self {
            slot,
            priority,
            producer,
        }
    }

    /// Urgent request with a plain producer
    pub fn urgent<F>(slot: &str, f: F) -> Result<Self, SchedulerError>
    where
        F: FnOnce() -> eyre::Result<V> + Send + 'static,
    {
        Ok(Self::new(SlotName::new(slot)?, Priority::Urgent, Producer::immediate(f)))
    }

    /// Deferred request with a plain producer
    pub fn deferred<F>(slot: &str, f: F) -> Result<Self, SchedulerError>
    where
        F: FnOnce() -> eyre::Result<V> + Send + 'static,
    {
        Ok(Self::new(SlotName::new(slot)?, Priority::Deferred, Producer::immediate(f)))
    }

    /// Deferred request with a long-running producer
    pub fn deferred_yielding<F, Fut>(slot: &str, f: F) -> Result<Self, SchedulerError>
    where
        F: FnOnce(DeferredContext) -> Fut + Send + 'static,
        Fut: Future<Output = eyre::Result<V>> + Send + 'static,
    {
        Ok(Self::new(SlotName::new(slot)?, Priority::Deferred, Producer::yielding(f)))
    }
}

/// Returned from [`DeferredContext::checkpoint`] once the computation is stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deferred computation was superseded")]
pub struct Cancelled;

/// Handed to a deferred producer so it can yield and detect staleness
#[derive(Debug, Clone)]
pub struct DeferredContext {
    slot: SlotName,
    token: Token,
    cancel: CancellationToken,
}

impl DeferredContext {
    pub(crate) fn new(slot: SlotName, token: Token, cancel: CancellationToken) -> Self {
        Self { slot, token, cancel }
    }

    /// Slot this computation will write
    pub fn slot(&self) -> &SlotName {
        &self.slot
    }

    /// Token of this computation
    pub fn token(&self) -> Token {
        self.token
    }

    /// Whether a newer request has superseded this computation
    pub fn is_stale(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cooperative yield point
    ///
    /// Gives the scheduler a chance to run urgent work, then reports whether
    /// this computation is still current. Producers propagate the error with
    /// `?` and stop.
    pub async fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_stale() {
            trace!(slot = %self.slot, token = %self.token, "DeferredContext::checkpoint: stale before yield");
            return Err(Cancelled);
        }
        tokio::task::yield_now().await;
        if self.is_stale() {
            trace!(slot = %self.slot, token = %self.token, "DeferredContext::checkpoint: stale after yield");
            return Err(Cancelled);
        }
        Ok(())
    }
}
