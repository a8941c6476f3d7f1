//! Priority scheduler for slot updates
//!
//! Urgent updates are applied inline on the scheduler task. Deferred updates
//! are queued and computed one at a time, yielding to urgent work at their
//! checkpoints. Each slot keeps only its latest deferred intent; older
//! computations are cancelled and their results discarded.

mod config;
mod core;
mod handle;
mod messages;
mod observer;
mod request;

pub use config::SchedulerConfig;
pub use core::PriorityScheduler;
pub use handle::SchedulerHandle;
pub use messages::{
    DeferredOutcome, DeferredTicket, Receipt, SchedulerStats, SlotPhase, SlotSnapshot, SlotUpdate, UpdateStatus,
};
pub use observer::{ChannelObserver, ObserverFilter, ObserverId, SlotObserver};
pub use request::{Cancelled, DeferredContext, ImmediateFn, Producer, UpdateRequest, YieldingFn};
