//! slotsched - priority-aware update scheduler
//!
//! State changes are split into two classes. Urgent updates run to
//! completion immediately and are never held up by background work.
//! Deferred updates are computed later, one at a time, and yield to urgent
//! work at their checkpoints. When several deferred updates target the same
//! slot in quick succession, only the latest one is allowed to land.
//!
//! # Core Concepts
//!
//! - **Slots**: named cells of state, each tracked independently
//! - **Tokens**: every deferred request gets a monotonic token; stale tokens never write
//! - **Cooperative cancellation**: deferred producers call `checkpoint().await?` and stop when superseded
//! - **Failure isolation**: producer errors and panics leave the slot untouched
//!
//! # Modules
//!
//! - [`scheduler`] - The PriorityScheduler actor and its handle
//! - [`domain`] - Slot names, priorities, and staleness tokens
//! - [`demo`] - User directory and slow list scenarios
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod demo;
pub mod domain;
pub mod error;
pub mod scheduler;

// Re-export commonly used types
pub use config::{Config, DemoConfig};
pub use demo::{DemoValue, Transcript, User, run_search_scenario, run_toggle_scenario};
pub use domain::{CancellationToken, Priority, SlotName, Token};
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{
    Cancelled, DeferredContext, DeferredOutcome, DeferredTicket, ObserverFilter, ObserverId, PriorityScheduler,
    Producer, Receipt, SchedulerConfig, SchedulerHandle, SchedulerStats, SlotObserver, SlotPhase, SlotSnapshot,
    SlotUpdate, UpdateRequest, UpdateStatus,
};
