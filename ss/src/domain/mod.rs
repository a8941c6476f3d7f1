//! Domain types for slotsched
//!
//! Slot names, priority classes, and the staleness tokens that tie a
//! deferred computation to the slot it may eventually write.

mod priority;
mod slot;
mod token;

pub use priority::Priority;
pub use slot::{MAX_SLOT_NAME_LEN, SlotName};
pub use token::{CancellationToken, Token};

pub(crate) use token::TokenGenerator;
