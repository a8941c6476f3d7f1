//! Error types for scheduler operations

use thiserror::Error;

use crate::domain::SlotName;

/// Errors surfaced to callers of the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Slot identifier was empty or malformed; the request was never enqueued
    #[error("Invalid slot name {name:?}: {reason}")]
    InvalidSlot { name: String, reason: &'static str },

    /// Producer returned an error or panicked; the slot keeps its prior value
    #[error("Producer failed for slot '{slot}': {reason}")]
    ProducerFailed { slot: SlotName, reason: String },

    /// Urgent work must run to completion without suspending
    #[error("Urgent request for slot '{0}' carries a yielding producer")]
    YieldingUrgent(SlotName),

    /// The scheduler actor has stopped
    #[error("Scheduler channel closed")]
    ChannelClosed,
}

/// Result alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_slot_display() {
        let err = SchedulerError::InvalidSlot {
            name: " list".to_string(),
            reason: "leading or trailing whitespace",
        };
        assert_eq!(
            err.to_string(),
            "Invalid slot name \" list\": leading or trailing whitespace"
        );
    }

    #[test]
    fn test_producer_failed_display() {
        let err = SchedulerError::ProducerFailed {
            slot: SlotName::new("list").unwrap(),
            reason: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Producer failed for slot 'list': boom");
    }
}
