//! Priority classes for update requests

use serde::{Deserialize, Serialize};

/// Priority class of an update request
///
/// `Urgent` work is applied synchronously and never suspends. `Deferred`
/// work may be delayed, interrupted, coalesced, or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Deferred,
    Urgent,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deferred => write!(f, "deferred"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}
