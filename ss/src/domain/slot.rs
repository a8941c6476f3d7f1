//! Slot names
//!
//! A slot is a named unit of state tracked independently by the scheduler.
//! Names are validated once at construction so the scheduler never sees a
//! malformed identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Maximum slot name length in bytes
pub const MAX_SLOT_NAME_LEN: usize = 128;

/// Validated slot identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotName(String);

impl SlotName {
    /// Create a slot name, rejecting empty or malformed identifiers
    pub fn new(name: impl Into<String>) -> Result<Self, SchedulerError> {
        let name = name.into();
        validate(&name).map_err(|reason| SchedulerError::InvalidSlot {
            name: name.clone(),
            reason,
        })?;
        Ok(Self(name))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty");
    }
    if name.len() > MAX_SLOT_NAME_LEN {
        return Err("longer than 128 bytes");
    }
    if name.trim() != name {
        return Err("leading or trailing whitespace");
    }
    if name.chars().any(char::is_control) {
        return Err("contains control characters");
    }
    Ok(())
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SlotName {
    type Error = SchedulerError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<SlotName> for String {
    fn from(name: SlotName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["list", "toggle", "search.results", "user/42", "a b"] {
            let slot = SlotName::new(name).unwrap();
            assert_eq!(slot.as_str(), name);
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = SlotName::new("").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSlot { reason: "empty", .. }));
    }

    #[test]
    fn test_whitespace_rejected() {
        assert!(SlotName::new("   ").is_err());
        assert!(SlotName::new(" list").is_err());
        assert!(SlotName::new("list\n").is_err());
    }

    #[test]
    fn test_control_chars_rejected() {
        assert!(SlotName::new("li\u{0007}st").is_err());
    }

    #[test]
    fn test_length_limit() {
        assert!(SlotName::new("x".repeat(MAX_SLOT_NAME_LEN)).is_ok());
        assert!(SlotName::new("x".repeat(MAX_SLOT_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let slot: SlotName = serde_json::from_str("\"posts\"").unwrap();
        assert_eq!(slot.as_str(), "posts");
        assert!(serde_json::from_str::<SlotName>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&slot).unwrap(), "\"posts\"");
    }
}
