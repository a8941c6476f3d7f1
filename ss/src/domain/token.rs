//! Staleness tokens and cooperative cancellation flags
//!
//! Every deferred request gets a [`Token`] from a monotonically increasing
//! counter. The slot remembers the token of its latest deferred request;
//! anything carrying an older token is stale. The running computation also
//! holds a [`CancellationToken`] so it can notice staleness at its own yield
//! points without access to the slot map.

use std::fmt;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

/// Identifies one deferred request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Token(pub(crate) u64);

impl Token {
    /// Raw counter value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues tokens in strictly increasing order
///
/// Owned by the scheduler actor, so no synchronization is needed.
#[derive(Debug, Default)]
pub(crate) struct TokenGenerator {
    next: u64,
}

impl TokenGenerator {
    pub(crate) fn next_token(&mut self) -> Token {
        self.next += 1;
        Token(self.next)
    }
}

/// Shared flag a deferred computation polls to learn it was superseded
///
/// Clones share the same underlying state. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the computation as cancelled; visible to all clones
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel()` has been called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_strictly_increase() {
        let mut tokens = TokenGenerator::default();
        let a = tokens.next_token();
        let b = tokens.next_token();
        let c = tokens.next_token();
        assert!(a < b && b < c);
        assert_eq!(a.value(), 1);
        assert_eq!(c.to_string(), "#3");
    }

    #[test]
    fn test_cancellation_token_basic() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());

        // Idempotent
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_clone_shares_state() {
        let token = CancellationToken::new();
        let worker = token.clone();

        token.cancel();
        assert!(worker.is_cancelled());
    }

    #[test]
    fn test_cancellation_across_threads() {
        let token = CancellationToken::new();
        let worker = token.clone();

        let handle = std::thread::spawn(move || {
            while !worker.is_cancelled() {
                std::thread::yield_now();
            }
            true
        });

        token.cancel();
        assert!(handle.join().unwrap());
    }
}
