//! Cooperative cancellation.
//!
//! Every engine operation takes a [`CancellationToken`]. The token is checked
//! before each subscription callback and before each injected-latency wait;
//! an observed cancellation makes the operation return
//! [`StoreError::Cancelled`] without running further callbacks.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::StoreError;

/// Shared flag signalling cooperative cancellation.
///
/// Cloning the token yields a handle to the same flag, so one side can cancel
/// while the other polls. A default token is never cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`StoreError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cancelled`] when the token has been cancelled.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_check() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancelled_token_fails_check() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(token.check(), Err(StoreError::Cancelled)));
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
