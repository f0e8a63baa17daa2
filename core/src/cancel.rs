//! Caller-driven cancellation of blocking calls.
//!
//! # Design
//! Blocking waits (limiter slots, in-flight transport calls) cannot be woken
//! by the token directly, so they wait in short slices of `POLL_INTERVAL`
//! and re-check the token between slices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;

/// How often a blocked wait re-checks its cancellation token.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared flag a caller flips to abandon in-flight requests.
///
/// Clones observe the same flag, so one token can be handed to several
/// calls (or threads) and cancelled once.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(ApiError::Cancelled)` once the token has been cancelled.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());
        other.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(ApiError::Cancelled)));
    }
}
