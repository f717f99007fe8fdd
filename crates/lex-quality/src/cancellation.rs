//! Cancellation token for aborting anomaly detection.
//!
//! A caller that wraps detection in a timeout keeps a clone of the token and
//! calls [`CancellationToken::cancel`] when the deadline passes. The engine
//! checks the token between trees and before assembling output, so a
//! cancelled run returns [`QualityError::Cancelled`](crate::error::QualityError::Cancelled)
//! without producing partial results.
//!
//! # Example
//!
//! ```
//! use lex_quality::CancellationToken;
//!
//! let token = CancellationToken::new();
//! assert!(!token.is_cancelled());
//!
//! token.cancel();
//! assert!(token.is_cancelled());
//! ```

use crate::error::{QualityError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Thread-safe cancellation flag shared between a caller and a running check.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);

impl CancellationToken {
    /// Creates a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Return `Err(Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(QualityError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_state() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();

        assert!(token.is_cancelled());
        assert!(token.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_reset() {
        let token = CancellationToken::new();
        token.cancel();
        token.reset();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let token = CancellationToken::new();
        let clone = token.clone();

        std::thread::spawn(move || clone.cancel())
            .join()
            .expect("thread panicked");

        assert!(token.is_cancelled());
    }
}
