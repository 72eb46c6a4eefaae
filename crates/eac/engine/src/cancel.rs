//! Cooperative cancellation
//!
//! A card command must never be aborted mid-transmission, so cancellation
//! is a token that protocol loops check between card commands and between
//! eID-Server round-trips. The in-flight command always finishes; teardown
//! runs afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Shared cancellation flag for one authentication attempt.
///
/// Clones observe the same flag, so a UI thread can hold one clone while
/// the protocol task holds another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Fail with [`Error::UserCancelled`] if cancellation was requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::UserCancelled)
        } else {
            Ok(())
        }
    }
}
