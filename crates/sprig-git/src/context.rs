//! Invocation context carried through every git call.
//!
//! A [`Context`] lets the caller cancel in-flight git processes, either
//! explicitly with [`Context::cancel`] or implicitly through a deadline.
//! Clones share the same cancellation flag, so a context handed to a worker
//! can be cancelled from the thread that created it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cancellation and deadline state for one logical operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or_else(Self::background, Self::with_deadline)
    }

    /// A context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the context was cancelled or its deadline has passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// The deadline, if one was set.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = Context::background();
        let worker = ctx.clone();
        ctx.cancel();
        assert!(worker.is_cancelled());
    }

    #[test]
    fn test_expired_deadline_counts_as_cancelled() {
        let ctx = Context::with_timeout(Duration::ZERO);
        assert!(ctx.is_cancelled());

        let ctx = Context::with_timeout(Duration::from_secs(3600));
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_unrepresentable_timeout_is_unbounded() {
        let ctx = Context::with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_cancelled());

        let ctx = Context::with_timeout(Duration::from_secs(u64::MAX));
        assert!(ctx.deadline().is_none());
    }
}
