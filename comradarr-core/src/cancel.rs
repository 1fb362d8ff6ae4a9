//! Cooperative cancellation for long-running operations (`spec.md` §5).
//!
//! No `tokio-util` dependency here; a single-purpose token built on
//! `tokio::sync::watch` is enough to satisfy the cancellation contract in
//! `spec.md` §5: stop accepting new batches, never mutate an in-flight
//! batch's recorded outcome, and never refund a slot already charged
//! against a throttle budget.

use tokio::sync::watch;

/// A cooperative, cloneable cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

/// The other half of a [`CancellationToken`]; dropping it without calling
/// [`cancel`](CancelGuard::cancel) leaves the token permanently un-cancelled.
#[derive(Debug)]
pub struct CancelGuard {
    tx: watch::Sender<bool>,
}

impl CancelGuard {
    /// Signal cancellation to every clone of the associated token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancellationToken {
    /// Creates a linked `(token, guard)` pair.
    #[must_use]
    pub fn new() -> (Self, CancelGuard) {
        let (tx, rx) = watch::channel(false);
        (Self { rx }, CancelGuard { tx })
    }

    /// True once the linked guard has cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// A token with no linked guard, permanently un-cancelled. For callers
    /// (schedulers, tests) that drive a long-running operation without
    /// needing to cancel it.
    #[must_use]
    pub fn none() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_cancels_all_clones() {
        let (token, guard) = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        assert!(!clone.is_cancelled());
        guard.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
