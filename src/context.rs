// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Call context.
//!
//! Every adapter call takes a [`Context`] that carries verbosity, and the
//! means to cancel the external process backing the call.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Shared cancellation flag.
///
/// Clones observe the same flag.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Construct new cancellation flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context of a single call.
#[derive(Debug, Default, Clone)]
pub struct Context {
    pub verbose: bool,
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl Context {
    /// Construct new context without deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Give up once timeout elapses from now.
    ///
    /// A timeout too large to represent as a point in time means no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Share existing cancellation flag.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cancellation flag of context.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Point in time after which the call is abandoned.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check whether context is cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// - Return [`ContextError::Cancelled`] if cancellation was requested.
    /// - Return [`ContextError::DeadlineExceeded`] if the deadline passed.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Check if context is done.
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }
}

/// Reasons a context is done.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Friendly result alias :3
pub type Result<T, E = ContextError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn context_cancellation_is_shared() {
        let token = CancelToken::new();
        let ctx = Context::new().with_cancel_token(token.clone());
        assert_eq!(ctx.check(), Ok(()));

        token.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
        assert!(ctx.clone().is_done());
    }

    #[test]
    fn context_deadline() {
        let ctx = Context::new().with_timeout(Duration::ZERO);
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));

        let ctx = Context::new().with_timeout(Duration::from_secs(3600));
        assert!(!ctx.is_done());
    }

    #[test]
    fn context_unrepresentable_deadline_never_expires() {
        let ctx = Context::new().with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ctx.deadline(), None);
        assert!(!ctx.is_done());
    }
}
