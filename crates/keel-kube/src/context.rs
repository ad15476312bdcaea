//! Request-scoped cancellation and deadlines
//!
//! Every blocking step of a handler operation (file reads and control-plane
//! calls) runs through [`RequestContext::run`], which fails with
//! [`KubeError::Cancelled`] or [`KubeError::DeadlineExceeded`] instead of
//! waiting forever.
//!
//! A context can carry an absolute deadline, a per-call timeout, or both.
//! The timeout starts afresh on every `run`, so a long-lived handler built
//! with one keeps working after the timeout has elapsed once.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{KubeError, Result};

/// Cancellation token plus optional deadline carried by every call
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that bounds each call to `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().timeout(timeout)
    }

    /// Bound each call to `timeout`, measured from the start of the call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Absolute deadline shared by every call made through this context
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Observe an externally owned cancellation token
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn per_call_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Derived context cancelled together with this one, with the same limits
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            timeout: self.timeout,
        }
    }

    /// Fail fast if the context is already done
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(KubeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Err(KubeError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `fut` until it completes, the token is cancelled or the deadline passes
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) => Some(deadline.min(Instant::now() + timeout)),
            (deadline, None) => deadline,
            (None, Some(timeout)) => Some(Instant::now() + timeout),
        };
        if deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(KubeError::DeadlineExceeded);
        }

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(KubeError::Cancelled),
                result = fut => result,
            }
        };

        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(KubeError::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}
