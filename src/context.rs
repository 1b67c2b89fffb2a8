//! Per-call cancellation and deadlines.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ServiceError;

/// Carried by every engine call. Cancelling the token or passing the
/// deadline abandons the operation while its transaction is still open, and
/// the transaction rolls back. Once a transaction has committed the call
/// runs to completion and reports success.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// No deadline and a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_after(timeout)
    }

    /// Keeps the earlier of the current deadline and `now + timeout`.
    pub fn deadline_after(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    /// Context cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Err` once the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ServiceError> {
        if self.token.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ServiceError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Runs `operation` unless the context is already done, racing it against
    /// cancellation and the deadline.
    pub async fn run<F, T>(&self, operation: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        self.check()?;

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => Err(ServiceError::Cancelled),
                    result = tokio::time::timeout_at(deadline, operation) => {
                        result.unwrap_or(Err(ServiceError::DeadlineExceeded))
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => Err(ServiceError::Cancelled),
                    result = operation => result,
                }
            }
        }
    }
}
