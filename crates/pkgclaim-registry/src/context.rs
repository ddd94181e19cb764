//! Deadline and cancellation for a single validation call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use pkgclaim_core::{Result, ValidationError};

use crate::checker::PackageScope;

/// Caller-supplied bound on a validation call.
///
/// Every network await in a checker runs through [`ValidationContext::guard`].
/// Whichever comes first of the deadline, cancellation, or completion wins;
/// the losing future is dropped, which abandons any in-flight request.
///
/// # Examples
///
/// ```
/// use pkgclaim_registry::ValidationContext;
/// use std::time::Duration;
///
/// let ctx = ValidationContext::with_timeout(Duration::from_secs(10));
/// assert!(ctx.deadline().is_some());
/// assert!(ValidationContext::background().deadline().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ValidationContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::background()
    }
}

impl ValidationContext {
    /// A context that never expires and is never cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// Ties this context to a caller-owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns true once the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Runs `fut` until it completes or the context ends.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::CancelledOrTimedOut`] for `scope` if the
    /// context is cancelled or its deadline passes first.
    pub async fn guard<F, T>(&self, scope: &PackageScope<'_>, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(scope.cancelled()),
            () = expired => Err(scope.cancelled()),
            output = fut => Ok(output),
        }
    }
}

impl PackageScope<'_> {
    /// Builds the cancellation error for this package.
    #[must_use]
    pub fn cancelled(&self) -> ValidationError {
        ValidationError::CancelledOrTimedOut {
            registry: self.registry,
            package: self.package.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgclaim_core::{ErrorKind, RegistryType};

    fn scope() -> PackageScope<'static> {
        PackageScope::new(RegistryType::Npm, "@acme/mcp-server-foo")
    }

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = ValidationContext::background();
        let value = ctx.guard(&scope(), async { 42 }).await.unwrap();
        assert_eq!(value, 42);
        assert!(!ctx.is_done());
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_future() {
        let ctx = ValidationContext::with_timeout(Duration::from_millis(20));
        let started = std::time::Instant::now();

        let err = ctx
            .guard(&scope(), tokio::time::sleep(Duration::from_secs(10)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CancelledOrTimedOut);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_cancelled_token_wins_over_ready_future() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ValidationContext::background().with_cancellation(token);

        let err = ctx.guard(&scope(), async { 1 }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CancelledOrTimedOut);
    }

    #[tokio::test]
    async fn test_cancel_from_other_task() {
        let token = CancellationToken::new();
        let ctx = ValidationContext::background().with_cancellation(token.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = ctx
            .guard(&scope(), tokio::time::sleep(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
