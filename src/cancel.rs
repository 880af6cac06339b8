//! Interrupt handling.
//!
//! A single [`CancellationToken`] is created at startup and cancelled on the
//! first Ctrl+C. Every blocking step (prompts, engine I/O, throttling delays)
//! observes that token instead of being torn down from the outside.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Install the Ctrl+C listener and return the token it cancels.
pub fn install_interrupt_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let signal_token = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::warn!("Interrupt received, finishing current step...");
                    signal_token.cancel();
                }
                Err(e) => tracing::error!("Failed to listen for interrupts: {}", e),
            },
            _ = signal_token.cancelled() => {}
        }
    });

    token
}

/// Fail with [`Error::Cancelled`] once the token has fired.
pub fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Run `fut` until it finishes or the token fires, whichever comes first.
pub async fn run_cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Sleep for `duration` unless interrupted.
pub async fn sleep_cancellable(cancel: &CancellationToken, duration: Duration) -> Result<()> {
    run_cancellable(cancel, async {
        tokio::time::sleep(duration).await;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_ensure_active() {
        let token = CancellationToken::new();
        assert_ok!(ensure_active(&token));
        token.cancel();
        assert!(matches!(ensure_active(&token), Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_cancellable_completes() {
        let token = CancellationToken::new();
        let value = assert_ok!(run_cancellable(&token, async { Ok(7) }).await);
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_cancellable_passes_errors_through() {
        let token = CancellationToken::new();
        let result: Result<()> =
            run_cancellable(&token, async { Err(Error::Download("HTTP 404".into())) }).await;
        assert!(matches!(assert_err!(result), Error::Download(_)));
    }

    #[tokio::test]
    async fn test_run_cancellable_interrupted() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: Result<()> = run_cancellable(&token, std::future::pending()).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_sleep_cancellable_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = sleep_cancellable(&token, Duration::from_secs(3600)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
