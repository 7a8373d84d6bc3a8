//! Reconnect-and-retry policy for store operations

use std::future::Future;

use crate::error::AppResult;

/// Run `op` and, if it fails with a transient store error, run it once more.
///
/// The pool hands out a fresh connection for the second attempt. Any
/// failure of that attempt is returned as-is, so a store that stays down
/// surfaces as `StoreUnavailable`. Use it for reads; writes go through
/// [`with_write_retry`].
pub async fn with_retry<T, F, Fut>(operation: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            tracing::warn!(operation, error = %e, "Transient store error, retrying once");
            op().await
        }
        other => other,
    }
}

/// Retry policy for writes.
///
/// A transient error can reach us after the server has committed, for
/// example when the connection drops during `COMMIT`. Re-running the write
/// would then fail on its own effect (`InvalidState` for a second lend,
/// `DuplicateKey` for a second create). Before the second attempt `landed`
/// looks for the first attempt's effect and, when it finds one, that is the
/// result.
pub async fn with_write_retry<T, F, Fut, L, LFut>(
    operation: &str,
    mut op: F,
    landed: L,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
    L: FnOnce() -> LFut,
    LFut: Future<Output = AppResult<Option<T>>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            tracing::warn!(operation, error = %e, "Transient store error on write");
            match landed().await {
                Ok(Some(done)) => {
                    tracing::info!(operation, "Write had committed, not retrying");
                    Ok(done)
                }
                Ok(None) => op().await,
                Err(check) => {
                    tracing::warn!(operation, error = %check, "Could not check the first attempt");
                    op().await
                }
            }
        }
        other => other,
    }
}
