// Caller-driven cancellation of in-flight operations

use crate::error::CnaeError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `operation` until it completes or `token` is cancelled.
///
/// On cancellation the operation future is dropped, which closes any HTTP
/// connection it was holding, and `CnaeError::Cancelled` is returned
/// (converted into the caller's error type). Cache inserts only happen after
/// a fetch has been fully normalized, so an abandoned operation leaves no
/// partial entry behind.
pub async fn run_cancellable<F, T, E>(token: &CancellationToken, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<CnaeError>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CnaeError::Cancelled.into()),
        result = operation => result,
    }
}
