//! Cancellation of in-flight round trips.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Runs one round trip unless `cancel` fires first.
pub(crate) async fn run_cancellable<F, T>(cancel: &CancellationToken, round_trip: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            Err(Error::cancelled().with_message("round trip aborted by cancellation"))
        }
        result = round_trip => result,
    }
}
