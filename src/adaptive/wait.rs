//! Suspend until the response reader reports data.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::collaborators::{ResponseReader, ResponseRecord};
use crate::error::{LoopError, Result};

/// Poll `reader` every `poll_interval` until it reports responses.
///
/// The first poll happens immediately. Fails with
/// [`LoopError::ObservationTimeout`] once `timeout` has elapsed, or with
/// [`LoopError::Cancelled`] as soon as `cancel` carries `true`. A reader error
/// ends the wait with that error. A zero `poll_interval` is a
/// [`LoopError::Config`] error.
pub async fn wait_for_responses<R: ResponseReader + ?Sized>(
    reader: &mut R,
    timeout: Duration,
    poll_interval: Duration,
    cancel: Option<&mut watch::Receiver<bool>>,
) -> Result<Vec<ResponseRecord>> {
    if poll_interval.is_zero() {
        return Err(LoopError::Config("poll_interval must be non-zero".into()));
    }

    let poll = async {
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts = 0usize;
        loop {
            ticker.tick().await;
            attempts += 1;
            if let Some(responses) = reader.read_latest_responses().await? {
                tracing::debug!(attempts, rows = responses.len(), "responses available");
                return Ok(responses);
            }
            tracing::debug!(attempts, "responses not ready");
        }
    };

    let bounded = async {
        match time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(LoopError::ObservationTimeout { waited: timeout }),
        }
    };

    match cancel {
        Some(rx) => {
            tokio::select! {
                result = bounded => result,
                () = cancelled(rx) => Err(LoopError::Cancelled),
            }
        }
        None => bounded.await,
    }
}

/// Resolves once the flag is set. Never resolves if the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|&flag| flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}
