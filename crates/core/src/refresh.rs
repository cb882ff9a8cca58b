//! Keeping a projection current.
//!
//! A spawned task re-fetches and re-projects whenever the backend reports a change, or on a
//! fixed interval when the backend cannot push. Results are published on a
//! `tokio::sync::watch` channel; receivers only wake when the view actually changed. A failed
//! refresh is logged and the previous view is kept.
//!
//! Each notification triggers a full re-fetch. Bursts are not coalesced beyond what the
//! broadcast channel's lag handling does.

use crate::projection::QueueBoard;
use crate::services::ViewService;
use crate::store::StoreChange;
use crate::ClinicResult;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Change,
    Poll,
}

/// Computes `project` once, then keeps it current in the background.
///
/// The task stops when every receiver has been dropped or the change feed closes.
///
/// # Errors
///
/// Returns the initial projection's error; no task is spawned in that case.
pub fn watch_projection<T, F>(
    views: ViewService,
    poll_interval: Duration,
    project: F,
) -> ClinicResult<(watch::Receiver<T>, JoinHandle<()>)>
where
    T: PartialEq + Send + Sync + 'static,
    F: Fn(&ViewService) -> ClinicResult<T> + Send + 'static,
{
    // Subscribe before the first projection so no write between the two is missed.
    let mut changes = views.subscribe_changes();
    let initial = project(&views)?;
    let (tx, rx) = watch::channel(initial);

    let task = tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial view already covers it.
        ticker.tick().await;

        loop {
            let trigger = tokio::select! {
                _ = tx.closed() => break,
                trigger = next_trigger(&mut changes, &mut ticker) => trigger,
            };
            let Some(trigger) = trigger else {
                tracing::debug!("change feed closed; stopping refresh");
                break;
            };

            match project(&views) {
                Ok(view) => {
                    tx.send_if_modified(|current| {
                        if *current == view {
                            return false;
                        }
                        *current = view;
                        true
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, ?trigger, "refresh failed; keeping previous view");
                }
            }
        }
    });

    Ok((rx, task))
}

/// Keeps the public queue board current, polling at the configured interval when needed.
pub fn watch_queue_board(
    views: ViewService,
) -> ClinicResult<(watch::Receiver<QueueBoard>, JoinHandle<()>)> {
    let poll_interval = views.config().poll_interval();
    watch_projection(views, poll_interval, ViewService::queue_board)
}

/// `None` once the change feed has closed.
async fn next_trigger(
    changes: &mut Option<broadcast::Receiver<StoreChange>>,
    ticker: &mut Interval,
) -> Option<Trigger> {
    let Some(feed) = changes.as_mut() else {
        ticker.tick().await;
        return Some(Trigger::Poll);
    };
    match feed.recv().await {
        Ok(change) => {
            tracing::trace!(path = %change.path, "store changed");
            Some(Trigger::Change)
        }
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "change feed lagged; refreshing once");
            Some(Trigger::Change)
        }
        Err(broadcast::error::RecvError::Closed) => None,
    }
}
