use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::state::SharedState;

/// Run every registered cleanup task each `interval` until shutdown is signaled.
pub fn spawn(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(state, shutdown, interval))
}

async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>, interval: Duration) {
    tracing::info!("Janitor started (every {}s)", interval.as_secs());

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        if *shutdown.borrow() {
            break;
        }

        sweep(&state).await;
    }

    tracing::info!("Janitor stopped");
}

/// Wait for the janitor to finish. A panicked or cancelled task is logged and
/// reported as `false`.
pub async fn join(handle: tokio::task::JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) if e.is_panic() => {
            tracing::error!("Janitor task panicked: {e}");
            false
        }
        Err(e) => {
            tracing::error!("Janitor task failed: {e}");
            false
        }
    }
}

/// One pass over all tasks. A failing task is logged and does not stop the others.
pub async fn sweep(state: &SharedState) {
    let now = Utc::now();

    for task in state.cleanups.list() {
        match task.execute(&state.pool, now).await {
            Ok(outcome) if outcome.deleted > 0 => {
                tracing::info!("Cleanup {}: {}", task.id(), outcome.message);
            }
            Ok(_) => {
                tracing::debug!("Cleanup {}: nothing to delete", task.id());
            }
            Err(e) => {
                tracing::error!("Cleanup {} failed: {e}", task.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_reports_a_clean_exit() {
        let handle = tokio::spawn(async {});
        assert!(join(handle).await);
    }

    #[tokio::test]
    async fn join_surfaces_a_panicked_janitor() {
        let handle = tokio::spawn(async { panic!("sweep blew up") });
        assert!(!join(handle).await);
    }

    #[tokio::test]
    async fn join_surfaces_an_aborted_janitor() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        assert!(!join(handle).await);
    }
}
