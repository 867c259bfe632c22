use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::db::types::AttemptState;
use crate::repositories;
use crate::services::attempt_finalize;

/// Closes in-progress attempts whose deadline has passed. The finish time is
/// the same deterministic `started_at + duration` the inline checks use, so
/// it never matters whether the sweeper or a request observes expiry first.
pub(crate) async fn close_overdue_attempts(state: &AppState) -> Result<()> {
    let now = state.clock().now();

    let overdue = repositories::attempts::list_overdue(state.db(), now)
        .await
        .context("Failed to list overdue attempts")?;

    let mut closed = 0u64;

    for (attempt_id, duration_seconds) in overdue {
        let mut tx = state.db().begin().await.context("Failed to start transaction")?;

        // Same critical section as submit/finish: re-check under the
        // per-attempt lock so a concurrent request cannot interleave.
        repositories::attempts::acquire_attempt_lock(&mut *tx, &attempt_id)
            .await
            .context("Failed to acquire attempt lock")?;

        let current = repositories::attempts::fetch_one_by_id(&mut *tx, &attempt_id)
            .await
            .context("Failed to fetch attempt")?;

        if current.state != AttemptState::InProgress {
            continue;
        }

        attempt_finalize::close_attempt(
            &mut *tx,
            &current,
            duration_seconds,
            attempt_finalize::CloseMode::DeadlineExceeded,
            now,
        )
        .await
        .context("Failed to close overdue attempt")?;

        tx.commit().await.context("Failed to commit transaction")?;
        closed += 1;
    }

    if closed > 0 {
        tracing::info!(closed_attempts = closed, "Closed overdue attempts");
    }
    metrics::counter!("overdue_attempts_closed_total").increment(closed);

    Ok(())
}
